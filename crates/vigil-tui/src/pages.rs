//! Per-view page state that is not a live surface.
//!
//! Tables fed by the stream live in the surface registry; everything a page
//! loads once and only replaces on reload (rules, reports, comparison,
//! timeline) is kept here, together with form state.

use chrono::{DateTime, Local};
use vigil_api::{
    AlertFilter, Comparison, ReportEntry, ReportFormat, ReportRequest, ReportType, RuleEntry,
    TimelinePoint, TimelineRange,
};
use vigil_core::SeverityBucket;

/// Alert counts offered by the count filter.
pub const ALERT_COUNTS: [u32; 4] = [25, 50, 100, 200];

/// Something loaded from the backend, or why it isn't there.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Loadable<T> {
    #[default]
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Loadable<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Loadable::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }
}

/// Single-line text field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
    max_len: Option<usize>,
}

impl TextInput {
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            value: String::new(),
            max_len: Some(max_len),
        }
    }

    pub fn from_value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            max_len: None,
        }
    }

    /// Append a character. Returns false when the field is full.
    pub fn push(&mut self, c: char) -> bool {
        if self.max_len.is_some_and(|max| self.value.chars().count() >= max) {
            return false;
        }
        self.value.push(c);
        true
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn len(&self) -> usize {
        self.value.chars().count()
    }
}

/// Row selection over a list of `len` items.
fn step_selection(selected: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        0
    } else if forward {
        (selected + 1).min(len - 1)
    } else {
        selected.saturating_sub(1)
    }
}

#[derive(Debug, Default)]
pub struct OverviewPage {
    pub range: TimelineRange,
    pub timeline: Loadable<Vec<TimelinePoint>>,
}

#[derive(Debug)]
pub struct AlertsPage {
    pub filter: AlertFilter,
    /// An IP was blocked while the page was hidden; reload on next visit
    pub stale: bool,
}

impl AlertsPage {
    pub fn new(default_count: u32) -> Self {
        Self {
            filter: AlertFilter {
                severity: None,
                count: default_count,
            },
            stale: false,
        }
    }

    /// all → critical → high → medium → low → all
    pub fn cycle_severity(&mut self) {
        self.filter.severity = match self.filter.severity {
            None => Some(SeverityBucket::Critical),
            Some(SeverityBucket::Low) => None,
            Some(bucket) => SeverityBucket::ALL.get(bucket.index() + 1).copied(),
        };
    }

    pub fn cycle_count(&mut self) {
        let next = ALERT_COUNTS
            .iter()
            .position(|c| *c == self.filter.count)
            .map_or(0, |i| (i + 1) % ALERT_COUNTS.len());
        self.filter.count = ALERT_COUNTS[next];
    }

    pub fn filter_label(&self) -> String {
        format!(
            "severity: {}  count: {}",
            self.filter.severity.map_or("all", |b| b.query_value()),
            self.filter.count
        )
    }
}

#[derive(Debug, Default)]
pub struct RulesPage {
    pub rules: Loadable<Vec<RuleEntry>>,
    pub total: u64,
    /// `None` is every category
    pub category: Option<String>,
    /// Categories seen in the unfiltered list
    pub categories: Vec<String>,
    pub search: TextInput,
    pub searching: bool,
    /// Query of the results currently shown, if they are search results
    pub showing_search: Option<String>,
    pub selected: usize,
}

impl RulesPage {
    pub fn set_rules(&mut self, rules: Vec<RuleEntry>, total: u64) {
        if self.category.is_none() {
            let mut categories: Vec<String> =
                rules.iter().filter_map(|r| r.category.clone()).collect();
            categories.sort();
            categories.dedup();
            self.categories = categories;
        }
        self.total = total;
        self.rules = Loadable::Loaded(rules);
        self.showing_search = None;
        self.selected = 0;
    }

    pub fn set_search_results(&mut self, query: String, rules: Vec<RuleEntry>) {
        self.total = rules.len() as u64;
        self.rules = Loadable::Loaded(rules);
        self.showing_search = Some(query);
        self.selected = 0;
    }

    /// Move to the next category and return it.
    pub fn cycle_category(&mut self) -> Option<String> {
        self.category = match &self.category {
            None => self.categories.first().cloned(),
            Some(current) => {
                let idx = self.categories.iter().position(|c| c == current);
                idx.and_then(|i| self.categories.get(i + 1)).cloned()
            }
        };
        self.category.clone()
    }

    pub fn selected_rule(&self) -> Option<&RuleEntry> {
        self.rules.loaded()?.get(self.selected)
    }

    pub fn select(&mut self, forward: bool) {
        let len = self.rules.loaded().map_or(0, Vec::len);
        self.selected = step_selection(self.selected, len, forward);
    }
}

#[derive(Debug, Default)]
pub struct ReportsPage {
    pub reports: Loadable<Vec<ReportEntry>>,
    pub selected: usize,
}

impl ReportsPage {
    pub fn set_reports(&mut self, reports: Vec<ReportEntry>) {
        self.selected = self.selected.min(reports.len().saturating_sub(1));
        self.reports = Loadable::Loaded(reports);
    }

    pub fn selected_report(&self) -> Option<&ReportEntry> {
        self.reports.loaded()?.get(self.selected)
    }

    pub fn select(&mut self, forward: bool) {
        let len = self.reports.loaded().map_or(0, Vec::len);
        self.selected = step_selection(self.selected, len, forward);
    }
}

/// Fields of the report form, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Type,
    Format,
    Start,
    End,
}

impl FormField {
    pub const ALL: [FormField; 4] = [
        FormField::Type,
        FormField::Format,
        FormField::Start,
        FormField::End,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FormField::Type => "Report type",
            FormField::Format => "Format",
            FormField::Start => "Start",
            FormField::End => "End",
        }
    }

    fn next(&self) -> FormField {
        let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    fn prev(&self) -> FormField {
        let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn is_text(&self) -> bool {
        matches!(self, FormField::Start | FormField::End)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReportForm {
    pub report_type: ReportType,
    pub format: ReportFormat,
    pub start: TextInput,
    pub end: TextInput,
    pub focus: FormField,
    pub submitting: bool,
}

impl GenerateReportForm {
    /// Fresh form covering the 24 hours before `now`.
    pub fn new(now: DateTime<Local>) -> Self {
        let defaults = ReportRequest::last_day(now);
        Self {
            report_type: defaults.report_type,
            format: defaults.format,
            start: TextInput::from_value(defaults.start_time),
            end: TextInput::from_value(defaults.end_time),
            focus: FormField::default(),
            submitting: false,
        }
    }

    pub fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    pub fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Cycle the focused choice field.
    pub fn cycle_choice(&mut self) {
        match self.focus {
            FormField::Type => self.report_type = cycle(&ReportType::ALL, self.report_type),
            FormField::Format => self.format = cycle(&ReportFormat::ALL, self.format),
            FormField::Start | FormField::End => {}
        }
    }

    /// Text field under focus, if the focus is on one.
    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            FormField::Start => Some(&mut self.start),
            FormField::End => Some(&mut self.end),
            FormField::Type | FormField::Format => None,
        }
    }

    pub fn to_request(&self) -> ReportRequest {
        ReportRequest {
            report_type: self.report_type,
            start_time: self.start.value().trim().to_string(),
            end_time: self.end.value().trim().to_string(),
            format: self.format,
        }
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + 1) % all.len()]
}

#[derive(Debug, Default)]
pub struct ComparisonPage {
    pub data: Loadable<Comparison>,
}

/// Where the login form is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginStage {
    #[default]
    Credentials,
    Mfa,
}

/// Field focused on the credentials stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoginForm {
    pub stage: LoginStage,
    pub field: LoginField,
    pub username: TextInput,
    pub password: TextInput,
    pub code: TextInput,
    /// A request is in flight ("Signing In...")
    pub busy: bool,
}

impl Default for LoginForm {
    fn default() -> Self {
        Self {
            stage: LoginStage::Credentials,
            field: LoginField::Username,
            username: TextInput::default(),
            password: TextInput::default(),
            code: TextInput::with_max_len(6),
            busy: false,
        }
    }
}

/// What a keystroke on the login form asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginSubmit {
    Credentials { username: String, password: String },
    Code(String),
}

impl LoginForm {
    /// Type a character into the focused field.
    ///
    /// On the code stage only digits are accepted and the sixth digit
    /// submits the code.
    pub fn input(&mut self, c: char) -> Option<LoginSubmit> {
        if self.busy {
            return None;
        }
        match self.stage {
            LoginStage::Credentials => {
                match self.field {
                    LoginField::Username => self.username.push(c),
                    LoginField::Password => self.password.push(c),
                };
                None
            }
            LoginStage::Mfa => {
                if !c.is_ascii_digit() || !self.code.push(c) {
                    return None;
                }
                (self.code.len() == 6).then(|| self.submit()).flatten()
            }
        }
    }

    pub fn backspace(&mut self) {
        if self.busy {
            return;
        }
        match (self.stage, self.field) {
            (LoginStage::Credentials, LoginField::Username) => self.username.backspace(),
            (LoginStage::Credentials, LoginField::Password) => self.password.backspace(),
            (LoginStage::Mfa, _) => self.code.backspace(),
        }
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            LoginField::Username => LoginField::Password,
            LoginField::Password => LoginField::Username,
        };
    }

    /// Submit the current stage and enter the busy state.
    pub fn submit(&mut self) -> Option<LoginSubmit> {
        if self.busy {
            return None;
        }
        let submit = match self.stage {
            LoginStage::Credentials => {
                if self.username.is_empty() || self.password.is_empty() {
                    return None;
                }
                LoginSubmit::Credentials {
                    username: self.username.value().to_string(),
                    password: self.password.value().to_string(),
                }
            }
            LoginStage::Mfa => LoginSubmit::Code(self.code.value().to_string()),
        };
        self.busy = true;
        Some(submit)
    }

    /// Password accepted, ask for the one-time code.
    pub fn require_mfa(&mut self) {
        self.busy = false;
        self.stage = LoginStage::Mfa;
        self.code.clear();
    }

    /// Restore the form after a failed attempt.
    pub fn fail(&mut self) {
        self.busy = false;
        if self.stage == LoginStage::Mfa {
            self.code.clear();
        }
    }

    pub fn button_label(&self) -> &'static str {
        match (self.busy, self.stage) {
            (true, LoginStage::Credentials) => "Signing In...",
            (true, LoginStage::Mfa) => "Verifying...",
            (false, LoginStage::Credentials) => "Sign In",
            (false, LoginStage::Mfa) => "Verify",
        }
    }
}
