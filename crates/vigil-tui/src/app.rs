//! Main application state and logic for the Vigil TUI.
//!
//! The `App` struct owns all view state: the surface registry, page state,
//! toasts and theme. It turns key presses into requests for the data layer
//! and applies whatever comes back, one event at a time, on the UI thread.

use std::collections::HashSet;
use std::io;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use vigil_api::client::validate_ip;
use vigil_api::{Comparison, ReportEntry, RuleEntry, StatsSummary};
use vigil_config::ConsoleConfig;
use vigil_core::{AlertRecord, VigilError};
use vigil_stream::{StreamEvent, StreamStatus};

use crate::data::{DataEvent, DataManager, Request};
use crate::event::{AppEvent, InputHandler};
use crate::pages::{
    AlertsPage, ComparisonPage, FormField, GenerateReportForm, Loadable, LoginField, LoginForm,
    LoginStage, LoginSubmit, OverviewPage, ReportsPage, RulesPage,
};
use crate::reconcile::reconcile;
use crate::surface::{AlertTable, Counter, SeverityChart, Surface, SurfaceId, SurfaceRegistry};
use crate::theme::{Theme, ThemeManager};
use crate::toast::ToastState;
use crate::view::View;
use crate::widget::{
    AlertColumns, AlertTableWidget, CounterCard, HotkeyHints, Popup, SeverityBars,
    SparklineWidget, ToastWidget, bar, centered_rect, stream_indicator,
};

/// Result type for app operations.
pub type AppResult<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Target frame time (~30 FPS).
const FRAME_DURATION: Duration = Duration::from_millis(33);

/// How often the data layer is drained.
const DATA_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Rows left between header and footer below which views are not drawn.
const MIN_CONTENT_HEIGHT: u16 = 5;

const RECENT_EMPTY: &str = "No recent alerts found.";
const ALERTS_EMPTY: &str = "No alerts found matching criteria.";

/// Counters filled from the stats summary.
const STAT_COUNTERS: [SurfaceId; 7] = [
    SurfaceId::TotalAlerts,
    SurfaceId::BlockedAttacks,
    SurfaceId::CriticalThreats,
    SurfaceId::ActiveRules,
    SurfaceId::RulesTotal,
    SurfaceId::RulesAi,
    SurfaceId::RulesDrop,
];

/// Overview cards; these show `Error` when the stats call fails.
const OVERVIEW_COUNTERS: [SurfaceId; 4] = [
    SurfaceId::TotalAlerts,
    SurfaceId::BlockedAttacks,
    SurfaceId::CriticalThreats,
    SurfaceId::ActiveRules,
];

fn stat_value(stats: &StatsSummary, id: SurfaceId) -> u64 {
    match id {
        SurfaceId::TotalAlerts => stats.total_alerts_24h,
        SurfaceId::BlockedAttacks => stats.blocked_attacks_24h,
        SurfaceId::CriticalThreats => stats.critical_alerts_24h,
        SurfaceId::ActiveRules | SurfaceId::RulesTotal => stats.active_rules_count,
        SurfaceId::RulesAi => stats.ai_rules_count,
        SurfaceId::RulesDrop => stats.drop_rules_count,
        SurfaceId::RecentAlerts | SurfaceId::AlertsList | SurfaceId::SeverityChart => 0,
    }
}

/// An action waiting for `y`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    BlockIp(String),
    UnblockIp(String),
    DeleteRule(u64),
    DeleteReport(String),
}

impl PendingAction {
    fn prompt(&self) -> String {
        match self {
            PendingAction::BlockIp(ip) => format!("Are you sure you want to block IP: {}?", ip),
            PendingAction::UnblockIp(ip) => format!("Are you sure you want to unblock IP: {}?", ip),
            PendingAction::DeleteRule(sid) => {
                format!("Are you sure you want to delete AI rule SID {}?", sid)
            }
            PendingAction::DeleteReport(name) => {
                format!("Are you sure you want to delete report: {}?", name)
            }
        }
    }

    fn into_request(self) -> Request {
        match self {
            PendingAction::BlockIp(ip) => Request::BlockIp(ip),
            PendingAction::UnblockIp(ip) => Request::UnblockIp(ip),
            PendingAction::DeleteRule(sid) => Request::DeleteRule(sid),
            PendingAction::DeleteReport(name) => Request::DeleteReport(name),
        }
    }
}

/// Detail popup contents.
#[derive(Debug, Clone)]
struct Detail {
    title: String,
    body: String,
    scroll: u16,
}

/// Main application state.
pub struct App {
    config: ConsoleConfig,
    current_view: View,
    /// Input handler for key events
    input_handler: InputHandler,
    should_quit: bool,
    show_help: bool,
    registry: SurfaceRegistry,
    overview: OverviewPage,
    alerts: AlertsPage,
    rules: RulesPage,
    reports: ReportsPage,
    report_form: GenerateReportForm,
    comparison: ComparisonPage,
    login: LoginForm,
    /// Views whose first load has been issued
    loaded: HashSet<View>,
    authenticated: bool,
    toasts: ToastState,
    theme_manager: ThemeManager,
    data_manager: DataManager,
    stream_status: StreamStatus,
    confirm: Option<PendingAction>,
    detail: Option<Detail>,
    /// Dirty flag - whether UI needs redraw
    dirty: bool,
    last_poll_time: Instant,
}

impl App {
    /// Create the app, starting the data layer and loading the saved theme.
    pub fn new(config: ConsoleConfig) -> Self {
        let theme_manager = match ThemeManager::default_path() {
            Some(path) => ThemeManager::load(path, config.theme),
            None => ThemeManager::in_memory(config.theme),
        };
        let data_manager = DataManager::new(&config);
        Self::with_parts(config, data_manager, theme_manager)
    }

    /// Create the app from already-built parts.
    pub fn with_parts(
        config: ConsoleConfig,
        data_manager: DataManager,
        theme_manager: ThemeManager,
    ) -> Self {
        let now = Instant::now();
        let mut app = Self {
            current_view: View::Login,
            input_handler: InputHandler::new(),
            should_quit: false,
            show_help: false,
            registry: SurfaceRegistry::new(),
            overview: OverviewPage::default(),
            alerts: AlertsPage::new(config.default_alert_count),
            rules: RulesPage::default(),
            reports: ReportsPage::default(),
            report_form: GenerateReportForm::new(Local::now()),
            comparison: ComparisonPage::default(),
            login: LoginForm::default(),
            loaded: HashSet::new(),
            authenticated: false,
            toasts: ToastState::new(config.toast_duration()),
            theme_manager,
            data_manager,
            stream_status: StreamStatus::Connecting,
            confirm: None,
            detail: None,
            dirty: true,
            last_poll_time: now,
            config,
        };

        if app.config.require_login {
            app.data_manager.set_polling(false);
            app.sync_text_mode();
        } else {
            app.enter_dashboard();
        }
        app
    }

    /// Returns the current view.
    pub fn current_view(&self) -> View {
        self.current_view
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn show_help(&self) -> bool {
        self.show_help
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    pub fn stream_status(&self) -> StreamStatus {
        self.stream_status
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn theme(&self) -> &Theme {
        self.theme_manager.current()
    }

    fn enter_dashboard(&mut self) {
        self.authenticated = true;
        self.data_manager.set_polling(true);
        self.current_view = View::Login;
        self.switch_view(View::Overview);
    }

    /// Switch to a view, loading it on first visit.
    pub fn switch_view(&mut self, view: View) {
        if self.config.require_login && !self.authenticated && view != View::Login {
            return;
        }
        if view != self.current_view {
            tracing::debug!(from = %self.current_view, to = %view, "switch view");
        }
        self.current_view = view;
        self.detail = None;
        self.confirm = None;

        if view == View::GenerateReport {
            self.report_form = GenerateReportForm::new(Local::now());
        } else if view.loads_once() && self.loaded.insert(view) {
            self.load_view(view);
        } else if view == View::Alerts && self.alerts.stale {
            self.load_view(view);
        }
        self.sync_text_mode();
        self.mark_dirty();
    }

    /// Issue the requests that fill `view`.
    fn load_view(&mut self, view: View) {
        match view {
            View::Overview => {
                self.data_manager.request(Request::Stats { animate: false });
                self.overview.timeline = Loadable::Loading;
                self.data_manager.request(Request::Timeline(self.overview.range));
                self.data_manager.request(Request::RecentAlerts);
            }
            View::Alerts => {
                self.alerts.stale = false;
                self.data_manager.request(Request::Alerts(self.alerts.filter));
            }
            View::Rules => {
                self.data_manager.request(Request::Rules {
                    category: self.rules.category.clone(),
                });
                self.data_manager.request(Request::Stats { animate: false });
            }
            View::Reports => self.data_manager.request(Request::Reports),
            View::Comparison => {
                self.comparison.data = Loadable::Loading;
                self.data_manager.request(Request::Comparison);
            }
            View::GenerateReport => self.report_form = GenerateReportForm::new(Local::now()),
            View::Login => {}
        }
    }

    fn sync_text_mode(&mut self) {
        let text = match self.current_view {
            View::Login => true,
            View::Rules => self.rules.searching,
            View::GenerateReport => self.report_form.focus.is_text(),
            _ => false,
        };
        self.input_handler.set_text_mode(text);
    }

    /// Handle a key event.
    pub fn handle_key_event(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if self.show_help {
            self.show_help = false;
            self.mark_dirty();
            return;
        }
        let event = self.input_handler.handle_key(key);
        self.handle_app_event(event);
    }

    /// Handle an application event.
    pub fn handle_app_event(&mut self, event: AppEvent) {
        let now = Instant::now();
        match event {
            AppEvent::Quit | AppEvent::ForceQuit => self.should_quit = true,
            AppEvent::ShowHelp => self.show_help = true,
            AppEvent::Cancel => self.cancel(),
            AppEvent::SwitchView(view) => self.switch_view(view),
            AppEvent::NextView => self.switch_view(self.current_view.next()),
            AppEvent::PrevView => self.switch_view(self.current_view.prev()),
            AppEvent::Refresh => self.refresh(now),
            AppEvent::NavigateUp => self.navigate(false, 1),
            AppEvent::NavigateDown => self.navigate(true, 1),
            AppEvent::PageUp => self.navigate(false, 10),
            AppEvent::PageDown => self.navigate(true, 10),
            AppEvent::GoToTop => self.navigate(false, usize::MAX),
            AppEvent::GoToBottom => self.navigate(true, usize::MAX),
            AppEvent::Select => self.select(now),
            AppEvent::Toggle => {
                if self.current_view == View::GenerateReport {
                    self.report_form.cycle_choice();
                }
            }
            AppEvent::SetRange(range) => {
                if self.current_view == View::Overview && self.overview.range != range {
                    self.overview.range = range;
                    self.overview.timeline = Loadable::Loading;
                    self.data_manager.request(Request::Timeline(range));
                }
            }
            AppEvent::CycleFilter => match self.current_view {
                View::Alerts => {
                    self.alerts.cycle_severity();
                    self.load_view(View::Alerts);
                }
                View::Rules => {
                    let category = self.rules.cycle_category();
                    self.rules.rules = Loadable::Loading;
                    self.data_manager.request(Request::Rules { category });
                }
                _ => {}
            },
            AppEvent::CycleCount => {
                if self.current_view == View::Alerts {
                    self.alerts.cycle_count();
                    self.load_view(View::Alerts);
                }
            }
            AppEvent::StartSearch => {
                if self.current_view == View::Rules {
                    self.rules.searching = true;
                }
            }
            AppEvent::Delete => self.request_delete(now),
            AppEvent::Confirm => {
                if let Some(action) = self.confirm.take() {
                    self.data_manager.request(action.into_request());
                }
            }
            AppEvent::BlockIp => self.request_block(true, now),
            AppEvent::UnblockIp => self.request_block(false, now),
            AppEvent::ToggleTheme => {
                let theme = self.theme_manager.toggle();
                tracing::info!(theme = ?theme, "theme toggled");
            }
            AppEvent::FocusNext => self.move_focus(true),
            AppEvent::FocusPrev => self.move_focus(false),
            AppEvent::TextInput(c) => self.text_input(c),
            AppEvent::Backspace => self.backspace(),
            AppEvent::Submit => self.submit(now),
            AppEvent::None => {}
        }
        self.sync_text_mode();
        self.mark_dirty();
    }

    fn cancel(&mut self) {
        if self.detail.take().is_some() || self.confirm.take().is_some() {
            return;
        }
        match self.current_view {
            View::Rules if self.rules.searching => {
                self.rules.searching = false;
            }
            View::GenerateReport if self.report_form.focus.is_text() => {
                self.report_form.focus = FormField::Type;
            }
            _ => {}
        }
    }

    fn refresh(&mut self, now: Instant) {
        if self.current_view == View::Login {
            return;
        }
        if self.current_view == View::Overview {
            self.toasts.success("Refreshing Overview data...", now);
        }
        self.load_view(self.current_view);
    }

    fn navigate(&mut self, forward: bool, steps: usize) {
        if let Some(detail) = self.detail.as_mut() {
            let delta = steps.min(u16::MAX as usize) as u16;
            detail.scroll = if forward {
                detail.scroll.saturating_add(delta)
            } else {
                detail.scroll.saturating_sub(delta)
            };
            return;
        }
        let steps = steps.min(100_000);
        match self.current_view {
            View::Overview | View::Alerts => {
                let id = self.table_for_view();
                if let Ok(Some(table)) = self.registry.table_mut(id) {
                    for _ in 0..steps.min(table.len()) {
                        if forward {
                            table.select_next();
                        } else {
                            table.select_prev();
                        }
                    }
                }
            }
            View::Rules => {
                let len = self.rules.rules.loaded().map_or(0, Vec::len);
                for _ in 0..steps.min(len) {
                    self.rules.select(forward);
                }
            }
            View::Reports => {
                let len = self.reports.reports.loaded().map_or(0, Vec::len);
                for _ in 0..steps.min(len) {
                    self.reports.select(forward);
                }
            }
            View::GenerateReport => {
                if forward {
                    self.report_form.focus_next();
                } else {
                    self.report_form.focus_prev();
                }
            }
            View::Comparison | View::Login => {}
        }
    }

    fn table_for_view(&self) -> SurfaceId {
        if self.current_view == View::Alerts {
            SurfaceId::AlertsList
        } else {
            SurfaceId::RecentAlerts
        }
    }

    fn selected_alert(&self) -> Option<&AlertRecord> {
        match self.current_view {
            View::Overview | View::Alerts => self.registry.table(self.table_for_view())?.selected(),
            _ => None,
        }
    }

    fn select(&mut self, now: Instant) {
        match self.current_view {
            View::Overview | View::Alerts => {
                let body = self.selected_alert().map(AlertRecord::detail_json);
                if let Some(body) = body {
                    self.detail = Some(Detail {
                        title: "Alert Details".to_string(),
                        body,
                        scroll: 0,
                    });
                }
            }
            View::Rules => {
                if let Some(rule) = self.rules.selected_rule() {
                    self.detail = Some(Detail {
                        title: format!("Rule {}", rule.sid),
                        body: rule.detail_text(),
                        scroll: 0,
                    });
                }
            }
            View::Reports => {
                if let Some(report) = self.reports.selected_report() {
                    let filename = report.filename.clone();
                    self.data_manager.request(Request::DownloadReport(filename));
                }
            }
            View::GenerateReport => self.submit_report(now),
            View::Comparison | View::Login => {}
        }
    }

    fn request_block(&mut self, block: bool, now: Instant) {
        if !matches!(self.current_view, View::Overview | View::Alerts) {
            return;
        }
        let Some(alert) = self.selected_alert() else {
            return;
        };
        let ip = alert.src_ip_display().to_string();
        if let Err(e) = validate_ip(&ip) {
            self.toasts.error(e.friendly_message(), now);
            return;
        }
        self.confirm = Some(if block {
            PendingAction::BlockIp(ip)
        } else {
            PendingAction::UnblockIp(ip)
        });
    }

    fn request_delete(&mut self, now: Instant) {
        match self.current_view {
            View::Rules => {
                let Some(rule) = self.rules.selected_rule() else {
                    return;
                };
                if rule.is_ai_generated() {
                    self.confirm = Some(PendingAction::DeleteRule(rule.sid));
                } else {
                    self.toasts.error("Only AI-generated rules can be deleted", now);
                }
            }
            View::Reports => {
                if let Some(report) = self.reports.selected_report() {
                    self.confirm = Some(PendingAction::DeleteReport(report.filename.clone()));
                }
            }
            _ => {}
        }
    }

    fn move_focus(&mut self, forward: bool) {
        match self.current_view {
            View::Login if self.login.stage == LoginStage::Credentials => self.login.toggle_field(),
            View::GenerateReport => {
                if forward {
                    self.report_form.focus_next();
                } else {
                    self.report_form.focus_prev();
                }
            }
            _ => {}
        }
    }

    fn text_input(&mut self, c: char) {
        match self.current_view {
            View::Login => {
                if let Some(submit) = self.login.input(c) {
                    self.send_login(submit);
                }
            }
            View::Rules if self.rules.searching => {
                self.rules.search.push(c);
            }
            View::GenerateReport => {
                if let Some(input) = self.report_form.focused_input() {
                    input.push(c);
                }
            }
            _ => {}
        }
    }

    fn backspace(&mut self) {
        match self.current_view {
            View::Login => self.login.backspace(),
            View::Rules if self.rules.searching => self.rules.search.backspace(),
            View::GenerateReport => {
                if let Some(input) = self.report_form.focused_input() {
                    input.backspace();
                }
            }
            _ => {}
        }
    }

    fn submit(&mut self, now: Instant) {
        match self.current_view {
            View::Login => {
                if let Some(submit) = self.login.submit() {
                    self.send_login(submit);
                }
            }
            View::Rules if self.rules.searching => {
                self.rules.searching = false;
                let query = self.rules.search.value().trim().to_string();
                self.rules.rules = Loadable::Loading;
                if query.is_empty() {
                    self.data_manager.request(Request::Rules {
                        category: self.rules.category.clone(),
                    });
                } else {
                    self.data_manager.request(Request::RuleSearch(query));
                }
            }
            View::GenerateReport => self.submit_report(now),
            _ => {}
        }
    }

    fn send_login(&mut self, submit: LoginSubmit) {
        let request = match submit {
            LoginSubmit::Credentials { username, password } => {
                Request::Login { username, password }
            }
            LoginSubmit::Code(code) => Request::VerifyMfa(code),
        };
        self.data_manager.request(request);
    }

    fn submit_report(&mut self, now: Instant) {
        if self.report_form.submitting {
            return;
        }
        let request = self.report_form.to_request();
        if let Err(e) = request.validate() {
            self.toasts.error(e.friendly_message(), now);
            return;
        }
        self.report_form.submitting = true;
        self.toasts.success("Generating report...", now);
        self.data_manager.request(Request::GenerateReport(request));
    }

    /// Drain the data layer, apply results and expire toasts.
    pub fn tick(&mut self, now: Instant) {
        for event in self.data_manager.poll(now) {
            self.apply_data_event(event, now);
        }
        if self.toasts.tick(now) || self.registry.is_animating(now) {
            self.mark_dirty();
        }
    }

    /// Apply one result from the data layer.
    pub fn apply_data_event(&mut self, event: DataEvent, now: Instant) {
        self.mark_dirty();
        match event {
            DataEvent::Stream(StreamEvent::Status(status)) => self.stream_status = status,
            DataEvent::Stream(StreamEvent::Alert(alert)) => {
                reconcile(&mut self.registry, &alert);
            }
            DataEvent::Stats { animate, result } => match result {
                Ok(stats) => self.apply_stats(&stats, animate, now),
                Err(e) => {
                    for id in OVERVIEW_COUNTERS {
                        self.registry.mount(id, Surface::Counter(Counter::error()));
                    }
                    // Periodic refreshes fail quietly.
                    if !animate {
                        self.toasts.error(e.friendly_message(), now);
                    }
                }
            },
            DataEvent::Timeline { range, result } => {
                if range != self.overview.range {
                    return;
                }
                self.overview.timeline = match result {
                    Ok(points) => Loadable::Loaded(points),
                    Err(e) => {
                        self.toasts.error(e.friendly_message(), now);
                        Loadable::Failed(e.friendly_message())
                    }
                };
            }
            DataEvent::RecentAlerts(result) => {
                let rows = self.rows_or_toast(result, now);
                self.registry.mount(
                    SurfaceId::RecentAlerts,
                    Surface::AlertTable(AlertTable::loaded(rows, RECENT_EMPTY)),
                );
            }
            DataEvent::Alerts { result, .. } => {
                let rows = self.rows_or_toast(result, now);
                self.registry.mount(
                    SurfaceId::AlertsList,
                    Surface::AlertTable(AlertTable::loaded(rows, ALERTS_EMPTY)),
                );
            }
            DataEvent::Rules { result, .. } => match result {
                Ok(list) => self.rules.set_rules(list.rules, list.total),
                Err(e) => {
                    self.toasts.error(e.friendly_message(), now);
                    self.rules.rules = Loadable::Failed(e.friendly_message());
                }
            },
            DataEvent::RuleSearch { query, result } => match result {
                Ok(rules) => self.rules.set_search_results(query, rules),
                Err(e) => {
                    self.toasts.error(e.friendly_message(), now);
                    self.rules.rules = Loadable::Failed(e.friendly_message());
                }
            },
            DataEvent::RuleDeleted { sid, result } => match result {
                Ok(()) => {
                    self.toasts.success(format!("Rule {} deleted successfully", sid), now);
                    self.load_view(View::Rules);
                }
                Err(e) => self.toasts.error(e.friendly_message(), now),
            },
            DataEvent::Reports(result) => match result {
                Ok(reports) => self.reports.set_reports(reports),
                Err(e) => {
                    self.toasts.error(e.friendly_message(), now);
                    self.reports.reports = Loadable::Failed(e.friendly_message());
                }
            },
            DataEvent::ReportGenerated(result) => {
                self.report_form.submitting = false;
                match result {
                    Ok(_) => {
                        self.toasts.success("Report generated successfully", now);
                        self.loaded.remove(&View::Reports);
                        self.switch_view(View::Reports);
                    }
                    Err(e) => self.toasts.error(e.friendly_message(), now),
                }
            }
            DataEvent::ReportDownloaded { result, .. } => match result {
                Ok(path) => self.toasts.success(format!("Saved to {}", path.display()), now),
                Err(e) => self.toasts.error(e.friendly_message(), now),
            },
            DataEvent::ReportDeleted { filename, result } => match result {
                Ok(()) => {
                    self.toasts.success(format!("Report {} deleted", filename), now);
                    self.load_view(View::Reports);
                }
                Err(e) => self.toasts.error(e.friendly_message(), now),
            },
            DataEvent::Comparison(result) => {
                self.comparison.data = match result {
                    Ok(data) => Loadable::Loaded(data),
                    Err(e) => {
                        self.toasts.error(e.friendly_message(), now);
                        Loadable::Failed(e.friendly_message())
                    }
                };
            }
            DataEvent::IpBlocked { ip, result } => match result {
                Ok(()) => {
                    self.toasts.success(format!("IP {} blocked successfully", ip), now);
                    self.after_block();
                }
                Err(e) => self.toasts.error(e.friendly_message(), now),
            },
            DataEvent::IpUnblocked { ip, result } => match result {
                Ok(()) => {
                    self.toasts.success(format!("IP {} unblocked successfully", ip), now);
                    self.after_block();
                }
                Err(e) => self.toasts.error(e.friendly_message(), now),
            },
            DataEvent::Login(result) => match result {
                Ok(vigil_api::LoginOutcome::Authenticated) => {
                    self.login.busy = false;
                    self.toasts.success("Login successful!", now);
                    self.enter_dashboard();
                }
                Ok(vigil_api::LoginOutcome::MfaRequired) => {
                    self.login.require_mfa();
                    self.toasts.success("Enter verification code", now);
                }
                Err(e) => {
                    self.login.fail();
                    self.toasts.error(e.friendly_message(), now);
                }
            },
            DataEvent::MfaVerified(result) => match result {
                Ok(()) => {
                    self.login.busy = false;
                    self.toasts.success("Verification successful!", now);
                    self.enter_dashboard();
                }
                Err(e) => {
                    self.login.fail();
                    self.toasts.error(e.friendly_message(), now);
                }
            },
        }
    }

    fn rows_or_toast(
        &mut self,
        result: vigil_api::Result<Vec<AlertRecord>>,
        now: Instant,
    ) -> Vec<AlertRecord> {
        result.unwrap_or_else(|e| {
            self.toasts.error(e.friendly_message(), now);
            Vec::new()
        })
    }

    fn apply_stats(&mut self, stats: &StatsSummary, animate: bool, now: Instant) {
        for id in STAT_COUNTERS {
            let value = stat_value(stats, id);
            let animated = animate
                && match self.registry.counter_mut(id) {
                    Ok(Some(counter)) => {
                        counter.animate_to(value, now);
                        true
                    }
                    _ => false,
                };
            if !animated {
                self.registry.mount(id, Surface::Counter(Counter::new(value)));
            }
        }

        let points = stats.severity_distribution.as_points();
        let chart = match self.registry.chart(SurfaceId::SeverityChart) {
            Some(old) if animate => SeverityChart::animated(old.display_points(now), points, now),
            _ => SeverityChart::new(points),
        };
        self.registry.mount(SurfaceId::SeverityChart, Surface::SeverityChart(chart));
    }

    fn after_block(&mut self) {
        self.data_manager.request(Request::RecentAlerts);
        if self.current_view == View::Alerts {
            self.load_view(View::Alerts);
        } else {
            self.alerts.stale = true;
        }
    }

    /// Run the main application loop.
    pub fn run(&mut self) -> AppResult<()> {
        let mut terminal = enter_terminal()?;

        let result = self.run_loop(&mut terminal);

        self.data_manager.shutdown();
        leave_terminal(&mut terminal)?;

        result
    }

    fn run_loop(&mut self, terminal: &mut CrosstermTerminal) -> AppResult<()> {
        while !self.should_quit {
            let frame_start = Instant::now();

            if self.last_poll_time.elapsed() >= DATA_POLL_INTERVAL {
                self.tick(frame_start);
                self.last_poll_time = frame_start;
            }

            if self.take_dirty() {
                terminal.draw(|frame| self.draw(frame))?;
            }

            let timeout = FRAME_DURATION.saturating_sub(frame_start.elapsed());
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) => self.handle_key_event(key),
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }
        }
        tracing::info!("main loop exited");
        Ok(())
    }

    /// Draw the UI.
    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(3),
            Constraint::Fill(1),
            Constraint::Length(2),
        ])
        .split(area);

        self.draw_header(frame, chunks[0]);
        if chunks[1].height < MIN_CONTENT_HEIGHT {
            self.draw_too_small(frame, chunks[1]);
        } else {
            self.draw_content(frame, chunks[1]);
        }
        self.draw_footer(frame, chunks[2]);

        let theme = self.theme_manager.current();
        if let Some(detail) = &self.detail {
            frame.render_widget(
                Popup::new(&detail.title, &detail.body, theme).scroll(detail.scroll),
                area,
            );
        }
        if let Some(action) = &self.confirm {
            self.draw_confirm(frame, area, &action.prompt());
        }
        if self.show_help {
            self.draw_help_overlay(frame, area);
        }
        if let Some(toast) = self.toasts.current() {
            frame.render_widget(ToastWidget::new(toast, theme), area);
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let title = format!(" VIGIL - {} ", self.current_view.title());
        let indicator = stream_indicator(self.stream_status, theme);

        let mut right = vec![indicator];
        if let Some(err) = self.data_manager.init_error() {
            right.push(Span::raw("  "));
            right.push(Span::styled(
                format!("[{}]", err),
                Style::default().fg(theme.colors.status_error),
            ));
        }
        let right_len: usize = right.iter().map(|s| s.content.chars().count()).sum();
        let used = title.chars().count() + right_len + 2;
        let spacing = (area.width as usize).saturating_sub(used);

        let title_style = Style::default()
            .fg(theme.colors.header)
            .add_modifier(Modifier::BOLD);
        let mut spans = vec![Span::styled(title, title_style), Span::raw(" ".repeat(spacing))];
        spans.extend(right);

        let header = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.colors.border_dim)),
        );
        frame.render_widget(header, area);
    }

    fn draw_too_small(&self, frame: &mut Frame, area: Rect) {
        let needed = MIN_CONTENT_HEIGHT + 5;
        let message = format!("Terminal too small (need {} rows)", needed);
        frame.render_widget(
            Paragraph::new(Span::styled(
                message,
                Style::default().fg(self.theme().colors.status_warning),
            ))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
            area,
        );
    }

    fn draw_content(&self, frame: &mut Frame, area: Rect) {
        match self.current_view {
            View::Overview => self.draw_overview(frame, area),
            View::Alerts => self.draw_alerts(frame, area),
            View::Rules => self.draw_rules(frame, area),
            View::Reports => self.draw_reports(frame, area),
            View::GenerateReport => self.draw_generate_report(frame, area),
            View::Comparison => self.draw_comparison(frame, area),
            View::Login => self.draw_login(frame, area),
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let mut hints = HotkeyHints::new();
        if self.current_view != View::Login {
            for view in View::ALL {
                if let Some(key) = view.hotkey() {
                    hints = hints.hint(key.to_string(), view.title());
                }
            }
        }
        hints = match self.current_view {
            View::Overview => hints
                .hint("1/2/3", "Range")
                .hint("b", "Block")
                .hint("R", "Refresh"),
            View::Alerts => hints
                .hint("f", "Severity")
                .hint("n", "Count")
                .hint("b", "Block"),
            View::Rules => hints
                .hint("/", "Search")
                .hint("f", "Category")
                .hint("d", "Delete"),
            View::Reports => hints.hint("Enter", "Download").hint("d", "Delete"),
            View::GenerateReport => hints
                .hint("↑↓", "Field")
                .hint("Space", "Change")
                .hint("Enter", "Generate"),
            View::Comparison => hints.hint("R", "Refresh"),
            View::Login => hints
                .hint("Tab", "Field")
                .hint("Enter", "Submit")
                .hint("Ctrl+C", "Quit"),
        };
        if self.current_view != View::Login {
            hints = hints
                .hint("T", "Theme")
                .hint("?", "Help")
                .hint("q", "Quit");
        }

        let footer = Paragraph::new(hints.as_line(theme)).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(theme.colors.border_dim)),
        );
        frame.render_widget(footer, area);
    }

    fn draw_overview(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let now = Instant::now();
        let rows = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(5),
        ])
        .split(area);

        let cards = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(rows[0]);
        let card = |title, id| CounterCard::new(title, self.registry.counter(id), theme, now);
        frame.render_widget(card("Total Alerts", SurfaceId::TotalAlerts), cards[0]);
        frame.render_widget(
            card("Blocked Attacks", SurfaceId::BlockedAttacks).color(theme.colors.status_healthy),
            cards[1],
        );
        frame.render_widget(
            card("Critical Threats", SurfaceId::CriticalThreats)
                .color(theme.colors.severity_critical),
            cards[2],
        );
        frame.render_widget(card("Active Rules", SurfaceId::ActiveRules), cards[3]);

        let middle = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(rows[1]);
        frame.render_widget(
            SeverityBars::new(self.registry.chart(SurfaceId::SeverityChart), theme, now),
            middle[0],
        );
        self.draw_timeline(frame, middle[1]);

        let recent = self.registry.table(SurfaceId::RecentAlerts);
        frame.render_widget(
            AlertTableWidget::new("Recent Alerts", recent, theme).focused(self.detail.is_none()),
            rows[2],
        );
    }

    fn draw_timeline(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let title = format!("Attack Timeline ({})", self.overview.range.label());
        let block = panel(&title, theme);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        match &self.overview.timeline {
            Loadable::Loading => {
                frame.render_widget(dim_text(crate::widget::LOADING, theme), inner)
            }
            Loadable::Failed(msg) => frame.render_widget(error_text(msg, theme), inner),
            Loadable::Loaded(points) => {
                let counts: Vec<u64> = points.iter().map(|p| p.count).collect();
                frame.render_widget(
                    SparklineWidget::new(&counts)
                        .color(theme.colors.severity_high)
                        .show_range(true),
                    inner,
                );
            }
        }
    }

    fn draw_alerts(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let rows = Layout::vertical([Constraint::Length(1), Constraint::Min(3)]).split(area);
        let mut filter = self.alerts.filter_label();
        if self.alerts.stale {
            filter.push_str("  (stale)");
        }
        frame.render_widget(dim_text(&filter, theme), rows[0]);
        frame.render_widget(
            AlertTableWidget::new("Alerts", self.registry.table(SurfaceId::AlertsList), theme)
                .columns(AlertColumns::Full)
                .focused(self.detail.is_none()),
            rows[1],
        );
    }

    fn draw_rules(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let now = Instant::now();
        let rows = Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
        ])
        .split(area);

        let cards = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(rows[0]);
        let card = |title, id| CounterCard::new(title, self.registry.counter(id), theme, now);
        frame.render_widget(card("Total Rules", SurfaceId::RulesTotal), cards[0]);
        frame.render_widget(card("AI Rules", SurfaceId::RulesAi), cards[1]);
        frame.render_widget(card("Drop Rules", SurfaceId::RulesDrop), cards[2]);

        let status = if self.rules.searching {
            format!("Search: {}_", self.rules.search.value())
        } else if let Some(query) = &self.rules.showing_search {
            format!("Results for \"{}\" ({})", query, self.rules.total)
        } else {
            format!(
                "category: {}  total: {}",
                self.rules.category.as_deref().unwrap_or("all"),
                self.rules.total
            )
        };
        frame.render_widget(dim_text(&status, theme), rows[1]);

        let block = panel("IPS Rules", theme);
        match &self.rules.rules {
            Loadable::Loading => {
                let loading = dim_text(crate::widget::LOADING, theme).block(block);
                frame.render_widget(loading, rows[2])
            }
            Loadable::Failed(msg) => {
                frame.render_widget(error_text(msg, theme).block(block), rows[2])
            }
            Loadable::Loaded(rules) if rules.is_empty() => {
                frame.render_widget(dim_text("No rules found.", theme).block(block), rows[2])
            }
            Loadable::Loaded(rules) => {
                let table = rule_table(rules, theme).block(block);
                let mut state = TableState::default().with_selected(Some(self.rules.selected));
                frame.render_stateful_widget(table, rows[2], &mut state);
            }
        }
    }

    fn draw_reports(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let block = panel("Reports", theme);
        match &self.reports.reports {
            Loadable::Loading => {
                frame.render_widget(dim_text(crate::widget::LOADING, theme).block(block), area)
            }
            Loadable::Failed(msg) => frame.render_widget(error_text(msg, theme).block(block), area),
            Loadable::Loaded(reports) if reports.is_empty() => {
                frame.render_widget(dim_text("No reports found.", theme).block(block), area)
            }
            Loadable::Loaded(reports) => {
                let table = report_table(reports, theme).block(block);
                let mut state =
                    TableState::default().with_selected(Some(self.reports.selected));
                frame.render_stateful_widget(table, area, &mut state);
            }
        }
    }

    fn draw_generate_report(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let form = &self.report_form;
        let lines: Vec<Line> = FormField::ALL
            .iter()
            .map(|field| {
                let value = match field {
                    FormField::Type => format!("< {} >", form.report_type.label()),
                    FormField::Format => format!("< {} >", form.format.label()),
                    FormField::Start => form.start.value().to_string(),
                    FormField::End => form.end.value().to_string(),
                };
                let focused = *field == form.focus;
                let marker = if focused { "▶ " } else { "  " };
                let style = if focused {
                    Style::default()
                        .fg(theme.colors.header)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.colors.text)
                };
                let label = format!("{:<12}", field.label());
                Line::from(vec![
                    Span::styled(marker, style),
                    Span::styled(label, Style::default().fg(theme.colors.text_dim)),
                    Span::styled(value, style),
                ])
            })
            .chain(std::iter::once(Line::raw("")))
            .chain(std::iter::once(Line::from(Span::styled(
                if form.submitting {
                    "Generating..."
                } else {
                    "[Enter] Generate Report"
                },
                Style::default().fg(theme.colors.hotkey),
            ))))
            .collect();

        frame.render_widget(
            Paragraph::new(lines).block(panel("Generate Report", theme)),
            area,
        );
    }

    fn draw_comparison(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let block = panel("Comparison", theme);
        let data: &Comparison = match &self.comparison.data {
            Loadable::Loading => {
                frame.render_widget(dim_text(crate::widget::LOADING, theme).block(block), area);
                return;
            }
            Loadable::Failed(msg) => {
                frame.render_widget(error_text(msg, theme).block(block), area);
                return;
            }
            Loadable::Loaded(data) => data,
        };
        if data.disabled {
            let msg = data.message.as_deref().unwrap_or("Comparison is disabled.");
            frame.render_widget(dim_text(msg, theme).block(block), area);
            return;
        }

        let rows = Layout::vertical([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        let columns = Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[0]);

        let dim = Style::default().fg(theme.colors.text_dim);
        let text = Style::default().fg(theme.colors.text);
        let events = |list: &[vigil_api::ComparisonEvent]| -> Vec<Line<'static>> {
            list.iter()
                .map(|e| {
                    Line::from(vec![
                        Span::styled(format!("{}  ", e.time), dim),
                        Span::styled(e.event.clone(), text),
                    ])
                })
                .collect()
        };
        let defense = Style::default().fg(theme.colors.defense);
        let attack = Style::default().fg(theme.colors.attack);
        frame.render_widget(
            Paragraph::new(events(&data.defense_events))
                .wrap(Wrap { trim: true })
                .block(panel("Defense Timeline", theme).border_style(defense)),
            columns[0],
        );
        frame.render_widget(
            Paragraph::new(events(&data.attack_events))
                .wrap(Wrap { trim: true })
                .block(panel("Attack Timeline", theme).border_style(attack)),
            columns[1],
        );

        let analysis = &data.analysis;
        let max = analysis
            .attempted
            .iter()
            .chain(analysis.blocked.iter())
            .copied()
            .max()
            .unwrap_or(0);
        let bar_width = (rows[1].width as usize).saturating_sub(2 + 16 + 8) / 2;
        let lines: Vec<Line> = analysis
            .labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let attempted = analysis.attempted.get(i).copied().unwrap_or(0);
                let blocked = analysis.blocked.get(i).copied().unwrap_or(0);
                Line::from(vec![
                    Span::styled(format!("{:<16}", label), text),
                    Span::styled(bar(attempted, max, bar_width), attack),
                    Span::raw(format!(" {} ", attempted)),
                    Span::styled(bar(blocked, max, bar_width), defense),
                    Span::raw(format!(" {}", blocked)),
                ])
            })
            .collect();
        frame.render_widget(
            Paragraph::new(lines).block(panel("Attempted vs Blocked", theme)),
            rows[1],
        );
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let target = centered_rect(50, 60, area);
        let form = &self.login;
        let field_style = |focused: bool| {
            if focused {
                Style::default()
                    .fg(theme.colors.header)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.colors.text)
            }
        };

        let mut lines = Vec::new();
        match form.stage {
            LoginStage::Credentials => {
                let user_focused = form.field == LoginField::Username;
                lines.push(Line::from(vec![
                    Span::styled("Username: ", Style::default().fg(theme.colors.text_dim)),
                    Span::styled(form.username.value().to_string(), field_style(user_focused)),
                ]));
                lines.push(Line::from(vec![
                    Span::styled("Password: ", Style::default().fg(theme.colors.text_dim)),
                    Span::styled("•".repeat(form.password.len()), field_style(!user_focused)),
                ]));
            }
            LoginStage::Mfa => {
                lines.push(Line::from(Span::styled(
                    "Enter the 6-digit code from your authenticator",
                    Style::default().fg(theme.colors.text_dim),
                )));
                let code: String = (0..6)
                    .map(|i| form.code.value().chars().nth(i).unwrap_or('_'))
                    .collect();
                lines.push(Line::from(Span::styled(code, field_style(true))));
            }
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            format!("[ {} ]", form.button_label()),
            Style::default().fg(theme.colors.hotkey),
        )));

        frame.render_widget(Clear, target);
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .block(panel("Sign In", theme)),
            target,
        );
    }

    fn draw_confirm(&self, frame: &mut Frame, area: Rect, prompt: &str) {
        let theme = self.theme();
        let width = (prompt.chars().count() as u16 + 4).min(area.width);
        let target = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(5) / 2,
            width,
            height: 5.min(area.height),
        };
        frame.render_widget(Clear, target);
        frame.render_widget(
            Paragraph::new(vec![
                Line::raw(prompt.to_string()),
                Line::raw(""),
                Line::from(vec![
                    Span::styled("[y]", Style::default().fg(theme.colors.hotkey)),
                    Span::raw(" Confirm  "),
                    Span::styled("[Esc]", Style::default().fg(theme.colors.hotkey)),
                    Span::raw(" Cancel"),
                ]),
            ])
            .alignment(Alignment::Center)
            .block(panel("Confirm", theme)),
            target,
        );
    }

    fn draw_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let theme = self.theme();
        let target = centered_rect(60, 80, area);
        frame.render_widget(Clear, target);

        let help_text = "\
Vigil Hotkey Reference

Views:
  o  Overview      a  Alerts       r  Rules
  p  Reports       g  Generate     c  Comparison
  Tab / Shift+Tab  Cycle views

Actions:
  R        Refresh current view
  1 2 3    Timeline range 24h / 7d / 30d
  f        Cycle severity or category filter
  n        Cycle alert count
  /        Search rules (Enter submits)
  Enter    Details / download / submit
  b  u     Block / unblock source IP
  d        Delete rule or report
  y        Confirm
  T        Toggle theme

General:
  ↑ k  ↓ j Move selection
  Esc      Close / cancel
  q        Quit       Ctrl+C  Force quit

Press any key to close this help.";

        frame.render_widget(
            Paragraph::new(help_text)
                .style(Style::default().fg(theme.colors.text))
                .wrap(Wrap { trim: false })
                .block(panel("Help", theme)),
            target,
        );
    }
}

type CrosstermTerminal = Terminal<CrosstermBackend<io::Stdout>>;

/// Raw mode plus the alternate screen.
fn enter_terminal() -> Result<CrosstermTerminal, VigilError> {
    crossterm::terminal::enable_raw_mode().map_err(VigilError::terminal_init)?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)
        .map_err(VigilError::terminal_init)?;
    Terminal::new(CrosstermBackend::new(stdout)).map_err(VigilError::terminal_init)
}

fn leave_terminal(terminal: &mut CrosstermTerminal) -> Result<(), VigilError> {
    crossterm::terminal::disable_raw_mode().map_err(VigilError::terminal_restore)?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen
    )
    .map_err(VigilError::terminal_restore)?;
    terminal.show_cursor().map_err(VigilError::terminal_restore)
}

fn panel<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.colors.border_dim))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default()
                .fg(theme.colors.header)
                .add_modifier(Modifier::BOLD),
        ))
}

fn dim_text<'a>(text: &str, theme: &Theme) -> Paragraph<'a> {
    let style = Style::default().fg(theme.colors.text_dim);
    Paragraph::new(Span::styled(text.to_string(), style))
}

fn error_text<'a>(text: &str, theme: &Theme) -> Paragraph<'a> {
    let style = Style::default().fg(theme.colors.status_error);
    Paragraph::new(Span::styled(text.to_string(), style)).wrap(Wrap { trim: true })
}

fn rule_table<'a>(rules: &[RuleEntry], theme: &Theme) -> Table<'a> {
    let rows: Vec<Row> = rules
        .iter()
        .map(|rule| {
            let action_color = if rule.is_drop() {
                theme.colors.status_error
            } else {
                theme.colors.status_warning
            };
            Row::new(vec![
                Cell::from(rule.sid.to_string()),
                Cell::from(Span::styled(
                    rule.action_display(),
                    Style::default().fg(action_color),
                )),
                Cell::from(rule.message.clone().unwrap_or_default()),
                Cell::from(rule.category.clone().unwrap_or_else(|| "N/A".to_string())),
                Cell::from(if rule.is_ai_generated() { "AI" } else { "" }),
            ])
            .style(Style::default().fg(theme.colors.text))
        })
        .collect();

    Table::new(
        rows,
        [
            Constraint::Length(10),
            Constraint::Length(7),
            Constraint::Min(20),
            Constraint::Length(22),
            Constraint::Length(3),
        ],
    )
    .header(
        Row::new(vec!["SID", "Action", "Message", "Category", ""])
            .style(Style::default().fg(theme.colors.header)),
    )
    .row_highlight_style(Style::default().bg(theme.colors.selection))
}

fn report_table<'a>(reports: &[ReportEntry], theme: &Theme) -> Table<'a> {
    let rows: Vec<Row> = reports
        .iter()
        .map(|report| {
            Row::new(vec![
                Cell::from(report.filename.clone()),
                Cell::from(report.size_display()),
                Cell::from(report.created.clone().unwrap_or_else(|| "N/A".to_string())),
            ])
            .style(Style::default().fg(theme.colors.text))
        })
        .collect();

    let widths = [
        Constraint::Min(24),
        Constraint::Length(12),
        Constraint::Length(22),
    ];
    Table::new(rows, widths)
        .header(
            Row::new(vec!["Filename", "Size", "Created"])
                .style(Style::default().fg(theme.colors.header)),
        )
        .row_highlight_style(Style::default().bg(theme.colors.selection))
}
