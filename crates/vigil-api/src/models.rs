//! Typed payloads for the backend endpoints.
//!
//! Counts default to zero and lists to empty when a field is missing; the
//! backend omits them freely when there is nothing to report.

use chrono::{DateTime, Duration, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use vigil_core::SeverityBucket;

/// `GET /api/get-stats`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatsSummary {
    pub total_alerts_24h: u64,
    pub blocked_attacks_24h: u64,
    pub critical_alerts_24h: u64,
    pub active_rules_count: u64,
    pub ai_rules_count: u64,
    pub drop_rules_count: u64,
    pub severity_distribution: SeverityDistribution,
}

/// Alert counts per severity bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SeverityDistribution {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl SeverityDistribution {
    /// Counts in [`SeverityBucket::ALL`] order.
    pub fn as_points(&self) -> [u64; 4] {
        [self.critical, self.high, self.medium, self.low]
    }

    pub fn get(&self, bucket: SeverityBucket) -> u64 {
        self.as_points()[bucket.index()]
    }
}

/// One point of the attack timeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimelinePoint {
    pub time: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TimelineResponse {
    pub timeline: Vec<TimelinePoint>,
}

/// Time span shown by the attack timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimelineRange {
    #[default]
    Day,
    Week,
    Month,
}

impl TimelineRange {
    pub fn hours(&self) -> u32 {
        match self {
            Self::Day => 24,
            Self::Week => 168,
            Self::Month => 720,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "24h",
            Self::Week => "7d",
            Self::Month => "30d",
        }
    }
}

/// An IPS rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(deserialize_with = "sid_from_number_or_string")]
    pub sid: u64,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    /// Full rule text
    #[serde(default)]
    pub rule: Option<String>,
}

impl RuleEntry {
    /// Rules written by the rule generator live in `auto_generated*` files
    /// and are the only ones that may be deleted.
    pub fn is_ai_generated(&self) -> bool {
        self.file
            .as_deref()
            .is_some_and(|f| f.contains("auto_generated"))
    }

    /// Whether the rule drops traffic rather than only alerting.
    pub fn is_drop(&self) -> bool {
        self.action.as_deref() == Some("drop")
    }

    /// Action badge text, `ALERT` when unspecified.
    pub fn action_display(&self) -> String {
        self.action
            .as_deref()
            .map(str::to_uppercase)
            .unwrap_or_else(|| "ALERT".to_string())
    }

    /// Text for the detail popup: the rule itself, or the entry as JSON.
    pub fn detail_text(&self) -> String {
        match self.rule.as_deref() {
            Some(rule) if !rule.is_empty() => rule.to_string(),
            _ => serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self)),
        }
    }
}

fn sid_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Sid {
        Number(u64),
        Text(String),
    }

    match Sid::deserialize(deserializer)? {
        Sid::Number(n) => Ok(n),
        Sid::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// `GET /api/get-rules`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuleList {
    pub rules: Vec<RuleEntry>,
    pub total: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RuleSearchResponse {
    pub results: Vec<RuleEntry>,
}

/// A generated report on the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReportEntry {
    pub filename: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, alias = "created_at")]
    pub created: Option<String>,
}

impl ReportEntry {
    /// Size in KiB with one decimal, `N/A` when unknown.
    pub fn size_display(&self) -> String {
        match self.size {
            Some(bytes) if bytes > 0 => format!("{:.1} KB", bytes as f64 / 1024.0),
            _ => vigil_core::types::NOT_AVAILABLE.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReportListResponse {
    pub reports: Vec<ReportEntry>,
}

/// Kind of report to generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    #[default]
    Summary,
    Detailed,
    Executive,
}

impl ReportType {
    pub const ALL: [ReportType; 3] = [Self::Summary, Self::Detailed, Self::Executive];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Summary => "summary",
            Self::Detailed => "detailed",
            Self::Executive => "executive",
        }
    }
}

/// Output format of a generated report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Html,
    Json,
}

impl ReportFormat {
    pub const ALL: [ReportFormat; 3] = [Self::Pdf, Self::Html, Self::Json];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

/// Time format the report endpoint expects (minute precision, local time).
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// `POST /api/generate-report` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub start_time: String,
    pub end_time: String,
    pub format: ReportFormat,
}

impl ReportRequest {
    /// The last 24 hours up to `now`.
    pub fn last_day(now: DateTime<Local>) -> Self {
        let start = now - Duration::hours(24);
        Self {
            report_type: ReportType::default(),
            start_time: start.format(REPORT_TIME_FORMAT).to_string(),
            end_time: now.format(REPORT_TIME_FORMAT).to_string(),
            format: ReportFormat::default(),
        }
    }

    /// Check that both ends are filled in and in order.
    pub fn validate(&self) -> crate::Result<()> {
        if self.start_time.trim().is_empty() || self.end_time.trim().is_empty() {
            return Err(crate::ApiError::Validation("Please select date range".to_string()));
        }
        let parse = |s: &str| NaiveDateTime::parse_from_str(s.trim(), REPORT_TIME_FORMAT);
        match (parse(&self.start_time), parse(&self.end_time)) {
            (Ok(start), Ok(end)) if start <= end => Ok(()),
            (Ok(_), Ok(_)) => Err(crate::ApiError::Validation(
                "Start time must be before end time".to_string(),
            )),
            _ => Err(crate::ApiError::Validation(
                "Times must look like YYYY-MM-DDTHH:MM".to_string(),
            )),
        }
    }
}

/// One entry of a comparison timeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ComparisonEvent {
    pub time: String,
    pub event: String,
}

/// Attempted vs blocked counts per label.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ComparisonAnalysis {
    pub labels: Vec<String>,
    pub attempted: Vec<u64>,
    pub blocked: Vec<u64>,
}

/// `GET /api/get-comparison`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Comparison {
    pub disabled: bool,
    pub message: Option<String>,
    pub defense_events: Vec<ComparisonEvent>,
    pub attack_events: Vec<ComparisonEvent>,
    pub analysis: ComparisonAnalysis,
}

/// Result of a login attempt that the backend accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Logged in
    Authenticated,
    /// Password accepted, a one-time code is needed next
    MfaRequired,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginResponse {
    pub mfa_required: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BlockRequest<'a> {
    pub ip: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'a str>,
}

/// Reason attached to blocks made from the console.
pub const MANUAL_BLOCK_REASON: &str = "Manual block from dashboard";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_stats_missing_fields_default_to_zero() {
        let stats: StatsSummary = serde_json::from_value(json!({
            "total_alerts_24h": 120,
            "severity_distribution": {"critical": 3}
        }))
        .unwrap();
        assert_eq!(stats.total_alerts_24h, 120);
        assert_eq!(stats.blocked_attacks_24h, 0);
        assert_eq!(stats.severity_distribution.as_points(), [3, 0, 0, 0]);
    }

    #[test]
    fn test_rule_accepts_string_sid_and_msg_alias() {
        let rule: RuleEntry = serde_json::from_value(json!({
            "sid": "9000001",
            "msg": "ET SCAN nmap",
            "file": "auto_generated.rules"
        }))
        .unwrap();
        assert_eq!(rule.sid, 9000001);
        assert_eq!(rule.message.as_deref(), Some("ET SCAN nmap"));
        assert!(rule.is_ai_generated());
        assert_eq!(rule.action_display(), "ALERT");
    }

    #[test]
    fn test_rule_detail_prefers_rule_text() {
        let rule: RuleEntry = serde_json::from_value(json!({
            "sid": 1,
            "action": "drop",
            "rule": "drop tcp any any -> any 22 (sid:1;)"
        }))
        .unwrap();
        assert!(rule.is_drop());
        assert_eq!(rule.detail_text(), "drop tcp any any -> any 22 (sid:1;)");
    }

    #[test]
    fn test_report_size_display() {
        let report = ReportEntry {
            filename: "r.pdf".into(),
            size: Some(2048),
            created: None,
        };
        assert_eq!(report.size_display(), "2.0 KB");
        let unknown = ReportEntry {
            size: None,
            ..report
        };
        assert_eq!(unknown.size_display(), "N/A");
    }

    #[test]
    fn test_report_request_last_day() {
        let now = Local.with_ymd_and_hms(2025, 3, 2, 9, 15, 0).unwrap();
        let req = ReportRequest::last_day(now);
        assert_eq!(req.start_time, "2025-03-01T09:15");
        assert_eq!(req.end_time, "2025-03-02T09:15");
        assert!(req.validate().is_ok());

        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["report_type"], "summary");
        assert_eq!(body["format"], "pdf");
    }

    #[test]
    fn test_report_request_rejects_empty_and_reversed() {
        let mut req = ReportRequest::last_day(Local::now());
        req.start_time.clear();
        assert!(req.validate().is_err());

        req.start_time = "2025-03-03T00:00".into();
        req.end_time = "2025-03-02T00:00".into();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_comparison_disabled_shape() {
        let cmp: Comparison = serde_json::from_value(json!({
            "disabled": true,
            "message": "Comparison is disabled."
        }))
        .unwrap();
        assert!(cmp.disabled);
        assert!(cmp.defense_events.is_empty());
    }

    #[test]
    fn test_timeline_range_hours() {
        assert_eq!(TimelineRange::Day.hours(), 24);
        assert_eq!(TimelineRange::Week.hours(), 168);
        assert_eq!(TimelineRange::Month.hours(), 720);
    }
}
