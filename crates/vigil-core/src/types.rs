//! Shared type definitions used across Vigil crates.
//!
//! [`AlertRecord`] is the canonical shape of one intrusion alert, whether it
//! arrived on the live stream or in a REST alert list.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for absent endpoint/signature fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Severity buckets used by counters and the distribution chart.
///
/// Suricata reports severity as an ordinal where 1 is the most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBucket {
    Critical,
    High,
    Medium,
    Low,
}

impl SeverityBucket {
    /// All buckets in chart order.
    pub const ALL: [SeverityBucket; 4] = [
        SeverityBucket::Critical,
        SeverityBucket::High,
        SeverityBucket::Medium,
        SeverityBucket::Low,
    ];

    /// Map an ordinal severity to its bucket.
    ///
    /// `1 → Critical`, `2 → High`, `3 → Medium`, `>= 4 → Low`. Values below 1
    /// have no bucket.
    pub fn from_severity(severity: i64) -> Option<Self> {
        match severity {
            1 => Some(Self::Critical),
            2 => Some(Self::High),
            3 => Some(Self::Medium),
            s if s >= 4 => Some(Self::Low),
            _ => None,
        }
    }

    /// Position of this bucket in [`SeverityBucket::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Filter value understood by the alert list endpoint.
    pub fn query_value(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for SeverityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// When an alert happened.
///
/// Backends are not consistent about timezones, so anything that does not
/// parse as RFC 3339 or a naive ISO timestamp is kept verbatim for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertTime {
    Parsed(DateTime<Utc>),
    Raw(String),
}

impl AlertTime {
    /// Parse a timestamp string.
    pub fn parse(raw: &str) -> Self {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Self::Parsed(ts.with_timezone(&Utc));
        }
        // Suricata's eve.json writes offsets without a colon, e.g. +0000.
        if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Self::Parsed(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Self::Parsed(naive.and_utc());
        }
        Self::Raw(raw.to_string())
    }

    /// Short local time, used in the recent-alerts table.
    pub fn time_of_day(&self) -> String {
        match self {
            Self::Parsed(ts) => ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }

    /// Full local date and time, used in the alert list.
    pub fn date_time(&self) -> String {
        match self {
            Self::Parsed(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Raw(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for AlertTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(ts) => write!(f, "{}", ts.to_rfc3339()),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

/// A normalized intrusion alert.
///
/// Built fresh for every inbound message and discarded once it has been
/// applied to the view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub timestamp: AlertTime,
    pub src_ip: Option<String>,
    pub dest_ip: Option<String>,
    pub signature: Option<String>,
    pub category: Option<String>,
    /// Ordinal severity, 1 being most severe
    pub severity: Option<i64>,
    /// The payload as received, kept for the detail popup
    pub raw: serde_json::Value,
}

impl AlertRecord {
    /// Severity bucket, if the severity maps to one.
    pub fn bucket(&self) -> Option<SeverityBucket> {
        self.severity.and_then(SeverityBucket::from_severity)
    }

    /// Whether this alert counts as a critical threat.
    pub fn is_critical(&self) -> bool {
        self.bucket() == Some(SeverityBucket::Critical)
    }

    /// Source IP or `N/A`.
    pub fn src_ip_display(&self) -> &str {
        self.src_ip.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Destination IP or `N/A`.
    pub fn dest_ip_display(&self) -> &str {
        self.dest_ip.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Signature or `N/A`.
    pub fn signature_display(&self) -> &str {
        self.signature.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    /// Severity badge text: the bucket name, or the raw ordinal when it has none.
    pub fn severity_display(&self) -> String {
        match (self.bucket(), self.severity) {
            (Some(bucket), _) => bucket.label().to_uppercase(),
            (None, Some(sev)) => sev.to_string(),
            (None, None) => String::new(),
        }
    }

    /// Source IP usable for a block request, if there is one.
    pub fn blockable_ip(&self) -> Option<&str> {
        self.src_ip
            .as_deref()
            .filter(|ip| !ip.is_empty() && *ip != NOT_AVAILABLE)
    }

    /// Pretty-printed payload for the detail popup.
    pub fn detail_json(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_mapping() {
        assert_eq!(
            SeverityBucket::from_severity(1),
            Some(SeverityBucket::Critical)
        );
        assert_eq!(SeverityBucket::from_severity(2), Some(SeverityBucket::High));
        assert_eq!(
            SeverityBucket::from_severity(3),
            Some(SeverityBucket::Medium)
        );
        for sev in 4..10 {
            assert_eq!(
                SeverityBucket::from_severity(sev),
                Some(SeverityBucket::Low)
            );
        }
        assert_eq!(
            SeverityBucket::from_severity(i64::MAX),
            Some(SeverityBucket::Low)
        );
    }

    #[test]
    fn test_bucket_mapping_below_one() {
        assert_eq!(SeverityBucket::from_severity(0), None);
        assert_eq!(SeverityBucket::from_severity(-3), None);
        assert_eq!(SeverityBucket::from_severity(i64::MIN), None);
    }

    #[test]
    fn test_bucket_index_matches_all_order() {
        for (i, bucket) in SeverityBucket::ALL.iter().enumerate() {
            assert_eq!(bucket.index(), i);
        }
    }

    #[test]
    fn test_alert_time_parsing() {
        assert!(matches!(
            AlertTime::parse("2025-01-15T10:30:00Z"),
            AlertTime::Parsed(_)
        ));
        assert!(matches!(
            AlertTime::parse("2025-01-15T10:30:00.123456+0000"),
            AlertTime::Parsed(_)
        ));
        assert!(matches!(
            AlertTime::parse("2025-01-15T10:30:00"),
            AlertTime::Parsed(_)
        ));
        assert_eq!(
            AlertTime::parse("yesterday"),
            AlertTime::Raw("yesterday".to_string())
        );
    }

    #[test]
    fn test_display_placeholders() {
        let record = AlertRecord {
            timestamp: AlertTime::parse("2025-01-15T10:30:00Z"),
            src_ip: None,
            dest_ip: None,
            signature: None,
            category: None,
            severity: None,
            raw: serde_json::json!({}),
        };
        assert_eq!(record.src_ip_display(), "N/A");
        assert_eq!(record.dest_ip_display(), "N/A");
        assert_eq!(record.signature_display(), "N/A");
        assert_eq!(record.severity_display(), "");
        assert_eq!(record.bucket(), None);
        assert!(record.blockable_ip().is_none());
    }

    #[test]
    fn test_severity_display() {
        let mut record = AlertRecord {
            timestamp: AlertTime::Raw("t".into()),
            src_ip: Some("10.0.0.5".into()),
            dest_ip: None,
            signature: None,
            category: None,
            severity: Some(1),
            raw: serde_json::Value::Null,
        };
        assert_eq!(record.severity_display(), "CRITICAL");
        assert!(record.is_critical());
        assert_eq!(record.blockable_ip(), Some("10.0.0.5"));

        record.severity = Some(0);
        assert_eq!(record.severity_display(), "0");
        assert!(!record.is_critical());
    }
}
