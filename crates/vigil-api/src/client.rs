//! HTTP client for the dashboard backend.
//!
//! Each method maps to one endpoint, runs the response through the envelope
//! check and decodes the typed payload. Requests are never retried; a failed
//! call is reported once and the caller decides what to show.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use vigil_config::ConsoleConfig;
use vigil_core::{AlertRecord, SeverityBucket, log_api_call, normalize_value};

use crate::envelope::{self, with_endpoint};
use crate::error::{ApiError, Result};
use crate::models::{
    BlockRequest, Comparison, LoginOutcome, LoginResponse, MANUAL_BLOCK_REASON, ReportEntry,
    ReportListResponse, ReportRequest, RuleEntry, RuleList, RuleSearchResponse, StatsSummary,
    TimelinePoint, TimelineResponse,
};

/// Alert list filter for `GET /api/get-alerts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertFilter {
    /// `None` means every severity
    pub severity: Option<SeverityBucket>,
    pub count: u32,
}

impl AlertFilter {
    pub fn severity_param(&self) -> &'static str {
        self.severity.map(|b| b.query_value()).unwrap_or("all")
    }
}

/// REST client for one backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
    timeout_secs: u64,
}

impl ApiClient {
    /// Create a client for `base` with a per-request timeout.
    ///
    /// Cookies are kept so that a login carries over to later requests.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        if base.cannot_be_a_base() {
            return Err(ApiError::Validation(format!("{base} cannot be used as a base URL")));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Validation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Create a client from the console configuration.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self> {
        Self::new(config.api_base()?, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::Validation(format!("{} cannot be used as a base URL", self.base))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute(&self, label: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let started = Instant::now();
        let result = self
            .send(request)
            .await
            .map_err(|e| with_endpoint(e, label));
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => log_api_call!(label, success = true, elapsed_ms),
            Err(e) => log_api_call!(label, success = false, elapsed_ms, error = %e),
        }
        result
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_secs))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_secs))?;
        envelope::interpret(status, &body)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let label = format!("/{}", segments.join("/"));
        let request = self.client.get(self.endpoint(segments)?).query(query);
        let value = self.execute(&label, request).await?;
        envelope::decode(&label, value)
    }

    async fn call<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Value> {
        let label = format!("/{}", segments.join("/"));
        let mut request = self.client.request(method, self.endpoint(segments)?);
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(&label, request).await
    }

    /// `GET /api/get-stats`
    pub async fn stats(&self) -> Result<StatsSummary> {
        self.get(&["api", "get-stats"], &[]).await
    }

    /// `GET /api/get-timeline?hours=N`
    pub async fn timeline(&self, hours: u32) -> Result<Vec<TimelinePoint>> {
        let response: TimelineResponse = self
            .get(&["api", "get-timeline"], &[("hours", hours.to_string())])
            .await?;
        Ok(response.timeline)
    }

    /// `GET /api/get-recent-alerts`
    pub async fn recent_alerts(&self) -> Result<Vec<AlertRecord>> {
        let value: Value = self.get(&["api", "get-recent-alerts"], &[]).await?;
        normalize_logs("/api/get-recent-alerts", value)
    }

    /// `GET /api/get-alerts?severity=S&count=N`
    pub async fn alerts(&self, filter: AlertFilter) -> Result<Vec<AlertRecord>> {
        let query = [
            ("severity", filter.severity_param().to_string()),
            ("count", filter.count.to_string()),
        ];
        let value: Value = self.get(&["api", "get-alerts"], &query).await?;
        normalize_logs("/api/get-alerts", value)
    }

    /// `GET /api/get-rules?category=C`. `None` lists every category.
    pub async fn rules(&self, category: Option<&str>) -> Result<RuleList> {
        let category = category.unwrap_or("all").to_string();
        self.get(&["api", "get-rules"], &[("category", category)]).await
    }

    /// `GET /api/rules/search?query=Q`
    pub async fn search_rules(&self, query: &str) -> Result<Vec<RuleEntry>> {
        let response: RuleSearchResponse = self
            .get(&["api", "rules", "search"], &[("query", query.to_string())])
            .await?;
        Ok(response.results)
    }

    /// `DELETE /api/rules/{sid}`
    pub async fn delete_rule(&self, sid: u64) -> Result<()> {
        let sid = sid.to_string();
        self.call::<()>(Method::DELETE, &["api", "rules", &sid], None)
            .await?;
        Ok(())
    }

    /// `GET /api/get-reports`
    pub async fn reports(&self) -> Result<Vec<ReportEntry>> {
        let response: ReportListResponse = self.get(&["api", "get-reports"], &[]).await?;
        Ok(response.reports)
    }

    /// `POST /api/generate-report`. Returns the new file name when the
    /// backend reports one.
    pub async fn generate_report(&self, request: &ReportRequest) -> Result<Option<String>> {
        request.validate()?;
        let value = self
            .call(Method::POST, &["api", "generate-report"], Some(request))
            .await?;
        Ok(value
            .get("filename")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// `GET /api/reports/download/{filename}`, saved under `dir`.
    pub async fn download_report(&self, filename: &str, dir: &Path) -> Result<PathBuf> {
        validate_filename(filename)?;
        let label = "/api/reports/download";
        let url = self.endpoint(&["api", "reports", "download", filename])?;
        let started = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_secs))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_secs))?;

        if !(200..300).contains(&status) {
            let err = ApiError::from_http_status(status, &String::from_utf8_lossy(&body));
            log_api_call!(label, success = false, error = %err);
            return Err(err);
        }

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(filename);
        tokio::fs::write(&path, &body).await?;

        log_api_call!(
            label,
            success = true,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        Ok(path)
    }

    /// `DELETE /api/reports/delete/{filename}`
    pub async fn delete_report(&self, filename: &str) -> Result<()> {
        validate_filename(filename)?;
        self.call::<()>(
            Method::DELETE,
            &["api", "reports", "delete", filename],
            None,
        )
        .await?;
        Ok(())
    }

    /// `GET /api/get-comparison`
    pub async fn comparison(&self) -> Result<Comparison> {
        self.get(&["api", "get-comparison"], &[]).await
    }

    /// `POST /api/block-ip`
    pub async fn block_ip(&self, ip: &str) -> Result<()> {
        validate_ip(ip)?;
        let body = BlockRequest {
            ip,
            reason: Some(MANUAL_BLOCK_REASON),
        };
        self.call(Method::POST, &["api", "block-ip"], Some(&body))
            .await?;
        Ok(())
    }

    /// `POST /api/unblock-ip`
    pub async fn unblock_ip(&self, ip: &str) -> Result<()> {
        validate_ip(ip)?;
        let body = BlockRequest { ip, reason: None };
        self.call(Method::POST, &["api", "unblock-ip"], Some(&body))
            .await?;
        Ok(())
    }

    /// `POST /login`
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        let body = json!({ "username": username, "password": password });
        let value = self.call(Method::POST, &["login"], Some(&body)).await?;
        let response: LoginResponse = envelope::decode("/login", value)?;
        Ok(if response.mfa_required {
            LoginOutcome::MfaRequired
        } else {
            LoginOutcome::Authenticated
        })
    }

    /// `POST /verify-mfa-ajax`. The code must be exactly six digits.
    pub async fn verify_mfa(&self, code: &str) -> Result<()> {
        validate_mfa_code(code)?;
        let body = json!({ "code": code });
        self.call(Method::POST, &["verify-mfa-ajax"], Some(&body))
            .await?;
        Ok(())
    }
}

/// Normalize the `logs` array of an alert list, skipping entries that do not
/// validate. A body without a `logs` array is rejected.
fn normalize_logs(endpoint: &str, value: Value) -> Result<Vec<AlertRecord>> {
    let logs = match value {
        Value::Object(mut fields) => match fields.remove("logs") {
            Some(Value::Array(logs)) => logs,
            Some(other) => {
                let message = format!("`logs` is {}", json_kind(&other));
                return Err(bad_logs(endpoint, message));
            }
            None => return Err(bad_logs(endpoint, "missing `logs`".to_string())),
        },
        other => {
            let message = format!("expected an object, got {}", json_kind(&other));
            return Err(bad_logs(endpoint, message));
        }
    };

    let total = logs.len();
    let alerts: Vec<AlertRecord> = logs
        .into_iter()
        .filter_map(|entry| match normalize_value(entry) {
            Ok(alert) => Some(alert),
            Err(e) => {
                warn!(endpoint, error = %e, "skipping malformed alert entry");
                None
            }
        })
        .collect();

    debug!(
        endpoint,
        total,
        kept = alerts.len(),
        "alert list normalized"
    );
    Ok(alerts)
}

fn bad_logs(endpoint: &str, message: String) -> ApiError {
    warn!(endpoint, message = %message, "rejecting alert list");
    ApiError::Decode {
        endpoint: endpoint.to_string(),
        message,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A report name must be a single path component.
pub fn validate_filename(filename: &str) -> Result<()> {
    let bad = filename.is_empty()
        || filename == "."
        || filename == ".."
        || filename.contains(['/', '\\']);
    if bad {
        return Err(ApiError::Validation(format!("Invalid report name: {filename}")));
    }
    Ok(())
}

/// Block targets must be real addresses, not the `N/A` placeholder.
pub fn validate_ip(ip: &str) -> Result<()> {
    let ip = ip.trim();
    if ip.is_empty() || ip == vigil_core::types::NOT_AVAILABLE {
        return Err(ApiError::Validation("Invalid IP address".to_string()));
    }
    Ok(())
}

/// One-time codes are exactly six ASCII digits.
pub fn validate_mfa_code(code: &str) -> Result<()> {
    if code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::Validation("Verification code must be 6 digits".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let c = client("http://localhost:8080");
        assert_eq!(
            c.endpoint(&["api", "get-stats"]).unwrap().as_str(),
            "http://localhost:8080/api/get-stats"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_prefix() {
        let c = client("http://gateway/ids/");
        assert_eq!(
            c.endpoint(&["api", "rules", "42"]).unwrap().as_str(),
            "http://gateway/ids/api/rules/42"
        );
    }

    #[test]
    fn test_endpoint_escapes_filename() {
        let c = client("http://localhost:8080");
        let url = c
            .endpoint(&["api", "reports", "download", "weekly report.pdf"])
            .unwrap();
        assert!(url.as_str().ends_with("/download/weekly%20report.pdf"));
    }

    #[test]
    fn test_validate_filename() {
        assert!(validate_filename("report_20250101.pdf").is_ok());
        assert!(validate_filename("").is_err());
        assert!(validate_filename("..").is_err());
        assert!(validate_filename("../etc/passwd").is_err());
        assert!(validate_filename("a\\b").is_err());
    }

    #[test]
    fn test_validate_ip_rejects_placeholder() {
        assert!(validate_ip("10.0.0.5").is_ok());
        assert!(validate_ip("N/A").is_err());
        assert!(validate_ip("  ").is_err());
    }

    #[test]
    fn test_validate_mfa_code() {
        assert!(validate_mfa_code("123456").is_ok());
        assert!(validate_mfa_code("12345").is_err());
        assert!(validate_mfa_code("1234567").is_err());
        assert!(validate_mfa_code("12a456").is_err());
    }

    #[test]
    fn test_alert_filter_param() {
        let all = AlertFilter {
            severity: None,
            count: 50,
        };
        assert_eq!(all.severity_param(), "all");
        let high = AlertFilter {
            severity: Some(SeverityBucket::High),
            count: 25,
        };
        assert_eq!(high.severity_param(), "high");
    }

    #[test]
    fn test_normalize_logs_skips_bad_entries() {
        let value = json!({
            "logs": [
                {"timestamp": "2025-01-15T10:30:00Z", "src_ip": "10.0.0.5", "severity": 2},
                {"src_ip": "no timestamp"},
                "garbage"
            ]
        });
        let alerts = normalize_logs("/api/get-alerts", value).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].src_ip.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn test_normalize_logs_missing_field() {
        let err = normalize_logs("/api/get-recent-alerts", json!({"count": 0})).unwrap_err();
        assert!(matches!(
            &err,
            ApiError::Decode { endpoint, message }
                if endpoint == "/api/get-recent-alerts" && message.contains("missing")
        ));
        assert_eq!(
            err.friendly_message(),
            "Unexpected response from /api/get-recent-alerts"
        );
    }

    #[test]
    fn test_normalize_logs_wrong_type() {
        let err = normalize_logs("/api/get-alerts", json!({"logs": {"0": {}}})).unwrap_err();
        assert!(
            matches!(err, ApiError::Decode { ref message, .. } if message.contains("an object"))
        );

        let err = normalize_logs("/api/get-alerts", json!([])).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}
