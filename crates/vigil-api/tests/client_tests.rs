//! HTTP tests for the REST client against a wiremock server.
//!
//! These tests verify request shapes (paths, query strings, bodies) and how
//! responses are classified: envelope rejections, status errors, 204s and
//! malformed alert entries.

use std::time::Duration;

use reqwest::Url;
use serde_json::json;
use vigil_api::{AlertFilter, ApiClient, ApiError, LoginOutcome, ReportRequest};
use vigil_core::SeverityBucket;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(Url::parse(&server.uri()).unwrap(), Duration::from_secs(2)).unwrap()
}

#[cfg(test)]
mod stats_and_timeline {
    use super::*;

    #[tokio::test]
    async fn test_stats_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "total_alerts_24h": 1520,
                "blocked_attacks_24h": 87,
                "critical_alerts_24h": 3,
                "active_rules_count": 30112,
                "ai_rules_count": 14,
                "drop_rules_count": 9,
                "severity_distribution": {"critical": 3, "high": 40, "medium": 200, "low": 1277}
            })))
            .mount(&server)
            .await;

        let stats = client_for(&server).stats().await.unwrap();
        assert_eq!(stats.total_alerts_24h, 1520);
        assert_eq!(stats.critical_alerts_24h, 3);
        assert_eq!(stats.severity_distribution.as_points(), [3, 40, 200, 1277]);
    }

    #[tokio::test]
    async fn test_stats_server_error_uses_error_field() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-stats"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": "Elasticsearch unavailable"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).stats().await.unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
        assert_eq!(err.friendly_message(), "Elasticsearch unavailable");
    }

    #[tokio::test]
    async fn test_timeline_passes_hours() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-timeline"))
            .and(query_param("hours", "168"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "timeline": [
                    {"time": "2025-01-15 10:00", "count": 4},
                    {"time": "2025-01-15 11:00", "count": 9}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let points = client_for(&server).timeline(168).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].count, 9);
    }
}

#[cfg(test)]
mod alerts {
    use super::*;

    #[tokio::test]
    async fn test_alert_list_query_and_normalization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-alerts"))
            .and(query_param("severity", "critical"))
            .and(query_param("count", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 3,
                "logs": [
                    {
                        "timestamp": "2025-01-15T10:30:00Z",
                        "src_ip": "10.0.0.5",
                        "severity": 1,
                        "signature": "SQLi attempt"
                    },
                    {"timestamp": 17, "src_ip": "10.0.0.6"},
                    {"timestamp": "2025-01-15T10:31:00Z", "src_ip": "10.0.0.7", "severity": "1"}
                ]
            })))
            .mount(&server)
            .await;

        let filter = AlertFilter {
            severity: Some(SeverityBucket::Critical),
            count: 100,
        };
        let alerts = client_for(&server).alerts(filter).await.unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.is_critical()));
    }

    #[tokio::test]
    async fn test_recent_alerts_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-recent-alerts"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"count": 0, "logs": []})),
            )
            .mount(&server)
            .await;

        let alerts = client_for(&server).recent_alerts().await.unwrap();
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn test_alert_list_without_logs_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-alerts"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true})),
            )
            .mount(&server)
            .await;

        let filter = AlertFilter {
            severity: None,
            count: 50,
        };
        let err = client_for(&server).alerts(filter).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }
}

#[cfg(test)]
mod actions {
    use super::*;

    #[tokio::test]
    async fn test_block_ip_sends_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/block-ip"))
            .and(body_json(json!({"ip": "10.0.0.5", "reason": "Manual block from dashboard"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).block_ip("10.0.0.5").await.unwrap();
    }

    #[tokio::test]
    async fn test_block_ip_rejected_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/block-ip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": false, "error": "IP is whitelisted"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).block_ip("10.0.0.5").await.unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "IP is whitelisted"));
    }

    #[tokio::test]
    async fn test_block_placeholder_ip_never_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).block_ip("N/A").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unblock_ip_body_has_no_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/unblock-ip"))
            .and(body_json(json!({"ip": "10.0.0.5"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).unblock_ip("10.0.0.5").await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_rule_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/rules/9000003"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).delete_rule(9000003).await.unwrap();
    }

    #[tokio::test]
    async fn test_rule_search_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rules/search"))
            .and(query_param("query", "nmap"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "query": "nmap",
                "count": 1,
                "results": [{
                    "sid": 9000000,
                    "action": "alert",
                    "message": "Nmap scan",
                    "category": "ai-generated",
                    "file": "auto_generated.rules",
                    "rule": "alert tcp any any -> any any (msg:\"Nmap scan\"; sid:9000000;)"
                }]
            })))
            .mount(&server)
            .await;

        let rules = client_for(&server).search_rules("nmap").await.unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].is_ai_generated());
    }
}

#[cfg(test)]
mod reports {
    use super::*;

    #[tokio::test]
    async fn test_download_writes_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reports/download/weekly.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"%PDF-1.4 test".to_vec()),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let saved = client_for(&server)
            .download_report("weekly.pdf", &dir.path().join("reports"))
            .await
            .unwrap();

        assert_eq!(saved, dir.path().join("reports").join("weekly.pdf"));
        assert_eq!(std::fs::read(&saved).unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_download_missing_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/reports/download/gone.pdf"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "Report not found"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client_for(&server)
            .download_report("gone.pdf", dir.path())
            .await
            .unwrap_err();
        assert_eq!(err.friendly_message(), "Report not found");
        assert!(!dir.path().join("gone.pdf").exists());
    }

    #[tokio::test]
    async fn test_generate_report_body() {
        let server = MockServer::start().await;
        let request = ReportRequest {
            start_time: "2025-01-14T10:00".into(),
            end_time: "2025-01-15T10:00".into(),
            ..ReportRequest::last_day(chrono::Local::now())
        };
        Mock::given(method("POST"))
            .and(path("/api/generate-report"))
            .and(body_json(json!({
                "report_type": "summary",
                "start_time": "2025-01-14T10:00",
                "end_time": "2025-01-15T10:00",
                "format": "pdf"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "filename": "summary_20250115.pdf"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let filename = client_for(&server).generate_report(&request).await.unwrap();
        assert_eq!(filename.as_deref(), Some("summary_20250115.pdf"));
    }

    #[tokio::test]
    async fn test_report_list_created_alias() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-reports"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "reports": [
                    {"filename": "a.pdf", "size": 1024, "created_at": "2025-01-15T10:00:00"}
                ]
            })))
            .mount(&server)
            .await;

        let reports = client_for(&server).reports().await.unwrap();
        assert_eq!(reports[0].created.as_deref(), Some("2025-01-15T10:00:00"));
    }
}

#[cfg(test)]
mod auth {
    use super::*;

    #[tokio::test]
    async fn test_login_mfa_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(body_json(json!({"username": "analyst", "password": "hunter2"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "mfa_required": true})),
            )
            .mount(&server)
            .await;

        let outcome = client_for(&server).login("analyst", "hunter2").await.unwrap();
        assert_eq!(outcome, LoginOutcome::MfaRequired);
    }

    #[tokio::test]
    async fn test_login_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).login("analyst", "wrong").await.unwrap_err();
        assert_eq!(err.friendly_message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_short_mfa_code_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify-mfa-ajax"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true})),
            )
            .expect(0)
            .mount(&server)
            .await;

        assert!(client_for(&server).verify_mfa("12345").await.is_err());
    }
}

#[cfg(test)]
mod network {
    use super::*;

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) is almost never listening.
        let url = Url::parse("http://127.0.0.1:9").unwrap();
        let client = ApiClient::new(url, Duration::from_secs(2)).unwrap();
        let err = client.stats().await.unwrap_err();
        assert!(err.is_network_error(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/get-stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let client = ApiClient::new(url, Duration::from_millis(200)).unwrap();
        let err = client.stats().await.unwrap_err();
        assert!(
            matches!(err, ApiError::Timeout(_, _)),
            "unexpected error: {err:?}"
        );
    }
}
