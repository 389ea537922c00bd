//! Data layer for the Vigil TUI.
//!
//! [`DataManager`] owns the tokio runtime that hosts the live alert stream
//! and every REST request. The UI thread hands it [`Request`]s and drains the
//! results as [`DataEvent`]s once per frame; nothing here touches view state.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};
use vigil_api::{
    AlertFilter, ApiClient, Comparison, LoginOutcome, ReportEntry, ReportRequest, RuleEntry,
    RuleList, StatsSummary, TimelinePoint, TimelineRange,
};
use vigil_config::ConsoleConfig;
use vigil_core::AlertRecord;
use vigil_stream::{ConnectionManager, StreamEvent, StreamHandle};

type ApiResult<T> = vigil_api::Result<T>;

/// Work the UI asks the data layer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// `animate` counts the counters up instead of setting them
    Stats { animate: bool },
    Timeline(TimelineRange),
    RecentAlerts,
    Alerts(AlertFilter),
    Rules { category: Option<String> },
    RuleSearch(String),
    DeleteRule(u64),
    Reports,
    GenerateReport(ReportRequest),
    DownloadReport(String),
    DeleteReport(String),
    Comparison,
    BlockIp(String),
    UnblockIp(String),
    Login { username: String, password: String },
    VerifyMfa(String),
}

impl Request {
    fn label(&self) -> &'static str {
        match self {
            Request::Stats { .. } => "stats",
            Request::Timeline(_) => "timeline",
            Request::RecentAlerts => "recent_alerts",
            Request::Alerts(_) => "alerts",
            Request::Rules { .. } => "rules",
            Request::RuleSearch(_) => "rule_search",
            Request::DeleteRule(_) => "delete_rule",
            Request::Reports => "reports",
            Request::GenerateReport(_) => "generate_report",
            Request::DownloadReport(_) => "download_report",
            Request::DeleteReport(_) => "delete_report",
            Request::Comparison => "comparison",
            Request::BlockIp(_) => "block_ip",
            Request::UnblockIp(_) => "unblock_ip",
            Request::Login { .. } => "login",
            Request::VerifyMfa(_) => "verify_mfa",
        }
    }
}

/// Results delivered back to the UI thread.
#[derive(Debug)]
pub enum DataEvent {
    Stream(StreamEvent),
    Stats {
        animate: bool,
        result: ApiResult<StatsSummary>,
    },
    Timeline {
        range: TimelineRange,
        result: ApiResult<Vec<TimelinePoint>>,
    },
    RecentAlerts(ApiResult<Vec<AlertRecord>>),
    Alerts {
        filter: AlertFilter,
        result: ApiResult<Vec<AlertRecord>>,
    },
    Rules {
        category: Option<String>,
        result: ApiResult<RuleList>,
    },
    RuleSearch {
        query: String,
        result: ApiResult<Vec<RuleEntry>>,
    },
    RuleDeleted {
        sid: u64,
        result: ApiResult<()>,
    },
    Reports(ApiResult<Vec<ReportEntry>>),
    /// Filename of the new report, when the backend reports one
    ReportGenerated(ApiResult<Option<String>>),
    ReportDownloaded {
        filename: String,
        result: ApiResult<PathBuf>,
    },
    ReportDeleted {
        filename: String,
        result: ApiResult<()>,
    },
    Comparison(ApiResult<Comparison>),
    IpBlocked {
        ip: String,
        result: ApiResult<()>,
    },
    IpUnblocked {
        ip: String,
        result: ApiResult<()>,
    },
    Login(ApiResult<LoginOutcome>),
    MfaVerified(ApiResult<()>),
}

/// Runs the stream and REST requests off the UI thread.
pub struct DataManager {
    /// `None` in offline mode
    runtime: Option<Runtime>,
    client: Option<Arc<ApiClient>>,
    events_tx: UnboundedSender<DataEvent>,
    events_rx: UnboundedReceiver<DataEvent>,
    stream_rx: Option<UnboundedReceiver<StreamEvent>>,
    stream: Option<StreamHandle>,
    stream_url: Option<String>,
    stats_interval: Duration,
    last_stats_poll: Instant,
    /// Periodic stats refresh; off until the user is signed in
    polling: bool,
    download_dir: PathBuf,
    /// Error message if the runtime, client or stream failed to start
    init_error: Option<String>,
    /// Requests that had nowhere to go (offline mode)
    unsent: Vec<Request>,
}

impl DataManager {
    /// Start the runtime, the REST client and the alert stream.
    ///
    /// Failures are kept in [`DataManager::init_error`] rather than returned
    /// so the console can still come up and show what went wrong.
    pub fn new(config: &ConsoleConfig) -> Self {
        let start = Instant::now();
        let mut manager =
            Self::offline(config.stats_refresh_interval(), config.download_dir.clone());

        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("vigil-data")
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                manager.init_error = Some(format!("Failed to start runtime: {}", e));
                return manager;
            }
        };

        match ApiClient::from_config(config) {
            Ok(client) => manager.client = Some(Arc::new(client)),
            Err(e) => manager.init_error = Some(format!("Failed to create API client: {}", e)),
        }

        match config.stream_url() {
            Ok(url) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let connection =
                    ConnectionManager::websocket(url.clone(), config.reconnect_delay(), tx);
                manager.stream = Some(connection.spawn(runtime.handle()));
                manager.stream_rx = Some(rx);
                manager.stream_url = Some(url);
            }
            Err(e) => {
                manager.init_error.get_or_insert(format!("Invalid stream endpoint: {}", e));
            }
        }

        manager.runtime = Some(runtime);
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            stream_url = manager.stream_url.as_deref().unwrap_or("-"),
            "DataManager started"
        );
        manager
    }

    /// A manager with no runtime. Requests are recorded instead of sent and
    /// no stream is opened.
    pub fn offline(stats_interval: Duration, download_dir: PathBuf) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            runtime: None,
            client: None,
            events_tx,
            events_rx,
            stream_rx: None,
            stream: None,
            stream_url: None,
            stats_interval,
            last_stats_poll: Instant::now(),
            polling: true,
            download_dir,
            init_error: None,
            unsent: Vec::new(),
        }
    }

    /// Issue a request. The result arrives later through [`DataManager::poll`].
    pub fn request(&mut self, request: Request) {
        let (Some(runtime), Some(client)) = (&self.runtime, &self.client) else {
            debug!(request = request.label(), "no backend, request recorded");
            self.unsent.push(request);
            return;
        };

        debug!(request = request.label(), "request issued");
        let client = Arc::clone(client);
        let tx = self.events_tx.clone();
        let download_dir = self.download_dir.clone();
        runtime.spawn(async move {
            let event = execute(&client, request, &download_dir).await;
            if tx.send(event).is_err() {
                debug!("data manager gone, dropping response");
            }
        });
    }

    /// Drain finished work and kick the periodic stats refresh.
    ///
    /// Stream events come first so live alerts are applied before any REST
    /// response that raced them.
    pub fn poll(&mut self, now: Instant) -> Vec<DataEvent> {
        let mut events = Vec::new();

        if let Some(rx) = self.stream_rx.as_mut() {
            while let Ok(event) = rx.try_recv() {
                events.push(DataEvent::Stream(event));
            }
        }
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }

        if self.polling
            && now.saturating_duration_since(self.last_stats_poll) >= self.stats_interval
        {
            self.last_stats_poll = now;
            self.request(Request::Stats { animate: true });
        }

        events
    }

    /// Turn the periodic stats refresh on or off. The next refresh is one
    /// full interval after it is turned on.
    pub fn set_polling(&mut self, on: bool) {
        if on && !self.polling {
            self.last_stats_poll = Instant::now();
        }
        self.polling = on;
    }

    /// Queue an event as if it had come back from the backend.
    pub fn inject(&self, event: DataEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Requests recorded while offline, oldest first.
    pub fn take_unsent(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.unsent)
    }

    pub fn init_error(&self) -> Option<&str> {
        self.init_error.as_deref()
    }

    pub fn stream_url(&self) -> Option<&str> {
        self.stream_url.as_deref()
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Stop the stream and the runtime without waiting for in-flight requests.
    pub fn shutdown(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.shutdown();
        }
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            info!("DataManager stopped");
        }
    }
}

impl Drop for DataManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn execute(client: &ApiClient, request: Request, download_dir: &Path) -> DataEvent {
    let event = match request {
        Request::Stats { animate } => DataEvent::Stats {
            animate,
            result: client.stats().await,
        },
        Request::Timeline(range) => DataEvent::Timeline {
            range,
            result: client.timeline(range.hours()).await,
        },
        Request::RecentAlerts => DataEvent::RecentAlerts(client.recent_alerts().await),
        Request::Alerts(filter) => DataEvent::Alerts {
            filter,
            result: client.alerts(filter).await,
        },
        Request::Rules { category } => {
            let result = client.rules(category.as_deref()).await;
            DataEvent::Rules { category, result }
        }
        Request::RuleSearch(query) => {
            let result = client.search_rules(&query).await;
            DataEvent::RuleSearch { query, result }
        }
        Request::DeleteRule(sid) => DataEvent::RuleDeleted {
            sid,
            result: client.delete_rule(sid).await,
        },
        Request::Reports => DataEvent::Reports(client.reports().await),
        Request::GenerateReport(body) => {
            DataEvent::ReportGenerated(client.generate_report(&body).await)
        }
        Request::DownloadReport(filename) => {
            let result = client.download_report(&filename, download_dir).await;
            DataEvent::ReportDownloaded { filename, result }
        }
        Request::DeleteReport(filename) => {
            let result = client.delete_report(&filename).await;
            DataEvent::ReportDeleted { filename, result }
        }
        Request::Comparison => DataEvent::Comparison(client.comparison().await),
        Request::BlockIp(ip) => {
            let result = client.block_ip(&ip).await;
            DataEvent::IpBlocked { ip, result }
        }
        Request::UnblockIp(ip) => {
            let result = client.unblock_ip(&ip).await;
            DataEvent::IpUnblocked { ip, result }
        }
        Request::Login { username, password } => {
            DataEvent::Login(client.login(&username, &password).await)
        }
        Request::VerifyMfa(code) => DataEvent::MfaVerified(client.verify_mfa(&code).await),
    };

    if let Some(err) = event_error(&event) {
        warn!(error = %err, "request failed");
    }
    event
}

fn event_error(event: &DataEvent) -> Option<&vigil_api::ApiError> {
    match event {
        DataEvent::Stream(_) => None,
        DataEvent::Stats { result, .. } => result.as_ref().err(),
        DataEvent::Timeline { result, .. } => result.as_ref().err(),
        DataEvent::RecentAlerts(result) => result.as_ref().err(),
        DataEvent::Alerts { result, .. } => result.as_ref().err(),
        DataEvent::Rules { result, .. } => result.as_ref().err(),
        DataEvent::RuleSearch { result, .. } => result.as_ref().err(),
        DataEvent::RuleDeleted { result, .. } => result.as_ref().err(),
        DataEvent::Reports(result) => result.as_ref().err(),
        DataEvent::ReportGenerated(result) => result.as_ref().err(),
        DataEvent::ReportDownloaded { result, .. } => result.as_ref().err(),
        DataEvent::ReportDeleted { result, .. } => result.as_ref().err(),
        DataEvent::Comparison(result) => result.as_ref().err(),
        DataEvent::IpBlocked { result, .. } => result.as_ref().err(),
        DataEvent::IpUnblocked { result, .. } => result.as_ref().err(),
        DataEvent::Login(result) => result.as_ref().err(),
        DataEvent::MfaVerified(result) => result.as_ref().err(),
    }
}
