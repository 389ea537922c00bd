//! Surfaces and the registry that owns them.
//!
//! A surface is a mounted region of the screen that can take an alert
//! incrementally: an alert table, a counter or the severity chart. Pages
//! mount their surfaces when their data first arrives; the live stream then
//! updates whatever is mounted, looked up by [`SurfaceId`] on every event.
//!
//! The registry lives on the UI thread and is the only place surface state is
//! kept.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use thiserror::Error;
use vigil_core::{AlertRecord, SeverityBucket};

/// How long counters and the chart take to count up to a refreshed value.
pub const COUNT_UP_DURATION: Duration = Duration::from_millis(500);

/// Stable names for every surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceId {
    /// Recent alerts table on the overview
    RecentAlerts,
    /// Full alert list on the alerts view
    AlertsList,
    TotalAlerts,
    CriticalThreats,
    BlockedAttacks,
    ActiveRules,
    RulesTotal,
    RulesAi,
    RulesDrop,
    SeverityChart,
}

impl SurfaceId {
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceId::RecentAlerts => "recent_alerts",
            SurfaceId::AlertsList => "alerts_list",
            SurfaceId::TotalAlerts => "total_alerts",
            SurfaceId::CriticalThreats => "critical_threats",
            SurfaceId::BlockedAttacks => "blocked_attacks",
            SurfaceId::ActiveRules => "active_rules",
            SurfaceId::RulesTotal => "rules_total",
            SurfaceId::RulesAi => "rules_ai",
            SurfaceId::RulesDrop => "rules_drop",
            SurfaceId::SeverityChart => "severity_chart",
        }
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a mounted surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    AlertTable,
    Counter,
    SeverityChart,
}

/// Errors from updating a single surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("surface {id} is a {found:?}, expected {expected:?}")]
    KindMismatch {
        id: SurfaceId,
        expected: SurfaceKind,
        found: SurfaceKind,
    },

    #[error("surface {id} would overflow")]
    Overflow { id: SurfaceId },
}

/// Rows of alerts, newest first.
#[derive(Debug, Clone, Default)]
pub struct AlertTable {
    rows: Vec<AlertRecord>,
    /// Shown instead of rows when the last load returned nothing
    placeholder: Option<String>,
    selected: usize,
}

impl AlertTable {
    /// Table holding a freshly loaded list. An empty list shows `empty_message`.
    pub fn loaded(rows: Vec<AlertRecord>, empty_message: &str) -> Self {
        let placeholder = rows.is_empty().then(|| empty_message.to_string());
        Self {
            rows,
            placeholder,
            selected: 0,
        }
    }

    /// Insert a row at the top, clearing the placeholder first.
    ///
    /// The selection stays on the row it was on.
    pub fn prepend(&mut self, record: AlertRecord) {
        self.placeholder = None;
        if !self.rows.is_empty() {
            self.selected += 1;
        }
        self.rows.insert(0, record);
    }

    pub fn rows(&self) -> &[AlertRecord] {
        &self.rows
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&AlertRecord> {
        self.rows.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

/// A counter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterValue {
    Value(u64),
    /// The last load failed
    Error,
}

/// Result of incrementing a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterUpdate {
    Incremented(u64),
    /// The counter shows the error placeholder and was left alone
    SkippedError,
}

#[derive(Debug, Clone, Copy)]
struct CountUp {
    from: u64,
    started: Instant,
}

/// A numeric stat card.
#[derive(Debug, Clone)]
pub struct Counter {
    value: CounterValue,
    count_up: Option<CountUp>,
}

impl Counter {
    pub fn new(value: u64) -> Self {
        Self {
            value: CounterValue::Value(value),
            count_up: None,
        }
    }

    pub fn error() -> Self {
        Self {
            value: CounterValue::Error,
            count_up: None,
        }
    }

    pub fn value(&self) -> CounterValue {
        self.value
    }

    /// Set a new value immediately.
    pub fn set(&mut self, value: CounterValue) {
        self.value = value;
        self.count_up = None;
    }

    /// Move to `target`, counting up from the value currently displayed.
    pub fn animate_to(&mut self, target: u64, now: Instant) {
        let from = match self.display_value(now) {
            CounterValue::Value(v) => v,
            CounterValue::Error => 0,
        };
        self.value = CounterValue::Value(target);
        self.count_up = (from != target).then_some(CountUp { from, started: now });
    }

    /// Add one. A counter in the error state is skipped.
    pub fn increment(&mut self, id: SurfaceId) -> Result<CounterUpdate, SurfaceError> {
        match self.value {
            CounterValue::Error => Ok(CounterUpdate::SkippedError),
            CounterValue::Value(v) => {
                let next = v.checked_add(1).ok_or(SurfaceError::Overflow { id })?;
                self.value = CounterValue::Value(next);
                Ok(CounterUpdate::Incremented(next))
            }
        }
    }

    /// What to draw at `now`, mid-animation if one is running.
    pub fn display_value(&self, now: Instant) -> CounterValue {
        match (self.value, self.count_up) {
            (CounterValue::Value(target), Some(anim)) => {
                CounterValue::Value(interpolate(anim.from, target, anim.started, now))
            }
            (value, _) => value,
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.count_up
            .is_some_and(|a| now.saturating_duration_since(a.started) < COUNT_UP_DURATION)
    }

    /// Display text, thousands-separated, or `Error`.
    pub fn display_text(&self, now: Instant) -> String {
        match self.display_value(now) {
            CounterValue::Value(v) => format_thousands(v),
            CounterValue::Error => "Error".to_string(),
        }
    }
}

/// Four data points, one per severity bucket.
#[derive(Debug, Clone)]
pub struct SeverityChart {
    points: [u64; 4],
    tween: Option<([u64; 4], Instant)>,
}

impl SeverityChart {
    pub fn new(points: [u64; 4]) -> Self {
        Self {
            points,
            tween: None,
        }
    }

    /// Chart that counts up from `from` to `points`.
    pub fn animated(from: [u64; 4], points: [u64; 4], now: Instant) -> Self {
        Self {
            points,
            tween: (from != points).then_some((from, now)),
        }
    }

    pub fn points(&self) -> [u64; 4] {
        self.points
    }

    /// Add one to `bucket` and redraw at once, cancelling any count-up.
    pub fn increment(&mut self, bucket: SeverityBucket) -> Result<u64, SurfaceError> {
        let slot = &mut self.points[bucket.index()];
        *slot = slot.checked_add(1).ok_or(SurfaceError::Overflow {
            id: SurfaceId::SeverityChart,
        })?;
        self.tween = None;
        Ok(*slot)
    }

    pub fn display_points(&self, now: Instant) -> [u64; 4] {
        match self.tween {
            Some((from, started)) => {
                let mut out = [0; 4];
                for i in 0..4 {
                    out[i] = interpolate(from[i], self.points[i], started, now);
                }
                out
            }
            None => self.points,
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.tween
            .is_some_and(|(_, started)| now.saturating_duration_since(started) < COUNT_UP_DURATION)
    }
}

fn interpolate(from: u64, to: u64, started: Instant, now: Instant) -> u64 {
    let elapsed = now.saturating_duration_since(started);
    if elapsed >= COUNT_UP_DURATION {
        return to;
    }
    let progress = elapsed.as_secs_f64() / COUNT_UP_DURATION.as_secs_f64();
    let value = from as f64 + (to as f64 - from as f64) * progress;
    value.round().max(0.0) as u64
}

/// `1234567` → `1,234,567`
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Any mounted surface.
#[derive(Debug, Clone)]
pub enum Surface {
    AlertTable(AlertTable),
    Counter(Counter),
    SeverityChart(SeverityChart),
}

impl Surface {
    pub fn kind(&self) -> SurfaceKind {
        match self {
            Surface::AlertTable(_) => SurfaceKind::AlertTable,
            Surface::Counter(_) => SurfaceKind::Counter,
            Surface::SeverityChart(_) => SurfaceKind::SeverityChart,
        }
    }
}

/// Mounted surfaces by id.
#[derive(Debug, Default)]
pub struct SurfaceRegistry {
    surfaces: HashMap<SurfaceId, Surface>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `surface` under `id`, replacing whatever was there.
    pub fn mount(&mut self, id: SurfaceId, surface: Surface) {
        tracing::debug!(surface = %id, kind = ?surface.kind(), "mounted");
        self.surfaces.insert(id, surface);
    }

    pub fn unmount(&mut self, id: SurfaceId) -> Option<Surface> {
        self.surfaces.remove(&id)
    }

    pub fn is_mounted(&self, id: SurfaceId) -> bool {
        self.surfaces.contains_key(&id)
    }

    pub fn get(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(&id)
    }

    /// Mounted table under `id`. `Ok(None)` when nothing is mounted.
    pub fn table_mut(&mut self, id: SurfaceId) -> Result<Option<&mut AlertTable>, SurfaceError> {
        match self.surfaces.get_mut(&id) {
            None => Ok(None),
            Some(Surface::AlertTable(table)) => Ok(Some(table)),
            Some(other) => Err(mismatch(id, SurfaceKind::AlertTable, other)),
        }
    }

    /// Mounted counter under `id`. `Ok(None)` when nothing is mounted.
    pub fn counter_mut(&mut self, id: SurfaceId) -> Result<Option<&mut Counter>, SurfaceError> {
        match self.surfaces.get_mut(&id) {
            None => Ok(None),
            Some(Surface::Counter(counter)) => Ok(Some(counter)),
            Some(other) => Err(mismatch(id, SurfaceKind::Counter, other)),
        }
    }

    /// Mounted chart under `id`. `Ok(None)` when nothing is mounted.
    pub fn chart_mut(&mut self, id: SurfaceId) -> Result<Option<&mut SeverityChart>, SurfaceError> {
        match self.surfaces.get_mut(&id) {
            None => Ok(None),
            Some(Surface::SeverityChart(chart)) => Ok(Some(chart)),
            Some(other) => Err(mismatch(id, SurfaceKind::SeverityChart, other)),
        }
    }

    /// Table for rendering; `None` if unmounted or not a table.
    pub fn table(&self, id: SurfaceId) -> Option<&AlertTable> {
        match self.surfaces.get(&id) {
            Some(Surface::AlertTable(table)) => Some(table),
            _ => None,
        }
    }

    /// Counter for rendering; `None` if unmounted or not a counter.
    pub fn counter(&self, id: SurfaceId) -> Option<&Counter> {
        match self.surfaces.get(&id) {
            Some(Surface::Counter(counter)) => Some(counter),
            _ => None,
        }
    }

    /// Chart for rendering; `None` if unmounted or not a chart.
    pub fn chart(&self, id: SurfaceId) -> Option<&SeverityChart> {
        match self.surfaces.get(&id) {
            Some(Surface::SeverityChart(chart)) => Some(chart),
            _ => None,
        }
    }

    /// Whether any counter or the chart is mid count-up.
    pub fn is_animating(&self, now: Instant) -> bool {
        self.surfaces.values().any(|s| match s {
            Surface::Counter(c) => c.is_animating(now),
            Surface::SeverityChart(c) => c.is_animating(now),
            Surface::AlertTable(_) => false,
        })
    }
}

fn mismatch(id: SurfaceId, expected: SurfaceKind, found: &Surface) -> SurfaceError {
    SurfaceError::KindMismatch {
        id,
        expected,
        found: found.kind(),
    }
}
