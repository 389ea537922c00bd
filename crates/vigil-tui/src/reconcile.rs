//! Applies one live alert to every mounted surface.
//!
//! Steps run in a fixed order and are isolated from each other: a step whose
//! surface is missing is skipped, a step that fails is logged and the next
//! step still runs.

use std::fmt;

use vigil_core::AlertRecord;

use crate::surface::{CounterUpdate, SurfaceError, SurfaceId, SurfaceRegistry};

/// One reconcile step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PrependRecent,
    PrependAlertsList,
    IncrementTotal,
    IncrementCritical,
    BumpSeverityChart,
}

impl Step {
    pub const ORDER: [Step; 5] = [
        Step::PrependRecent,
        Step::PrependAlertsList,
        Step::IncrementTotal,
        Step::IncrementCritical,
        Step::BumpSeverityChart,
    ];

    pub fn surface(&self) -> SurfaceId {
        match self {
            Step::PrependRecent => SurfaceId::RecentAlerts,
            Step::PrependAlertsList => SurfaceId::AlertsList,
            Step::IncrementTotal => SurfaceId::TotalAlerts,
            Step::IncrementCritical => SurfaceId::CriticalThreats,
            Step::BumpSeverityChart => SurfaceId::SeverityChart,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::PrependRecent => "prepend_recent",
            Step::PrependAlertsList => "prepend_alerts_list",
            Step::IncrementTotal => "increment_total",
            Step::IncrementCritical => "increment_critical",
            Step::BumpSeverityChart => "bump_severity_chart",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotMounted,
    /// Counter shows the `Error` placeholder
    ErrorPlaceholder,
    NotCritical,
    /// Alert severity maps to no bucket
    NoBucket,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Applied,
    Skipped(SkipReason),
    Failed(SurfaceError),
}

/// What happened to each step for one alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub steps: Vec<(Step, StepOutcome)>,
}

impl ReconcileReport {
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps.iter().find(|(s, _)| *s == step).map(|(_, o)| o)
    }

    pub fn applied(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, o)| *o == StepOutcome::Applied)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.steps
            .iter()
            .filter(|(_, o)| matches!(o, StepOutcome::Failed(_)))
            .count()
    }
}

/// Apply `alert` to every mounted surface.
pub fn reconcile(registry: &mut SurfaceRegistry, alert: &AlertRecord) -> ReconcileReport {
    let mut steps = Vec::with_capacity(Step::ORDER.len());

    for step in Step::ORDER {
        let outcome = match run_step(registry, step, alert) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(
                    step = step.name(),
                    surface = step.surface().name(),
                    error = %e,
                    "surface update failed"
                );
                StepOutcome::Failed(e)
            }
        };
        steps.push((step, outcome));
    }

    let report = ReconcileReport { steps };
    tracing::debug!(
        applied = report.applied(),
        failed = report.failed(),
        severity = ?alert.severity,
        "alert reconciled"
    );
    report
}

fn run_step(
    registry: &mut SurfaceRegistry,
    step: Step,
    alert: &AlertRecord,
) -> Result<StepOutcome, SurfaceError> {
    let id = step.surface();
    match step {
        Step::PrependRecent | Step::PrependAlertsList => match registry.table_mut(id)? {
            Some(table) => {
                table.prepend(alert.clone());
                Ok(StepOutcome::Applied)
            }
            None => Ok(StepOutcome::Skipped(SkipReason::NotMounted)),
        },
        Step::IncrementTotal => increment_counter(registry, id),
        Step::IncrementCritical => {
            if !alert.is_critical() {
                return Ok(StepOutcome::Skipped(SkipReason::NotCritical));
            }
            increment_counter(registry, id)
        }
        Step::BumpSeverityChart => {
            let Some(chart) = registry.chart_mut(id)? else {
                return Ok(StepOutcome::Skipped(SkipReason::NotMounted));
            };
            let Some(bucket) = alert.bucket() else {
                return Ok(StepOutcome::Skipped(SkipReason::NoBucket));
            };
            chart.increment(bucket)?;
            Ok(StepOutcome::Applied)
        }
    }
}

fn increment_counter(
    registry: &mut SurfaceRegistry,
    id: SurfaceId,
) -> Result<StepOutcome, SurfaceError> {
    let Some(counter) = registry.counter_mut(id)? else {
        return Ok(StepOutcome::Skipped(SkipReason::NotMounted));
    };
    match counter.increment(id)? {
        CounterUpdate::Incremented(_) => Ok(StepOutcome::Applied),
        CounterUpdate::SkippedError => Ok(StepOutcome::Skipped(SkipReason::ErrorPlaceholder)),
    }
}
