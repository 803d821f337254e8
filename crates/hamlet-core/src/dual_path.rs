//! Dual-path orchestration: try the current pipeline, fall back to the
//! legacy one.
//!
//! Each attempt is reduced to a [`Route`] before anything else happens, so
//! the fallback decision is a pure function ([`route_current`],
//! [`route_legacy`]) that tests can drive without staging real faults.
//! A panicking pipeline is caught and routed like any other fault; nothing
//! escapes [`DualPathOrchestrator::run`] except a [`TaskOutcome`].

use std::any::Any;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use hamlet_types::{CycleSummary, SettlementId, TaskOutcome, TaskPayload};
use tracing::{error, info, warn};

use crate::pipeline::{PipelineFault, PipelineReport, SettlementPipeline};

/// Where an attempt leaves the task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The attempt completed; report its summary.
    Done(CycleSummary),
    /// Hand the settlement to the legacy pipeline.
    Fallback {
        /// Why the current pipeline gave up.
        reason: String,
    },
    /// Give up; report an error.
    Failed {
        /// The error message for the outcome.
        message: String,
    },
}

impl Route {
    /// Normalize into the task contract.
    pub fn into_outcome(self, settlement_id: SettlementId) -> TaskOutcome {
        match self {
            Self::Done(summary) => {
                TaskOutcome::success(Some(settlement_id), TaskPayload::Cycle(summary))
            }
            Self::Fallback { reason } | Self::Failed { message: reason } => {
                TaskOutcome::error(Some(settlement_id), reason)
            }
        }
    }
}

/// Route the current pipeline's result: anything but completion falls back.
pub fn route_current(result: Result<PipelineReport, PipelineFault>) -> Route {
    match result {
        Ok(PipelineReport::Completed(summary)) => Route::Done(summary),
        Ok(PipelineReport::Declined { message }) => Route::Fallback { reason: message },
        Err(fault) => Route::Fallback {
            reason: fault.to_string(),
        },
    }
}

/// Route the legacy pipeline's result: it is the last resort.
pub fn route_legacy(result: Result<PipelineReport, PipelineFault>) -> Route {
    match result {
        Ok(PipelineReport::Completed(summary)) => Route::Done(summary),
        Ok(PipelineReport::Declined { message }) => Route::Failed { message },
        Err(fault) => Route::Failed {
            message: fault.to_string(),
        },
    }
}

/// Run one pipeline, turning a panic into [`PipelineFault::Panicked`].
async fn guarded<P: SettlementPipeline>(
    pipeline: &P,
    settlement_id: SettlementId,
    cycle_at: DateTime<Utc>,
) -> Result<PipelineReport, PipelineFault> {
    AssertUnwindSafe(pipeline.run(settlement_id, cycle_at))
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| {
            Err(PipelineFault::Panicked {
                message: panic_message(payload.as_ref()),
            })
        })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}

/// Current pipeline first, legacy pipeline on decline or fault.
#[derive(Debug, Clone)]
pub struct DualPathOrchestrator<C, L> {
    current: C,
    legacy: L,
}

impl<C, L> DualPathOrchestrator<C, L> {
    /// Pair the two pipelines.
    pub const fn new(current: C, legacy: L) -> Self {
        Self { current, legacy }
    }

    /// The current and legacy pipelines.
    pub const fn pipelines(&self) -> (&C, &L) {
        (&self.current, &self.legacy)
    }
}

impl<C, L> DualPathOrchestrator<C, L>
where
    C: SettlementPipeline,
    L: SettlementPipeline,
{
    /// Run one settlement cycle. Never panics, never returns an error.
    pub async fn run(&self, settlement_id: SettlementId, cycle_at: DateTime<Utc>) -> TaskOutcome {
        let first = route_current(guarded(&self.current, settlement_id, cycle_at).await);

        let route = match first {
            Route::Fallback { reason } => {
                warn!(
                    settlement_id = %settlement_id,
                    pipeline = self.current.name(),
                    reason = reason.as_str(),
                    "Falling back to legacy pipeline"
                );
                route_legacy(guarded(&self.legacy, settlement_id, cycle_at).await)
            }
            other => other,
        };

        match &route {
            Route::Done(summary) => info!(
                settlement_id = %settlement_id,
                season = summary.season.as_str(),
                total_produced = summary.total_produced(),
                "Settlement cycle complete"
            ),
            Route::Failed { message } | Route::Fallback { reason: message } => error!(
                settlement_id = %settlement_id,
                error = message.as_str(),
                "Settlement cycle failed"
            ),
        }
        route.into_outcome(settlement_id)
    }
}
