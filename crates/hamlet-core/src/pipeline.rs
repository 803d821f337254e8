//! The contract shared by the current growth pipeline and the legacy
//! production pipeline.

use std::future::Future;

use chrono::{DateTime, Utc};
use hamlet_types::{CycleSummary, SettlementId};

use crate::modifiers::ModifierError;
use crate::store::StoreError;

/// What a pipeline run reports when it did not fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineReport {
    /// The cycle ran and its writes were committed.
    Completed(CycleSummary),
    /// The pipeline chose not to run; nothing was written.
    Declined {
        /// Why.
        message: String,
    },
}

/// A pipeline run that failed. Nothing it staged was committed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineFault {
    /// The settlement does not exist.
    #[error("Settlement {0} not found")]
    SettlementNotFound(SettlementId),

    /// Storage failed.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    /// Seasonal modifiers could not be resolved.
    #[error("modifier resolution failed: {0}")]
    Modifiers(#[from] ModifierError),

    /// The pipeline panicked.
    #[error("pipeline panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },
}

/// One settlement cycle, end to end, in its own unit of work.
pub trait SettlementPipeline: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Run one cycle for a settlement, stamping work with `cycle_at`.
    fn run(
        &self,
        settlement_id: SettlementId,
        cycle_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<PipelineReport, PipelineFault>> + Send;
}
