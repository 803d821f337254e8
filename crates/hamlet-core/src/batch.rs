//! Batch coordination: run the dual-path cycle for every settlement of a
//! world (or of all worlds) with bounded concurrency.
//!
//! Each settlement runs in its own unit of work. One settlement failing is
//! recorded in the [`BatchReport`] and never stops the others.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use hamlet_types::{
    BatchReport, SettlementFailure, SettlementId, TaskOutcome, TaskPayload, WorldId,
};
use tracing::{info, warn};

use crate::dual_path::DualPathOrchestrator;
use crate::pipeline::SettlementPipeline;
use crate::store::{SettlementStore, StoreError, StoreSession};

/// Runs a dual-path cycle across many settlements.
#[derive(Debug)]
pub struct BatchCoordinator<'a, S, C, L> {
    store: &'a S,
    orchestrator: &'a DualPathOrchestrator<C, L>,
    max_concurrency: usize,
}

impl<'a, S, C, L> BatchCoordinator<'a, S, C, L>
where
    S: SettlementStore,
    C: SettlementPipeline,
    L: SettlementPipeline,
{
    /// Build a coordinator. A concurrency of zero is treated as one.
    pub fn new(
        store: &'a S,
        orchestrator: &'a DualPathOrchestrator<C, L>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            store,
            orchestrator,
            max_concurrency: max_concurrency.max(1),
        }
    }

    async fn list(&self, world: Option<WorldId>) -> Result<Vec<SettlementId>, StoreError> {
        let mut session = self.store.open_session().await?;
        let settlements = session.settlements(world).await?;
        Ok(settlements.into_iter().map(|s| s.id).collect())
    }

    /// Run one cycle for every settlement in scope.
    ///
    /// The outcome is an error only when the settlement list itself cannot
    /// be loaded. Otherwise it succeeds with a [`BatchReport`] whose
    /// `processed` counts settlements whose cycle succeeded.
    pub async fn run(&self, world: Option<WorldId>, cycle_at: DateTime<Utc>) -> TaskOutcome {
        let ids = match self.list(world).await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to list settlements for batch");
                return TaskOutcome::error(None, format!("failed to list settlements: {e}"));
            }
        };

        info!(
            world_id = ?world,
            settlements = ids.len(),
            max_concurrency = self.max_concurrency,
            "Starting settlement batch"
        );

        let outcomes: Vec<(SettlementId, TaskOutcome)> = stream::iter(ids)
            .map(|id| async move { (id, self.orchestrator.run(id, cycle_at).await) })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let report = tally(world, outcomes);
        info!(
            total = report.total,
            processed = report.processed,
            failed = report.failures.len(),
            "Settlement batch complete"
        );
        TaskOutcome::success(None, TaskPayload::Batch(report))
    }
}

/// Fold per-settlement outcomes into a report, preserving listing order.
pub fn tally(
    world: Option<WorldId>,
    outcomes: impl IntoIterator<Item = (SettlementId, TaskOutcome)>,
) -> BatchReport {
    let mut report = BatchReport {
        world_id: world,
        ..BatchReport::default()
    };
    for (settlement_id, outcome) in outcomes {
        report.total = report.total.saturating_add(1);
        if outcome.is_success() {
            report.processed = report.processed.saturating_add(1);
        } else {
            let message = outcome.error.unwrap_or_else(|| "unknown error".to_owned());
            warn!(settlement_id = %settlement_id, error = message.as_str(), "Settlement failed in batch");
            report.failures.push(SettlementFailure {
                settlement_id,
                message,
            });
        }
    }
    report
}
