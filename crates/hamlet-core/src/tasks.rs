//! Task entry points. Everything a scheduler or an operator can ask the
//! engine to do goes through [`TaskRunner`], and every call returns a
//! [`TaskOutcome`].

use chrono::{DateTime, Utc};
use hamlet_production::ResourceTypeMap;
use hamlet_types::{BuildingId, LocationId, SettlementId, TaskOutcome, WorldId};
use tracing::info;

use crate::batch::BatchCoordinator;
use crate::config::{ConfigError, GrowthConfig, HamletConfig};
use crate::dual_path::{DualPathOrchestrator, panic_message};
use crate::growth::CurrentGrowthPipeline;
use crate::lifecycle::{LifecycleService, LifecycleTasks, StoreLifecycleService};
use crate::modifiers::ModifierResolver;
use crate::production::LegacyPipeline;
use crate::store::SettlementStore;

/// The dual-path orchestrator wired with the two built-in pipelines.
pub type SettlementOrchestrator<S, M> =
    DualPathOrchestrator<CurrentGrowthPipeline<S, M>, LegacyPipeline<S, M>>;

/// Facade over the orchestrator, the batch coordinator, and the lifecycle
/// handlers.
#[derive(Debug, Clone)]
pub struct TaskRunner<S, M, L = StoreLifecycleService> {
    store: S,
    orchestrator: SettlementOrchestrator<S, M>,
    lifecycle: LifecycleTasks<S, L>,
    max_concurrency: usize,
}

impl<S, M> TaskRunner<S, M, StoreLifecycleService>
where
    S: SettlementStore + Clone,
    M: ModifierResolver + Clone,
{
    /// Wire a runner from configuration.
    pub fn from_config(store: S, resolver: M, config: &HamletConfig) -> Result<Self, ConfigError> {
        let resource_map = config.resource_map()?;
        Ok(Self::new(
            store,
            resolver,
            StoreLifecycleService::new(config.growth.initial_population),
            resource_map,
            config.growth,
            config.batch.max_concurrency,
        ))
    }
}

impl<S, M, L> TaskRunner<S, M, L>
where
    S: SettlementStore + Clone,
    M: ModifierResolver + Clone,
    L: LifecycleService,
{
    /// Wire a runner from its parts.
    pub fn new(
        store: S,
        resolver: M,
        lifecycle: L,
        resource_map: ResourceTypeMap,
        growth: GrowthConfig,
        max_concurrency: usize,
    ) -> Self {
        let current = CurrentGrowthPipeline::new(
            store.clone(),
            resolver.clone(),
            resource_map.clone(),
            growth,
        );
        let legacy = LegacyPipeline::new(store.clone(), resolver, resource_map);
        Self {
            orchestrator: DualPathOrchestrator::new(current, legacy),
            lifecycle: LifecycleTasks::new(store.clone(), lifecycle),
            store,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// One growth cycle for a settlement, stamped now.
    pub async fn process_settlement_growth(&self, settlement_id: SettlementId) -> TaskOutcome {
        self.process_settlement_growth_at(settlement_id, Utc::now())
            .await
    }

    /// One growth cycle for a settlement, stamped with `cycle_at`.
    pub async fn process_settlement_growth_at(
        &self,
        settlement_id: SettlementId,
        cycle_at: DateTime<Utc>,
    ) -> TaskOutcome {
        self.orchestrator.run(settlement_id, cycle_at).await
    }

    /// One production cycle for a settlement.
    ///
    /// Routed through the same dual path as growth: production is the first
    /// stage of the current pipeline and the whole of the legacy one.
    pub async fn process_settlement_production(&self, settlement_id: SettlementId) -> TaskOutcome {
        self.orchestrator.run(settlement_id, Utc::now()).await
    }

    /// Found a settlement.
    pub async fn create_settlement(
        &self,
        name: &str,
        location: LocationId,
        world: WorldId,
    ) -> TaskOutcome {
        self.lifecycle.create_settlement(name, location, world).await
    }

    /// Start constructing a building.
    pub async fn start_building_construction(
        &self,
        settlement_id: SettlementId,
        building_type: &str,
    ) -> TaskOutcome {
        self.lifecycle
            .start_building_construction(settlement_id, building_type)
            .await
    }

    /// Start repairing a damaged building.
    pub async fn start_building_repair(
        &self,
        settlement_id: SettlementId,
        building_id: BuildingId,
    ) -> TaskOutcome {
        self.lifecycle
            .start_building_repair(settlement_id, building_id)
            .await
    }

    /// One cycle for every settlement in scope, stamped now.
    pub async fn process_all_settlements_async(&self, world: Option<WorldId>) -> TaskOutcome {
        self.process_all_settlements_at(world, Utc::now()).await
    }

    /// One cycle for every settlement in scope, stamped with `cycle_at`.
    pub async fn process_all_settlements_at(
        &self,
        world: Option<WorldId>,
        cycle_at: DateTime<Utc>,
    ) -> TaskOutcome {
        BatchCoordinator::new(&self.store, &self.orchestrator, self.max_concurrency)
            .run(world, cycle_at)
            .await
    }

    /// Blocking batch entry point for synchronous callers.
    ///
    /// Drives the batch on a private current-thread runtime. When called
    /// from inside a runtime, that private runtime runs on a scoped thread
    /// so the caller's runtime is never blocked re-entrantly.
    pub fn process_all_settlements(&self, world: Option<WorldId>) -> TaskOutcome {
        let cycle_at = Utc::now();
        if tokio::runtime::Handle::try_current().is_err() {
            return self.block_on_batch(world, cycle_at);
        }

        info!("Blocking batch requested inside a runtime, using a scoped thread");
        std::thread::scope(|scope| {
            scope
                .spawn(|| self.block_on_batch(world, cycle_at))
                .join()
                .unwrap_or_else(|payload| TaskOutcome::error(None, panic_message(payload.as_ref())))
        })
    }

    fn block_on_batch(&self, world: Option<WorldId>, cycle_at: DateTime<Utc>) -> TaskOutcome {
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.process_all_settlements_at(world, cycle_at)),
            Err(e) => TaskOutcome::error(None, format!("failed to start batch runtime: {e}")),
        }
    }
}
