//! End-to-end settlement cycles over the in-memory store.
//!
//! These run the full task surface (dual path, batch, lifecycle) the way
//! the worker drives it, without a database.

#![allow(clippy::panic, clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use chrono::{Duration, Utc};
use hamlet_core::config::GrowthConfig;
use hamlet_core::growth::CurrentGrowthPipeline;
use hamlet_core::production::LegacyPipeline;
use hamlet_core::{
    DualPathOrchestrator, HamletConfig, MemoryStore, ModifierError, ModifierResolver,
    PipelineFault, PipelineReport, SettlementPipeline, StaticModifierResolver, TaskRunner,
};
use hamlet_production::ResourceTypeMap;
use hamlet_types::{
    LocationId, ResourceCode, ResourceSite, ResourceSiteId, ResourceSiteType, SeasonalModifierSet,
    Settlement, SettlementId, SiteCategory, SiteStage, SiteTypeId, TaskPayload, WorldId,
};

struct World {
    store: MemoryStore,
    resolver: StaticModifierResolver,
    world: WorldId,
    farm_type: ResourceSiteType,
    mine_type: ResourceSiteType,
}

impl World {
    fn new(season: &str) -> Self {
        let store = MemoryStore::new();
        let resolver = StaticModifierResolver::new();
        let world = WorldId::new();
        resolver.set_season(world, season);

        let farm_type = ResourceSiteType {
            id: SiteTypeId::new(),
            code: "fertile_land".to_owned(),
            name: "Fertile Land".to_owned(),
            category: SiteCategory::Farming,
        };
        let mine_type = ResourceSiteType {
            id: SiteTypeId::new(),
            code: "iron_deposit".to_owned(),
            name: "Iron Deposit".to_owned(),
            category: SiteCategory::Mining,
        };
        store.insert_site_type(farm_type.clone());
        store.insert_site_type(mine_type.clone());

        Self {
            store,
            resolver,
            world,
            farm_type,
            mine_type,
        }
    }

    fn settlement(&self, name: &str) -> SettlementId {
        let s = Settlement {
            id: SettlementId::new(),
            name: name.to_owned(),
            world_id: self.world,
            location_id: Some(LocationId::new()),
            population: 10,
            created_at: Utc::now(),
            last_updated: None,
        };
        self.store.insert_settlement(s.clone());
        s.id
    }

    fn site(&self, settlement: SettlementId, site_type: &ResourceSiteType, stage: SiteStage) {
        self.store.insert_site(ResourceSite {
            id: ResourceSiteId::new(),
            settlement_id: settlement,
            site_type_id: site_type.id,
            current_stage: stage,
            production_multiplier: Some(1.0),
            development_level: Some(0.0),
            depletion_level: 0.0,
            last_updated: None,
        });
    }

    fn runner(&self) -> TaskRunner<MemoryStore, StaticModifierResolver> {
        match TaskRunner::from_config(
            self.store.clone(),
            self.resolver.clone(),
            &HamletConfig::default(),
        ) {
            Ok(runner) => runner,
            Err(e) => panic!("runner wiring failed: {e}"),
        }
    }

    fn quantity(&self, settlement: SettlementId, code: ResourceCode) -> Option<u64> {
        let id = ResourceTypeMap::canonical().resolve(code)?;
        self.store.ledger_entry(settlement, id).map(|e| e.quantity)
    }
}

/// Resolver whose season source is down for one world.
#[derive(Clone)]
struct FlakyResolver {
    inner: StaticModifierResolver,
    broken: WorldId,
}

impl ModifierResolver for FlakyResolver {
    async fn seasonal_modifiers(&self, world: WorldId) -> Result<SeasonalModifierSet, ModifierError> {
        if world == self.broken {
            return Err(ModifierError::Backend {
                message: "season table unavailable".to_owned(),
            });
        }
        self.inner.seasonal_modifiers(world).await
    }
}

/// Current pipeline that always faults, to force the legacy path.
struct Broken;

impl SettlementPipeline for Broken {
    fn name(&self) -> &'static str {
        "broken"
    }

    async fn run(
        &self,
        settlement_id: SettlementId,
        _cycle_at: chrono::DateTime<Utc>,
    ) -> Result<PipelineReport, PipelineFault> {
        Err(PipelineFault::SettlementNotFound(settlement_id))
    }
}

#[tokio::test]
async fn batch_with_one_failing_settlement_processes_the_rest() {
    let w = World::new("summer");
    let mut healthy = Vec::new();
    for name in ["Alder", "Birch", "Dogwood", "Elm"] {
        let id = w.settlement(name);
        w.site(id, &w.farm_type, SiteStage::SmallFarm);
        healthy.push(id);
    }

    // One settlement lives in a world whose season source is down, so both
    // paths fail for it.
    let broken_world = WorldId::new();
    let cedar = Settlement {
        id: SettlementId::new(),
        name: "Cedar".to_owned(),
        world_id: broken_world,
        location_id: None,
        population: 10,
        created_at: Utc::now(),
        last_updated: None,
    };
    w.store.insert_settlement(cedar.clone());

    let resolver = FlakyResolver {
        inner: w.resolver.clone(),
        broken: broken_world,
    };
    let runner = match TaskRunner::from_config(w.store.clone(), resolver, &HamletConfig::default())
    {
        Ok(runner) => runner,
        Err(e) => panic!("runner wiring failed: {e}"),
    };

    let outcome = runner.process_all_settlements_async(None).await;
    let Some(TaskPayload::Batch(report)) = outcome.result else {
        panic!("expected a batch report, got {outcome:?}");
    };
    assert_eq!(report.total, 5);
    assert_eq!(report.processed, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].settlement_id, cedar.id);

    for id in &healthy {
        // floor(12 * 1.1) = 13 produced, then 10 eaten by the population.
        assert_eq!(w.quantity(*id, ResourceCode::Food), Some(3));
    }
    assert_eq!(w.store.open_sessions(), 0);
}

#[tokio::test]
async fn batch_records_failures_without_aborting() {
    let w = World::new("spring");
    let ids: Vec<_> = ["Fen", "Gorse", "Heath", "Ivy", "Juniper"]
        .into_iter()
        .map(|name| w.settlement(name))
        .collect();

    // Commits fail for everyone: every settlement is reported, none aborts
    // the batch.
    w.store.set_commit_failure(true);
    let outcome = w.runner().process_all_settlements_async(None).await;
    let Some(TaskPayload::Batch(report)) = outcome.result else {
        panic!("expected a batch report, got {outcome:?}");
    };
    assert_eq!(report.total, 5);
    assert_eq!(report.processed, 0);
    assert_eq!(report.failures.len(), 5);
    let failed: Vec<_> = report.failures.iter().map(|f| f.settlement_id).collect();
    for id in &ids {
        assert!(failed.contains(id));
    }
    assert_eq!(w.store.open_sessions(), 0);
}

#[tokio::test]
async fn fallback_matches_running_legacy_alone() {
    let w = World::new("autumn");
    let id = w.settlement("Kestrel");
    w.site(id, &w.mine_type, SiteStage::EstablishedMine);
    w.site(id, &w.farm_type, SiteStage::EstablishedFarm);

    let twin = w.store.fork();
    let cycle_at = Utc::now();
    let map = ResourceTypeMap::canonical();

    let fallback = DualPathOrchestrator::new(
        Broken,
        LegacyPipeline::new(w.store.clone(), w.resolver.clone(), map.clone()),
    );
    let via_fallback = fallback.run(id, cycle_at).await;

    let alone = LegacyPipeline::new(twin.clone(), w.resolver.clone(), map);
    let via_legacy = alone.run(id, cycle_at).await;

    let Ok(PipelineReport::Completed(summary)) = via_legacy else {
        panic!("legacy run failed: {via_legacy:?}");
    };
    assert_eq!(via_fallback.result, Some(TaskPayload::Cycle(summary)));
    assert_eq!(w.store.ledger_quantities(id), twin.ledger_quantities(id));
    assert!(!w.store.ledger_quantities(id).is_empty());
}

#[tokio::test]
async fn settlement_without_sites_succeeds_with_no_production() {
    let w = World::new("winter");
    let id = w.settlement("Larch");

    let outcome = w.runner().process_settlement_production(id).await;
    let Some(TaskPayload::Cycle(summary)) = outcome.result else {
        panic!("expected a cycle summary, got {outcome:?}");
    };
    assert_eq!(summary.sites_processed, 0);
    assert_eq!(summary.total_produced(), 0);
    assert!(w.store.ledger_quantities(id).is_empty());
}

#[tokio::test]
async fn mine_depletes_after_one_hundred_cycles() {
    let w = World::new("summer");
    let id = w.settlement("Moss");
    w.site(id, &w.mine_type, SiteStage::SmallMine);
    let legacy = LegacyPipeline::new(
        w.store.clone(),
        w.resolver.clone(),
        ResourceTypeMap::canonical(),
    );

    let start = Utc::now();
    let mut depleted_at = None;
    for cycle in 0..100_i64 {
        let report = legacy.run(id, start + Duration::minutes(cycle)).await;
        let Ok(PipelineReport::Completed(summary)) = report else {
            panic!("cycle {cycle} failed: {report:?}");
        };
        if summary.sites_depleted > 0 {
            depleted_at = Some(cycle);
        }
    }
    assert_eq!(depleted_at, Some(99));

    // Depleted sites no longer produce.
    let before = w.quantity(id, ResourceCode::Iron);
    let after = legacy.run(id, start + Duration::minutes(100)).await;
    assert!(matches!(after, Ok(PipelineReport::Completed(ref s)) if s.sites_processed == 0));
    assert_eq!(w.quantity(id, ResourceCode::Iron), before);
    // 5 iron a cycle for 100 cycles.
    assert_eq!(before, Some(500));
}

#[tokio::test]
async fn founded_settlement_grows_through_tasks() {
    let w = World::new("spring");
    let runner = w.runner();

    let created = runner
        .create_settlement("Nettlefield", LocationId::new(), w.world)
        .await;
    let Some(TaskPayload::SettlementCreated { settlement_id }) = created.result else {
        panic!("expected a settlement, got {created:?}");
    };
    w.site(settlement_id, &w.farm_type, SiteStage::EstablishedFarm);

    let started = runner
        .start_building_construction(settlement_id, "house")
        .await;
    assert!(started.is_success());

    let config = GrowthConfig::default();
    let current = CurrentGrowthPipeline::new(
        w.store.clone(),
        w.resolver.clone(),
        ResourceTypeMap::canonical(),
        config,
    );
    let start = Utc::now();
    for cycle in 0..10_i64 {
        let report = current.run(settlement_id, start + Duration::minutes(cycle)).await;
        assert!(matches!(report, Ok(PipelineReport::Completed(_))));
    }

    let buildings = w.store.buildings_of(settlement_id);
    assert_eq!(buildings.len(), 1);
    assert!(buildings[0].is_operational);
    // floor(20 * 1.2) = 24 a cycle, 10 eaten a cycle while housing is full.
    let food = w.quantity(settlement_id, ResourceCode::Food);
    assert!(food.is_some_and(|f| f > 0));
    assert_eq!(w.store.open_sessions(), 0);
}
