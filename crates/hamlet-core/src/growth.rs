//! The current settlement pipeline: production, population growth, and
//! building progress in a single unit of work.
//!
//! Order within a cycle:
//!
//! 1. Site production, exactly as the legacy pipeline does it.
//! 2. Population growth against the food now in the ledger and the housing
//!    of operational buildings, then food consumption of one unit per
//!    inhabitant.
//! 3. Construction and repair progress.
//!
//! A missing settlement declines instead of faulting, which hands the
//! settlement to the legacy pipeline.

use chrono::{DateTime, Utc};
use hamlet_production::ResourceTypeMap;
use hamlet_types::{
    Building, BuildingStatus, PopulationChange, ResourceCode, Settlement, SettlementId,
};
use tracing::{debug, info};

use crate::config::GrowthConfig;
use crate::modifiers::{ModifierResolver, resolve_or_neutral};
use crate::pipeline::{PipelineFault, PipelineReport, SettlementPipeline};
use crate::production::produce_settlement;
use crate::store::{SettlementStore, StoreError, StoreSession};

/// Housing added by one operational building of a type.
pub fn housing_per_building(building_type: &str) -> u32 {
    match building_type {
        "house" => 5,
        "mansion" => 10,
        "apartment" => 20,
        _ => 0,
    }
}

/// Total housing: the base plus every operational building's share.
pub fn housing_capacity(buildings: &[Building], base: u32) -> u32 {
    buildings
        .iter()
        .filter(|b| b.is_operational)
        .map(|b| housing_per_building(&b.building_type))
        .fold(base, u32::saturating_add)
}

/// Population after one cycle of growth.
///
/// Growth scales with how well food covers the population, how much housing
/// is left, and the season. It never pushes past `capacity` and never
/// shrinks an already crowded settlement.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn grown_population(
    population: u32,
    food: u64,
    capacity: u32,
    winter: bool,
    config: &GrowthConfig,
) -> u32 {
    if population >= capacity {
        return population;
    }

    let pop = f64::from(population);
    let food = f64::from(u32::try_from(food).unwrap_or(u32::MAX));
    let food_modifier = (food / pop.max(1.0)).min(1.0);
    let housing_modifier = (f64::from(capacity) / (pop + 1.0)).min(1.0);
    let seasonal = if winter {
        config.winter_growth_modifier
    } else {
        1.0
    };

    let rate = config.base_growth_rate * food_modifier * housing_modifier * seasonal;
    let raw = (pop * rate).floor();
    let increase = if raw.is_finite() && raw > 0.0 {
        raw as u32
    } else {
        0
    };
    population.saturating_add(increase).min(capacity)
}

/// What one cycle did to a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildingStep {
    /// Nothing to advance.
    Idle,
    /// Progress or health increased.
    Advanced,
    /// Construction reached 100%.
    Constructed,
    /// Repair reached full health.
    Repaired,
}

/// Advance construction or repair by one cycle.
pub fn advance_building(
    building: &mut Building,
    config: &GrowthConfig,
    cycle_at: DateTime<Utc>,
) -> BuildingStep {
    match building.status {
        BuildingStatus::InProgress => {
            building.construction_progress = building
                .construction_progress
                .saturating_add(config.construction_step)
                .min(100);
            building.last_updated = Some(cycle_at);
            if building.construction_progress < 100 {
                return BuildingStep::Advanced;
            }
            building.status = BuildingStatus::Completed;
            building.is_operational = true;
            building.constructed_at = Some(cycle_at);
            BuildingStep::Constructed
        }
        BuildingStatus::UnderRepair => {
            building.health = building.health.saturating_add(config.repair_step).min(100);
            building.last_updated = Some(cycle_at);
            if building.health < 100 {
                return BuildingStep::Advanced;
            }
            building.status = BuildingStatus::Completed;
            building.is_operational = true;
            BuildingStep::Repaired
        }
        BuildingStatus::Completed | BuildingStatus::Damaged => BuildingStep::Idle,
    }
}

/// Production, growth, and building progress in one session.
#[derive(Debug, Clone)]
pub struct CurrentGrowthPipeline<S, M> {
    store: S,
    resolver: M,
    resource_map: ResourceTypeMap,
    config: GrowthConfig,
}

impl<S, M> CurrentGrowthPipeline<S, M> {
    /// Build the pipeline.
    pub const fn new(
        store: S,
        resolver: M,
        resource_map: ResourceTypeMap,
        config: GrowthConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            resource_map,
            config,
        }
    }
}

impl<S, M> CurrentGrowthPipeline<S, M>
where
    S: SettlementStore,
    M: ModifierResolver,
{
    async fn grow<Sess: StoreSession>(
        &self,
        session: &mut Sess,
        settlement: &mut Settlement,
        buildings: &[Building],
        winter: bool,
        cycle_at: DateTime<Utc>,
    ) -> Result<PopulationChange, StoreError> {
        let previous = settlement.population;
        let capacity = housing_capacity(buildings, self.config.base_housing_capacity);

        let food_entry = match self.resource_map.resolve(ResourceCode::Food) {
            Some(food_type) => session.ledger_entry(settlement.id, food_type).await?,
            None => None,
        };
        let food_supply = food_entry.as_ref().map_or(0, |entry| entry.quantity);

        let current = grown_population(previous, food_supply, capacity, winter, &self.config);
        settlement.population = current;

        let food_consumed = food_supply.min(u64::from(previous));
        if let Some(mut entry) = food_entry {
            entry.quantity = entry.quantity.saturating_sub(food_consumed);
            entry.last_updated = cycle_at;
            session.save_ledger_entry(&entry).await?;
        }

        info!(
            settlement_id = %settlement.id,
            previous,
            current,
            food_supply,
            food_consumed,
            housing_capacity = capacity,
            "Population updated"
        );

        Ok(PopulationChange {
            previous,
            current,
            food_supply,
            food_consumed,
            housing_capacity: capacity,
        })
    }
}

impl<S, M> SettlementPipeline for CurrentGrowthPipeline<S, M>
where
    S: SettlementStore,
    M: ModifierResolver,
{
    fn name(&self) -> &'static str {
        "current"
    }

    async fn run(
        &self,
        settlement_id: SettlementId,
        cycle_at: DateTime<Utc>,
    ) -> Result<PipelineReport, PipelineFault> {
        let mut session = self.store.open_session().await?;
        let Some(mut settlement) = session.settlement(settlement_id).await? else {
            return Ok(PipelineReport::Declined {
                message: format!("Settlement {settlement_id} not found"),
            });
        };

        let modifiers = resolve_or_neutral(&self.resolver, settlement.world_id).await?;
        let mut summary = produce_settlement(
            &mut session,
            &modifiers,
            &self.resource_map,
            &settlement,
            cycle_at,
        )
        .await?;

        if settlement.last_updated.is_some_and(|stamped| stamped >= cycle_at) {
            debug!(settlement_id = %settlement_id, "Settlement already grown this cycle");
            session.commit().await?;
            return Ok(PipelineReport::Completed(summary));
        }

        let buildings = session.buildings(settlement_id).await?;
        let winter = modifiers.is_winter();
        let change = self
            .grow(&mut session, &mut settlement, &buildings, winter, cycle_at)
            .await?;
        summary.population = Some(change);

        for mut building in buildings {
            let step = advance_building(&mut building, &self.config, cycle_at);
            match step {
                BuildingStep::Idle => continue,
                BuildingStep::Advanced => {}
                BuildingStep::Constructed => {
                    summary.buildings_completed = summary.buildings_completed.saturating_add(1);
                    info!(building_id = %building.id, "Building construction completed");
                }
                BuildingStep::Repaired => {
                    summary.buildings_repaired = summary.buildings_repaired.saturating_add(1);
                    info!(building_id = %building.id, "Building repair completed");
                }
            }
            session.save_building(&building).await?;
        }

        settlement.last_updated = Some(cycle_at);
        session.save_settlement(&settlement).await?;
        session.commit().await?;
        Ok(PipelineReport::Completed(summary))
    }
}
