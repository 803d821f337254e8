//! Row structs for the settlement tables and their mapping to domain types.
//!
//! `PostgreSQL` has no unsigned integers, so counters are stored signed and
//! range-checked on the way in and out. Stage, category, and status codes
//! are stored as `TEXT`.

use chrono::{DateTime, Utc};
use hamlet_types::{
    Building, BuildingStatus, ResourceSite, ResourceSiteType, Settlement, SettlementResource,
    SiteCategory, SiteStage,
};
use uuid::Uuid;

use crate::error::DbError;

fn out_of_range(table: &str, column: &str, id: Uuid) -> DbError {
    DbError::InvalidRow(format!("{table}.{column} out of range for {id}"))
}

/// Row of the `settlements` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SettlementRow {
    /// Settlement UUID.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Owning world.
    pub world_id: Uuid,
    /// Map location, when placed.
    pub location_id: Option<Uuid>,
    /// Inhabitants.
    pub population: i32,
    /// Founding time.
    pub created_at: DateTime<Utc>,
    /// Last growth cycle.
    pub last_updated: Option<DateTime<Utc>>,
}

impl SettlementRow {
    /// Convert into the domain type.
    pub fn into_domain(self) -> Result<Settlement, DbError> {
        let population = u32::try_from(self.population)
            .ok()
            .ok_or_else(|| out_of_range("settlements", "population", self.id))?;
        Ok(Settlement {
            id: self.id.into(),
            name: self.name,
            world_id: self.world_id.into(),
            location_id: self.location_id.map(Into::into),
            population,
            created_at: self.created_at,
            last_updated: self.last_updated,
        })
    }
}

/// Row of the `resource_site_types` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteTypeRow {
    /// Site type UUID.
    pub id: Uuid,
    /// Short code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Category code.
    pub category: String,
}

impl SiteTypeRow {
    /// Convert into the domain type.
    pub fn into_domain(self) -> ResourceSiteType {
        ResourceSiteType {
            id: self.id.into(),
            code: self.code,
            name: self.name,
            category: SiteCategory::parse(&self.category),
        }
    }
}

/// Row of the `resource_sites` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteRow {
    /// Site UUID.
    pub id: Uuid,
    /// Owning settlement.
    pub settlement_id: Uuid,
    /// Site type.
    pub site_type_id: Uuid,
    /// Stage code.
    pub current_stage: String,
    /// Output multiplier, `NULL` meaning 1.0.
    pub production_multiplier: Option<f64>,
    /// Development level in `[0, 1]`, `NULL` meaning 0.
    pub development_level: Option<f64>,
    /// Depletion level in `[0, 1]`.
    pub depletion_level: f64,
    /// Last credited cycle.
    pub last_updated: Option<DateTime<Utc>>,
}

impl SiteRow {
    /// Convert into the domain type.
    pub fn into_domain(self) -> ResourceSite {
        ResourceSite {
            id: self.id.into(),
            settlement_id: self.settlement_id.into(),
            site_type_id: self.site_type_id.into(),
            current_stage: SiteStage::parse(&self.current_stage),
            production_multiplier: self.production_multiplier,
            development_level: self.development_level,
            depletion_level: self.depletion_level,
            last_updated: self.last_updated,
        }
    }
}

/// Row of the `settlement_resources` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    /// Entry UUID.
    pub id: Uuid,
    /// Owning settlement.
    pub settlement_id: Uuid,
    /// Resource type.
    pub resource_type_id: Uuid,
    /// Quantity on hand.
    pub quantity: i64,
    /// Last change.
    pub last_updated: DateTime<Utc>,
}

impl LedgerRow {
    /// Convert into the domain type.
    pub fn into_domain(self) -> Result<SettlementResource, DbError> {
        let quantity = u64::try_from(self.quantity)
            .ok()
            .ok_or_else(|| out_of_range("settlement_resources", "quantity", self.id))?;
        Ok(SettlementResource {
            id: self.id.into(),
            settlement_id: self.settlement_id.into(),
            resource_type_id: self.resource_type_id.into(),
            quantity,
            last_updated: self.last_updated,
        })
    }
}

/// Row of the `settlement_buildings` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BuildingRow {
    /// Building UUID.
    pub id: Uuid,
    /// Owning settlement.
    pub settlement_id: Uuid,
    /// Type code.
    pub building_type: String,
    /// Status code.
    pub status: String,
    /// Construction progress percent.
    pub construction_progress: i16,
    /// Health percent.
    pub health: i16,
    /// Whether the building counts toward housing.
    pub is_operational: bool,
    /// When construction finished.
    pub constructed_at: Option<DateTime<Utc>>,
    /// Last change.
    pub last_updated: Option<DateTime<Utc>>,
}

impl BuildingRow {
    /// Convert into the domain type.
    pub fn into_domain(self) -> Result<Building, DbError> {
        let status = BuildingStatus::parse(&self.status).ok_or_else(|| {
            DbError::InvalidRow(format!(
                "unknown building status `{}` for {}",
                self.status, self.id
            ))
        })?;
        let construction_progress = percent(self.construction_progress)
            .ok_or_else(|| out_of_range("settlement_buildings", "construction_progress", self.id))?;
        let health = percent(self.health)
            .ok_or_else(|| out_of_range("settlement_buildings", "health", self.id))?;
        Ok(Building {
            id: self.id.into(),
            settlement_id: self.settlement_id.into(),
            building_type: self.building_type,
            status,
            construction_progress,
            health,
            is_operational: self.is_operational,
            constructed_at: self.constructed_at,
            last_updated: self.last_updated,
        })
    }
}

fn percent(value: i16) -> Option<u8> {
    u8::try_from(value).ok().filter(|v| *v <= 100)
}

/// Store a population count.
pub fn population_to_db(population: u32) -> i32 {
    i32::try_from(population).unwrap_or(i32::MAX)
}

/// Store a ledger quantity.
pub fn quantity_to_db(quantity: u64) -> i64 {
    i64::try_from(quantity).unwrap_or(i64::MAX)
}
