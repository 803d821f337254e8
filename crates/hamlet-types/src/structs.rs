//! Core entity structs persisted by the storage layer.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{BuildingStatus, ResourceCode, SiteCategory, SiteStage};
use crate::ids::{
    BuildingId, LedgerEntryId, LocationId, ResourceSiteId, ResourceTypeId, SettlementId,
    SiteTypeId, WorldId,
};

/// A settlement in a persistent world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Settlement {
    /// Settlement identity.
    pub id: SettlementId,
    /// Display name.
    pub name: String,
    /// Owning world.
    pub world_id: WorldId,
    /// Map location the settlement occupies.
    pub location_id: Option<LocationId>,
    /// Current number of inhabitants.
    pub population: u32,
    /// When the settlement was founded.
    pub created_at: DateTime<Utc>,
    /// Last time the growth pipeline touched this settlement.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Static reference data describing a kind of resource site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceSiteType {
    /// Site type identity.
    pub id: SiteTypeId,
    /// Short code, e.g. `iron_vein`.
    pub code: String,
    /// Display name, e.g. `Iron Vein`.
    pub name: String,
    /// Category; decides whether the site depletes.
    #[ts(type = "string")]
    pub category: SiteCategory,
}

/// An exploitable site owned by one settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResourceSite {
    /// Site identity.
    pub id: ResourceSiteId,
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Reference to the site type.
    pub site_type_id: SiteTypeId,
    /// Current development stage.
    #[ts(type = "string")]
    pub current_stage: SiteStage,
    /// Quality multiplier (>= 0). `None` means 1.0.
    pub production_multiplier: Option<f64>,
    /// Development level in `[0.0, 1.0]`. `None` means 0.0.
    pub development_level: Option<f64>,
    /// Exhaustion in `[0.0, 1.0]`; only advances for mining sites.
    pub depletion_level: f64,
    /// Timestamp of the last cycle that processed this site.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Per-settlement, per-resource accumulated quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementResource {
    /// Ledger row identity.
    pub id: LedgerEntryId,
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Canonical resource type.
    pub resource_type_id: ResourceTypeId,
    /// Accumulated quantity.
    pub quantity: u64,
    /// Last time the quantity changed.
    pub last_updated: DateTime<Utc>,
}

/// A building inside a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Building {
    /// Building identity.
    pub id: BuildingId,
    /// Owning settlement.
    pub settlement_id: SettlementId,
    /// Building type code, e.g. `house`.
    pub building_type: String,
    /// Construction state.
    pub status: BuildingStatus,
    /// Construction progress in percent (0-100).
    pub construction_progress: u8,
    /// Structural health in percent (0-100).
    pub health: u8,
    /// Whether the building currently provides its effects.
    pub is_operational: bool,
    /// When construction finished.
    pub constructed_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub last_updated: Option<DateTime<Utc>>,
}

/// Season name and per-resource production multipliers for one world at one
/// point in time. Supplied by a modifier resolver; never persisted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SeasonalModifierSet {
    /// Season name, e.g. `winter`.
    pub season: String,
    /// Resource code to multiplier. Absent codes mean 1.0.
    pub modifiers: BTreeMap<String, f64>,
}

impl SeasonalModifierSet {
    /// Season name used when a world has none recorded.
    pub const DEFAULT_SEASON: &'static str = "spring";

    /// A set with no modifiers: every resource produces at 1.0.
    pub fn neutral(season: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            modifiers: BTreeMap::new(),
        }
    }

    /// Multiplier for a resource code, 1.0 if absent.
    pub fn modifier_for(&self, code: ResourceCode) -> f64 {
        self.modifiers.get(code.as_str()).copied().unwrap_or(1.0)
    }

    /// Whether the current season is winter.
    pub fn is_winter(&self) -> bool {
        self.season.eq_ignore_ascii_case("winter")
    }
}
