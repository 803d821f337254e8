//! Shared type definitions for the Hamlet settlement simulation.
//!
//! This crate is the single source of truth for the entities the growth
//! engine reads and writes, and for the [`TaskOutcome`] contract every task
//! entry point returns. Types flow to `TypeScript` via `ts-rs` for the
//! request-serving layer that consumes task results.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all entity identifiers
//! - [`enums`] -- Site stages, site categories, resource codes, statuses
//! - [`structs`] -- Settlements, resource sites, ledger rows, buildings,
//!   seasonal modifier sets
//! - [`outcome`] -- [`TaskOutcome`] and its typed payloads

pub mod enums;
pub mod ids;
pub mod outcome;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{BuildingStatus, ResourceCode, SiteCategory, SiteStage, TaskStatus};
pub use ids::{
    BuildingId, LedgerEntryId, LocationId, ResourceSiteId, ResourceTypeId, SettlementId,
    SiteTypeId, WorldId,
};
pub use outcome::{
    BatchReport, CycleSummary, PopulationChange, SettlementFailure, TaskOutcome, TaskPayload,
};
pub use structs::{
    Building, ResourceSite, ResourceSiteType, SeasonalModifierSet, Settlement, SettlementResource,
};
