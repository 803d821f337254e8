//! Production rates and per-site yield calculation for the Hamlet
//! settlement simulation.
//!
//! This crate is pure: it never touches storage. The orchestrators in
//! `hamlet-core` load sites, hand them to [`evaluate_site`], and persist
//! whatever it changed.
//!
//! # Modules
//!
//! - [`rates`] -- The Production Rate Table keyed by site stage.
//! - [`resource_map`] -- Resource code to canonical resource-type id.
//! - [`calculator`] -- Yield arithmetic, depletion, and site stamping.
//! - [`error`] -- Non-fatal skip reasons.

pub mod calculator;
pub mod error;
pub mod rates;
pub mod resource_map;

pub use calculator::{
    DEPLETION_PER_CYCLE, DEVELOPMENT_BONUS_PER_LEVEL, ResourceCredit, SiteYield,
    advance_depletion, compute_credits, development_bonus, effective_multiplier, evaluate_site,
    produced_amount,
};
pub use error::ProductionError;
pub use rates::{BaseYield, DISCOVERED_YIELDS, base_yields};
pub use resource_map::ResourceTypeMap;
