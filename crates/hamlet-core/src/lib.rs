//! Settlement production and growth orchestration for the Hamlet
//! simulation.
//!
//! This crate turns the pure calculator in `hamlet-production` into task
//! executions: it loads settlements through a storage seam, runs the
//! current growth pipeline with a legacy fallback, fans out across worlds,
//! and answers every request with a [`TaskOutcome`].
//!
//! # Modules
//!
//! - [`config`] -- Loading `hamlet.yaml` into strongly-typed structs.
//! - [`store`] -- [`SettlementStore`] / [`StoreSession`] persistence seam.
//! - [`memory`] -- In-memory store for tests and dry runs.
//! - [`modifiers`] -- [`ModifierResolver`] trait and the built-in season
//!   table.
//! - [`pipeline`] -- [`SettlementPipeline`] contract shared by both paths.
//! - [`production`] -- Per-settlement production and the legacy pipeline.
//! - [`growth`] -- The current pipeline: production, population, buildings.
//! - [`dual_path`] -- Current-then-legacy orchestration.
//! - [`batch`] -- Bounded-concurrency fan-out across settlements.
//! - [`lifecycle`] -- Founding settlements, construction, and repair.
//! - [`tasks`] -- [`TaskRunner`], the task entry points.
//!
//! [`TaskOutcome`]: hamlet_types::TaskOutcome
//! [`SettlementStore`]: store::SettlementStore
//! [`StoreSession`]: store::StoreSession
//! [`ModifierResolver`]: modifiers::ModifierResolver
//! [`SettlementPipeline`]: pipeline::SettlementPipeline
//! [`TaskRunner`]: tasks::TaskRunner

pub mod batch;
pub mod config;
pub mod dual_path;
pub mod growth;
pub mod lifecycle;
pub mod memory;
pub mod modifiers;
pub mod pipeline;
pub mod production;
pub mod store;
pub mod tasks;

pub use config::{ConfigError, HamletConfig};
pub use dual_path::{DualPathOrchestrator, Route};
pub use lifecycle::{LifecycleError, LifecycleService, StoreLifecycleService};
pub use memory::MemoryStore;
pub use modifiers::{ModifierError, ModifierResolver, StaticModifierResolver};
pub use pipeline::{PipelineFault, PipelineReport, SettlementPipeline};
pub use store::{SettlementStore, StoreError, StoreSession};
pub use tasks::TaskRunner;
