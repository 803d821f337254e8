//! `PostgreSQL` storage for the Hamlet settlement simulation.
//!
//! Implements the storage and modifier seams of `hamlet-core` over a
//! [`sqlx`] pool. Every session is one transaction; a settlement row is
//! locked for the life of the session that loads it.
//!
//! # Modules
//!
//! - [`database`] -- [`HamletDb`], the pool, migrations, and seam wiring
//! - [`rows`] -- Row structs and their mapping to domain types
//! - [`store`] -- [`PgStore`] / [`PgSession`], the transactional store
//! - [`seasons`] -- [`PgModifierResolver`], seasons from the `worlds` table
//! - [`error`] -- Shared error types

pub mod database;
pub mod error;
pub mod rows;
pub mod seasons;
pub mod store;

pub use database::HamletDb;
pub use error::DbError;
pub use seasons::PgModifierResolver;
pub use store::{PgSession, PgStore};
