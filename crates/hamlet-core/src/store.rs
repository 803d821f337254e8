//! The persistence seam used by every pipeline and lifecycle handler.
//!
//! A [`SettlementStore`] hands out [`StoreSession`]s. A session is one unit
//! of work: reads see the session's own writes, and nothing becomes visible
//! to other sessions until [`StoreSession::commit`]. Dropping a session
//! without committing discards its writes, so every exit path (early
//! return, `?`, panic) releases the session cleanly.
//!
//! `hamlet-db` implements these traits over `PostgreSQL` transactions;
//! [`crate::memory::MemoryStore`] implements them in memory for tests and
//! dry runs.

use std::future::Future;

use hamlet_types::{
    Building, BuildingId, ResourceSite, ResourceSiteType, ResourceTypeId, Settlement,
    SettlementId, SettlementResource, SiteTypeId, WorldId,
};

/// Errors raised by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A row the operation depends on does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row (`settlement`, `building`, ...).
        entity: &'static str,
        /// Its id.
        id: String,
    },

    /// The backend failed (connection, query, commit).
    #[error("storage backend error: {message}")]
    Backend {
        /// Backend-specific description.
        message: String,
    },

    /// A stored value could not be mapped into the domain types.
    #[error("invalid stored value: {message}")]
    Invalid {
        /// What could not be mapped.
        message: String,
    },
}

impl StoreError {
    /// Shorthand for [`StoreError::Backend`].
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Factory for units of work.
pub trait SettlementStore: Send + Sync {
    /// The session type this store opens.
    type Session: StoreSession;

    /// Begin a new unit of work.
    fn open_session(&self) -> impl Future<Output = Result<Self::Session, StoreError>> + Send;
}

/// One unit of work against the settlement tables.
pub trait StoreSession: Send {
    /// Load a settlement.
    fn settlement(
        &mut self,
        id: SettlementId,
    ) -> impl Future<Output = Result<Option<Settlement>, StoreError>> + Send;

    /// List settlements, optionally scoped to one world, ordered by id.
    fn settlements(
        &mut self,
        world: Option<WorldId>,
    ) -> impl Future<Output = Result<Vec<Settlement>, StoreError>> + Send;

    /// Sites of a settlement whose stage can produce (everything except
    /// `undiscovered` and `depleted`), ordered by id.
    fn productive_sites(
        &mut self,
        settlement: SettlementId,
    ) -> impl Future<Output = Result<Vec<ResourceSite>, StoreError>> + Send;

    /// Load a site type.
    fn site_type(
        &mut self,
        id: SiteTypeId,
    ) -> impl Future<Output = Result<Option<ResourceSiteType>, StoreError>> + Send;

    /// The ledger entry for `(settlement, resource type)`.
    fn ledger_entry(
        &mut self,
        settlement: SettlementId,
        resource_type: ResourceTypeId,
    ) -> impl Future<Output = Result<Option<SettlementResource>, StoreError>> + Send;

    /// Insert or update a ledger entry, keyed by `(settlement, resource type)`.
    fn save_ledger_entry(
        &mut self,
        entry: &SettlementResource,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Persist a site's mutable fields.
    fn save_site(
        &mut self,
        site: &ResourceSite,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Insert or update a settlement.
    fn save_settlement(
        &mut self,
        settlement: &Settlement,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Buildings of a settlement, ordered by id.
    fn buildings(
        &mut self,
        settlement: SettlementId,
    ) -> impl Future<Output = Result<Vec<Building>, StoreError>> + Send;

    /// Load a building.
    fn building(
        &mut self,
        id: BuildingId,
    ) -> impl Future<Output = Result<Option<Building>, StoreError>> + Send;

    /// Insert or update a building.
    fn save_building(
        &mut self,
        building: &Building,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Make every write of this session visible atomically.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
