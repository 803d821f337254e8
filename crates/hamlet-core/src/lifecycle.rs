//! Settlement lifecycle: founding settlements, starting construction, and
//! starting repairs.
//!
//! A [`LifecycleService`] applies the domain rules inside a session it is
//! handed. [`LifecycleTasks`] owns the session: it opens one per request,
//! commits only when the service succeeded, and normalizes every result
//! (including a panic) into a [`TaskOutcome`].

use std::future::Future;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use hamlet_types::{
    Building, BuildingId, BuildingStatus, LocationId, Settlement, SettlementId, TaskOutcome,
    TaskPayload, WorldId,
};
use tracing::{info, warn};

use crate::dual_path::panic_message;
use crate::store::{SettlementStore, StoreError, StoreSession};

/// Why a lifecycle request was not carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// The request broke a domain rule.
    #[error("{0}")]
    Rejected(String),

    /// Storage failed.
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),
}

/// Domain rules for lifecycle requests.
pub trait LifecycleService: Send + Sync {
    /// Found a settlement at a location.
    fn create_settlement<S: StoreSession>(
        &self,
        session: &mut S,
        name: &str,
        location: LocationId,
        world: WorldId,
    ) -> impl Future<Output = Result<TaskPayload, LifecycleError>> + Send;

    /// Start constructing a building of a type.
    fn start_building_construction<S: StoreSession>(
        &self,
        session: &mut S,
        settlement: SettlementId,
        building_type: &str,
    ) -> impl Future<Output = Result<TaskPayload, LifecycleError>> + Send;

    /// Start repairing a damaged building.
    fn start_building_repair<S: StoreSession>(
        &self,
        session: &mut S,
        settlement: SettlementId,
        building: BuildingId,
    ) -> impl Future<Output = Result<TaskPayload, LifecycleError>> + Send;
}

/// Lifecycle rules backed directly by the store.
#[derive(Debug, Clone, Copy)]
pub struct StoreLifecycleService {
    initial_population: u32,
}

impl StoreLifecycleService {
    /// Rules that found settlements with `initial_population` inhabitants.
    pub const fn new(initial_population: u32) -> Self {
        Self { initial_population }
    }
}

impl LifecycleService for StoreLifecycleService {
    async fn create_settlement<S: StoreSession>(
        &self,
        session: &mut S,
        name: &str,
        location: LocationId,
        world: WorldId,
    ) -> Result<TaskPayload, LifecycleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::Rejected(
                "Settlement name must not be empty".to_owned(),
            ));
        }

        let settlement = Settlement {
            id: SettlementId::new(),
            name: name.to_owned(),
            world_id: world,
            location_id: Some(location),
            population: self.initial_population,
            created_at: Utc::now(),
            last_updated: None,
        };
        session.save_settlement(&settlement).await?;

        info!(
            settlement_id = %settlement.id,
            world_id = %world,
            name = settlement.name.as_str(),
            "Settlement founded"
        );
        Ok(TaskPayload::SettlementCreated {
            settlement_id: settlement.id,
        })
    }

    async fn start_building_construction<S: StoreSession>(
        &self,
        session: &mut S,
        settlement: SettlementId,
        building_type: &str,
    ) -> Result<TaskPayload, LifecycleError> {
        let building_type = building_type.trim();
        if building_type.is_empty() {
            return Err(LifecycleError::Rejected(
                "Building type must not be empty".to_owned(),
            ));
        }
        if session.settlement(settlement).await?.is_none() {
            return Err(LifecycleError::Rejected(format!(
                "Settlement {settlement} not found"
            )));
        }

        let building = Building {
            id: BuildingId::new(),
            settlement_id: settlement,
            building_type: building_type.to_owned(),
            status: BuildingStatus::InProgress,
            construction_progress: 0,
            health: 100,
            is_operational: false,
            constructed_at: None,
            last_updated: Some(Utc::now()),
        };
        session.save_building(&building).await?;

        info!(
            settlement_id = %settlement,
            building_id = %building.id,
            building_type,
            "Building construction started"
        );
        Ok(TaskPayload::ConstructionStarted {
            building_id: building.id,
            building_type: building.building_type,
        })
    }

    async fn start_building_repair<S: StoreSession>(
        &self,
        session: &mut S,
        settlement: SettlementId,
        building: BuildingId,
    ) -> Result<TaskPayload, LifecycleError> {
        let Some(mut target) = session.building(building).await? else {
            return Err(LifecycleError::Rejected(format!(
                "Building {building} not found"
            )));
        };
        if target.settlement_id != settlement {
            return Err(LifecycleError::Rejected(format!(
                "Building {building} does not belong to settlement {settlement}"
            )));
        }
        if target.status != BuildingStatus::Damaged {
            return Err(LifecycleError::Rejected(format!(
                "Building {building} is {} and cannot be repaired",
                target.status.as_str()
            )));
        }

        target.status = BuildingStatus::UnderRepair;
        target.is_operational = false;
        target.last_updated = Some(Utc::now());
        session.save_building(&target).await?;

        info!(settlement_id = %settlement, building_id = %building, "Building repair started");
        Ok(TaskPayload::RepairStarted {
            building_id: building,
        })
    }
}

// ---------------------------------------------------------------------------
// Task handlers
// ---------------------------------------------------------------------------

/// Session-owning handlers around a [`LifecycleService`].
#[derive(Debug, Clone)]
pub struct LifecycleTasks<S, L> {
    store: S,
    service: L,
}

impl<S, L> LifecycleTasks<S, L>
where
    S: SettlementStore,
    L: LifecycleService,
{
    /// Pair a store with a service.
    pub const fn new(store: S, service: L) -> Self {
        Self { store, service }
    }

    /// Found a settlement.
    pub async fn create_settlement(
        &self,
        name: &str,
        location: LocationId,
        world: WorldId,
    ) -> TaskOutcome {
        let mut session = match self.store.open_session().await {
            Ok(session) => session,
            Err(e) => return TaskOutcome::error(None, e.to_string()),
        };
        let result = AssertUnwindSafe(
            self.service
                .create_settlement(&mut session, name, location, world),
        )
        .catch_unwind()
        .await;
        let settlement_id = match &result {
            Ok(Ok(TaskPayload::SettlementCreated { settlement_id })) => Some(*settlement_id),
            _ => None,
        };
        finish(session, result, settlement_id, "create_settlement").await
    }

    /// Start constructing a building.
    pub async fn start_building_construction(
        &self,
        settlement: SettlementId,
        building_type: &str,
    ) -> TaskOutcome {
        let mut session = match self.store.open_session().await {
            Ok(session) => session,
            Err(e) => return TaskOutcome::error(Some(settlement), e.to_string()),
        };
        let result = AssertUnwindSafe(self.service.start_building_construction(
            &mut session,
            settlement,
            building_type,
        ))
        .catch_unwind()
        .await;
        finish(session, result, Some(settlement), "start_building_construction").await
    }

    /// Start repairing a building.
    pub async fn start_building_repair(
        &self,
        settlement: SettlementId,
        building: BuildingId,
    ) -> TaskOutcome {
        let mut session = match self.store.open_session().await {
            Ok(session) => session,
            Err(e) => return TaskOutcome::error(Some(settlement), e.to_string()),
        };
        let result = AssertUnwindSafe(
            self.service
                .start_building_repair(&mut session, settlement, building),
        )
        .catch_unwind()
        .await;
        finish(session, result, Some(settlement), "start_building_repair").await
    }
}

type Caught<T> = Result<T, Box<dyn std::any::Any + Send>>;

async fn finish<Sess: StoreSession>(
    session: Sess,
    result: Caught<Result<TaskPayload, LifecycleError>>,
    settlement_id: Option<SettlementId>,
    task: &'static str,
) -> TaskOutcome {
    let payload = match result {
        Ok(Ok(payload)) => payload,
        Ok(Err(e)) => {
            warn!(task, settlement_id = ?settlement_id, error = %e, "Lifecycle task rejected");
            return TaskOutcome::error(settlement_id, e.to_string());
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(task, settlement_id = ?settlement_id, error = message.as_str(), "Lifecycle task panicked");
            return TaskOutcome::error(settlement_id, message);
        }
    };

    match session.commit().await {
        Ok(()) => TaskOutcome::success(settlement_id, payload),
        Err(e) => {
            warn!(task, settlement_id = ?settlement_id, error = %e, "Lifecycle commit failed");
            TaskOutcome::error(settlement_id, e.to_string())
        }
    }
}
