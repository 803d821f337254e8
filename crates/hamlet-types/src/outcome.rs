//! The normalized return contract of every task entry point.
//!
//! Whatever runs underneath (current pipeline, legacy fallback, lifecycle
//! service, batch fan-out) the caller only ever sees a [`TaskOutcome`]:
//! a status, the settlement it concerns, and either a typed payload or an
//! error message.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{ResourceCode, TaskStatus};
use crate::ids::{BuildingId, SettlementId, WorldId};

/// Normalized result of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TaskOutcome {
    /// Success or error.
    pub status: TaskStatus,
    /// Settlement the task concerned, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<SettlementId>,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskPayload>,
    /// Message on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskOutcome {
    /// A successful outcome carrying a payload.
    pub const fn success(settlement_id: Option<SettlementId>, result: TaskPayload) -> Self {
        Self {
            status: TaskStatus::Success,
            settlement_id,
            result: Some(result),
            error: None,
        }
    }

    /// A failed outcome carrying a message.
    pub fn error(settlement_id: Option<SettlementId>, message: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Error,
            settlement_id,
            result: None,
            error: Some(message.into()),
        }
    }

    /// Whether the task succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Success)
    }

    /// The error message, if the task failed.
    pub fn message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Typed success payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TaskPayload {
    /// One production/growth cycle for a settlement.
    Cycle(CycleSummary),
    /// A settlement was founded.
    SettlementCreated {
        /// The new settlement.
        settlement_id: SettlementId,
    },
    /// Construction of a building started.
    ConstructionStarted {
        /// The new building.
        building_id: BuildingId,
        /// Its type code.
        building_type: String,
    },
    /// Repair of a building started.
    RepairStarted {
        /// The building under repair.
        building_id: BuildingId,
    },
    /// A batch of settlements was processed.
    Batch(BatchReport),
}

/// What one cycle did to a settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CycleSummary {
    /// Season the cycle ran in.
    pub season: String,
    /// Sites that produced (or were evaluated and stamped) this cycle.
    pub sites_processed: u32,
    /// Sites skipped without mutation (unknown stage, missing type,
    /// already credited for this cycle).
    pub sites_skipped: u32,
    /// Sites that reached the terminal depleted stage this cycle.
    pub sites_depleted: u32,
    /// Total credited per resource code.
    pub produced: BTreeMap<ResourceCode, u64>,
    /// Population change, when the pipeline runs population growth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<PopulationChange>,
    /// Buildings whose construction finished this cycle.
    pub buildings_completed: u32,
    /// Buildings whose repair finished this cycle.
    pub buildings_repaired: u32,
}

impl CycleSummary {
    /// Total quantity credited across all resources.
    pub fn total_produced(&self) -> u64 {
        self.produced
            .values()
            .fold(0_u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Population growth details for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PopulationChange {
    /// Population before the cycle.
    pub previous: u32,
    /// Population after the cycle.
    pub current: u32,
    /// Food in the ledger before consumption.
    pub food_supply: u64,
    /// Food actually consumed.
    pub food_consumed: u64,
    /// Housing capacity the growth was capped at.
    pub housing_capacity: u32,
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BatchReport {
    /// World the batch was scoped to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_id: Option<WorldId>,
    /// Settlements considered.
    pub total: u32,
    /// Settlements whose task succeeded.
    pub processed: u32,
    /// One entry per failed settlement.
    pub failures: Vec<SettlementFailure>,
}

/// Why one settlement in a batch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SettlementFailure {
    /// The failing settlement.
    pub settlement_id: SettlementId,
    /// The task's error message.
    pub message: String,
}
