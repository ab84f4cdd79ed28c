//! Events emitted by successful ledger mutations.

use crate::model::experiment::{ExperimentId, Principal, Timestamp};
use crate::model::step::StepId;
use serde::{Deserialize, Serialize};

/// One observer notification per successful mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all_fields = "camelCase")]
pub enum LedgerEvent {
    ExperimentCreated {
        experiment_id: ExperimentId,
        owner: Principal,
        name: String,
        created_at: Timestamp,
    },
    StepAdded {
        step_id: StepId,
        experiment_id: ExperimentId,
        title: String,
        is_encrypted: bool,
    },
    StepUpdated {
        step_id: StepId,
        experiment_id: ExperimentId,
        is_encrypted: bool,
    },
    StepDeleted {
        step_id: StepId,
        experiment_id: ExperimentId,
    },
}

impl LedgerEvent {
    /// Stable event name, matching the serialized `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ExperimentCreated { .. } => "ExperimentCreated",
            Self::StepAdded { .. } => "StepAdded",
            Self::StepUpdated { .. } => "StepUpdated",
            Self::StepDeleted { .. } => "StepDeleted",
        }
    }

    /// Experiment the event belongs to.
    pub fn experiment_id(&self) -> ExperimentId {
        match self {
            Self::ExperimentCreated { experiment_id, .. }
            | Self::StepAdded { experiment_id, .. }
            | Self::StepUpdated { experiment_id, .. }
            | Self::StepDeleted { experiment_id, .. } => *experiment_id,
        }
    }
}
