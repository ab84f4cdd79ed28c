//! Step records.
//!
//! # Invariants
//! - `id` is unique across the whole ledger, not per experiment.
//! - `experiment_id` never changes after creation.
//! - A tombstoned step (`exists == false`) is terminal.

use crate::model::experiment::ExperimentId;
use serde::{Deserialize, Serialize};

/// Sequential step identifier, allocated from 0 across all experiments.
pub type StepId = u64;

/// Ordered entry within an experiment.
///
/// `content` is an opaque payload; when `is_encrypted` is set the caller is
/// asserting it holds ciphertext, the ledger does not check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    pub experiment_id: ExperimentId,
    pub title: String,
    pub content: String,
    pub is_encrypted: bool,
    pub exists: bool,
}

/// Caller-supplied step fields for add/update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDraft {
    pub title: String,
    pub content: String,
    pub is_encrypted: bool,
}

impl StepDraft {
    pub fn new(title: impl Into<String>, content: impl Into<String>, is_encrypted: bool) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            is_encrypted,
        }
    }
}

impl Step {
    /// Overwrites mutable fields in place; identity and tombstone are kept.
    pub fn apply(&mut self, draft: &StepDraft) {
        self.title = draft.title.clone();
        self.content = draft.content.clone();
        self.is_encrypted = draft.is_encrypted;
    }

    /// Marks this step as deleted.
    pub fn tombstone(&mut self) {
        self.exists = false;
    }
}
