//! Experiment records and caller identity.
//!
//! # Invariants
//! - `owner` is fixed at creation; no operation transfers ownership.
//! - No exposed operation tombstones an experiment, so `exists` stays `true`
//!   for every allocated id.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Sequential experiment identifier, allocated from 0.
pub type ExperimentId = u64;

/// Host clock reading in seconds (block-time analogue).
pub type Timestamp = u64;

/// Opaque caller identity (account address or similar).
///
/// Compared by exact string equality; the ledger never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Wraps a caller identity, rejecting blank values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::BlankPrincipal);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Principal {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.0
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named container of steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: ExperimentId,
    pub owner: Principal,
    pub name: String,
    pub created_at: Timestamp,
    pub exists: bool,
}

impl Experiment {
    /// Returns whether `caller` may mutate steps under this experiment.
    pub fn is_owned_by(&self, caller: &Principal) -> bool {
        &self.owner == caller
    }
}
