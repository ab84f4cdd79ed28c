//! Ledger repository contract and shared error type.

use crate::db::DbError;
use crate::model::experiment::{Experiment, ExperimentId, Principal, Timestamp};
use crate::model::step::{Step, StepDraft, StepId};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage-level error for ledger persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    ExperimentNotFound(ExperimentId),
    StepNotFound(StepId),
    /// Persisted state violates a ledger invariant.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ExperimentNotFound(id) => write!(f, "experiment not found: {id}"),
            Self::StepNotFound(id) => write!(f, "step not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted ledger data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage operations behind the ledger state machine.
///
/// Reads return tombstoned records too; the service decides visibility.
pub trait LedgerRepository {
    /// Number of experiment ids allocated so far.
    fn experiment_count(&self) -> RepoResult<u64>;
    /// Number of step ids allocated so far, deletions included.
    fn step_count(&self) -> RepoResult<u64>;

    /// Allocates the next experiment id and stores a live experiment.
    fn insert_experiment(
        &mut self,
        owner: &Principal,
        name: &str,
        created_at: Timestamp,
    ) -> RepoResult<Experiment>;
    fn get_experiment(&self, id: ExperimentId) -> RepoResult<Option<Experiment>>;
    /// All experiments in id order.
    fn list_experiments(&self) -> RepoResult<Vec<Experiment>>;
    /// Time of the most recent successful step insert for `experiment_id`.
    fn last_step_at(&self, experiment_id: ExperimentId) -> RepoResult<Option<Timestamp>>;

    /// Allocates the next step id, stores the step, appends it to the
    /// experiment's index, and records `added_at` as its last-step time.
    fn insert_step(
        &mut self,
        experiment_id: ExperimentId,
        draft: &StepDraft,
        added_at: Timestamp,
    ) -> RepoResult<Step>;
    fn get_step(&self, id: StepId) -> RepoResult<Option<Step>>;
    /// Overwrites title, content and encryption flag in place.
    fn update_step(&mut self, id: StepId, draft: &StepDraft) -> RepoResult<()>;
    /// Marks the step deleted and drops it from its experiment's index,
    /// preserving the order of the remaining ids.
    fn tombstone_step(&mut self, id: StepId) -> RepoResult<()>;
    /// Live step ids for one experiment, in insertion order.
    fn live_step_ids(&self, experiment_id: ExperimentId) -> RepoResult<Vec<StepId>>;
}
