//! Experiment ledger state machine.
//!
//! # Responsibility
//! - Validate, authorize, and rate-limit every mutation before touching
//!   storage.
//! - Append one `LedgerEvent` per successful mutation to the event log.
//! - Project stored records for read callers, hiding tombstones.
//!
//! # Invariants
//! - Calls are serialized by `&mut self`; no mutation is observed half-applied.
//! - Every precondition is checked before the single repository write, so a
//!   rejected call leaves state and event log untouched.
//! - Deleted steps are terminal: reads and writes on them fail `NotFound`.
//! - Logs carry ids, owners and error codes only, never names or content.

use crate::clock::{Clock, SystemClock};
use crate::config::LedgerConfig;
use crate::model::event::LedgerEvent;
use crate::model::experiment::{Experiment, ExperimentId, Principal};
use crate::model::step::{Step, StepDraft, StepId};
use crate::model::validation::{validate_content, validate_name, validate_title, ValidationError};
use crate::repo::ledger_repo::{LedgerRepository, RepoError};
use crate::service::gate::{ensure_cooldown_elapsed, ensure_owner};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Caller-facing rejection category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Unauthorized,
    RateLimited,
    /// Storage transport failure or corrupted persisted state.
    Storage,
}

/// Rejection reason for a ledger operation.
#[derive(Debug)]
pub enum LedgerError {
    InvalidInput(ValidationError),
    ExperimentNotFound(ExperimentId),
    StepNotFound(StepId),
    Unauthorized {
        experiment_id: ExperimentId,
        caller: Principal,
    },
    RateLimited {
        experiment_id: ExperimentId,
        retry_after_secs: u64,
    },
    Repo(RepoError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::ExperimentNotFound(_) | Self::StepNotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }

    /// Stable snake_case code used in log lines.
    pub fn code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Storage => "storage",
        }
    }
}

impl Display for LedgerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::ExperimentNotFound(id) => write!(f, "experiment does not exist: {id}"),
            Self::StepNotFound(id) => write!(f, "step does not exist: {id}"),
            Self::Unauthorized {
                experiment_id,
                caller,
            } => write!(
                f,
                "caller {caller} is not the owner of experiment {experiment_id}"
            ),
            Self::RateLimited {
                experiment_id,
                retry_after_secs,
            } => write!(
                f,
                "step creation rate limited for experiment {experiment_id}; retry in {retry_after_secs}s"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LedgerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LedgerError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<RepoError> for LedgerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ExperimentNotFound(id) => Self::ExperimentNotFound(id),
            RepoError::StepNotFound(id) => Self::StepNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Experiment ledger over a repository and a host clock.
pub struct LedgerService<R: LedgerRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    config: LedgerConfig,
    events: Vec<LedgerEvent>,
}

impl<R: LedgerRepository> LedgerService<R, SystemClock> {
    /// Creates a ledger stamped by wall-clock time.
    pub fn new(repo: R, config: LedgerConfig) -> Self {
        Self::with_clock(repo, SystemClock, config)
    }
}

impl<R: LedgerRepository, C: Clock> LedgerService<R, C> {
    pub fn with_clock(repo: R, clock: C, config: LedgerConfig) -> Self {
        Self {
            repo,
            clock,
            config,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Events emitted since construction or the last `take_events`, oldest
    /// first.
    ///
    /// At most `max_buffered_events` are kept; callers that need every event
    /// must drain with `take_events` before the buffer fills.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    fn record(&mut self, event: LedgerEvent) {
        self.events.push(event);
        let excess = self
            .events
            .len()
            .saturating_sub(self.config.max_buffered_events);
        if excess > 0 {
            self.events.drain(..excess);
            warn!(
                "event=event_log_overflow module=ledger status=dropped dropped={excess} capacity={}",
                self.config.max_buffered_events
            );
        }
    }

    /// Creates an experiment owned by `caller`.
    ///
    /// # Errors
    /// - `InvalidInput` when the name is shorter than 3 chars after trimming or
    ///   longer than 100 chars as given.
    pub fn create_experiment(
        &mut self,
        caller: &Principal,
        name: &str,
    ) -> LedgerResult<ExperimentId> {
        let result = self.try_create_experiment(caller, name);
        match &result {
            Ok(id) => info!(
                "event=experiment_create module=ledger status=ok experiment_id={id} owner={caller}"
            ),
            Err(err) => log_rejection("experiment_create", caller, err),
        }
        result
    }

    fn try_create_experiment(
        &mut self,
        caller: &Principal,
        name: &str,
    ) -> LedgerResult<ExperimentId> {
        validate_name(name)?;

        let experiment = self
            .repo
            .insert_experiment(caller, name, self.clock.now())?;
        self.record(LedgerEvent::ExperimentCreated {
            experiment_id: experiment.id,
            owner: experiment.owner,
            name: experiment.name,
            created_at: experiment.created_at,
        });
        Ok(experiment.id)
    }

    /// Appends a step to an experiment owned by `caller`.
    ///
    /// Checks run in order and the first failure wins: experiment exists,
    /// caller owns it, cooldown elapsed, title bounds, content bounds.
    pub fn add_step(
        &mut self,
        caller: &Principal,
        experiment_id: ExperimentId,
        draft: &StepDraft,
    ) -> LedgerResult<StepId> {
        let result = self.try_add_step(caller, experiment_id, draft);
        match &result {
            Ok(step_id) => info!(
                "event=step_add module=ledger status=ok step_id={step_id} experiment_id={experiment_id} encrypted={}",
                draft.is_encrypted
            ),
            Err(err) => log_rejection("step_add", caller, err),
        }
        result
    }

    fn try_add_step(
        &mut self,
        caller: &Principal,
        experiment_id: ExperimentId,
        draft: &StepDraft,
    ) -> LedgerResult<StepId> {
        let experiment = self.live_experiment(experiment_id)?;
        ensure_owner(&experiment, caller)?;

        let now = self.clock.now();
        ensure_cooldown_elapsed(
            experiment_id,
            self.repo.last_step_at(experiment_id)?,
            now,
            self.config.step_cooldown_secs,
        )?;
        validate_title(&draft.title)?;
        validate_content(&draft.content)?;

        let step = self.repo.insert_step(experiment_id, draft, now)?;
        self.record(LedgerEvent::StepAdded {
            step_id: step.id,
            experiment_id,
            title: step.title,
            is_encrypted: step.is_encrypted,
        });
        Ok(step.id)
    }

    /// Overwrites title, content and encryption flag of a live step.
    ///
    /// Not rate limited. `id` and `experiment_id` never change.
    pub fn update_step(
        &mut self,
        caller: &Principal,
        step_id: StepId,
        draft: &StepDraft,
    ) -> LedgerResult<()> {
        let result = self.try_update_step(caller, step_id, draft);
        match &result {
            Ok(()) => info!(
                "event=step_update module=ledger status=ok step_id={step_id} encrypted={}",
                draft.is_encrypted
            ),
            Err(err) => log_rejection("step_update", caller, err),
        }
        result
    }

    fn try_update_step(
        &mut self,
        caller: &Principal,
        step_id: StepId,
        draft: &StepDraft,
    ) -> LedgerResult<()> {
        let step = self.live_step(step_id)?;
        let experiment = self.parent_experiment(&step)?;
        ensure_owner(&experiment, caller)?;
        validate_title(&draft.title)?;
        validate_content(&draft.content)?;

        self.repo.update_step(step_id, draft)?;
        self.record(LedgerEvent::StepUpdated {
            step_id,
            experiment_id: step.experiment_id,
            is_encrypted: draft.is_encrypted,
        });
        Ok(())
    }

    /// Flips the encryption flag of a live step, keeping title and content.
    ///
    /// Goes through `update_step`, so it emits `StepUpdated`. Returns the new
    /// flag value.
    pub fn toggle_step_encryption(
        &mut self,
        caller: &Principal,
        step_id: StepId,
    ) -> LedgerResult<bool> {
        let step = match self.live_step(step_id) {
            Ok(step) => step,
            Err(err) => {
                log_rejection("step_update", caller, &err);
                return Err(err);
            }
        };
        let draft = StepDraft::new(step.title, step.content, !step.is_encrypted);
        self.update_step(caller, step_id, &draft)?;
        Ok(draft.is_encrypted)
    }

    /// Tombstones a live step and drops it from its experiment's index.
    pub fn delete_step(&mut self, caller: &Principal, step_id: StepId) -> LedgerResult<()> {
        let result = self.try_delete_step(caller, step_id);
        match &result {
            Ok(()) => info!("event=step_delete module=ledger status=ok step_id={step_id}"),
            Err(err) => log_rejection("step_delete", caller, err),
        }
        result
    }

    fn try_delete_step(&mut self, caller: &Principal, step_id: StepId) -> LedgerResult<()> {
        let step = self.live_step(step_id)?;
        let experiment = self.parent_experiment(&step)?;
        ensure_owner(&experiment, caller)?;

        self.repo.tombstone_step(step_id)?;
        self.record(LedgerEvent::StepDeleted {
            step_id,
            experiment_id: step.experiment_id,
        });
        Ok(())
    }

    /// Reads one live experiment.
    pub fn get_experiment(&self, experiment_id: ExperimentId) -> LedgerResult<Experiment> {
        self.live_experiment(experiment_id)
    }

    /// Reads one live step.
    pub fn get_step(&self, step_id: StepId) -> LedgerResult<Step> {
        self.live_step(step_id)
    }

    /// Reads several steps in request order; any missing or deleted id fails
    /// the whole call.
    pub fn get_steps_batch(&self, step_ids: &[StepId]) -> LedgerResult<Vec<Step>> {
        step_ids.iter().map(|id| self.live_step(*id)).collect()
    }

    /// Live step ids of an experiment in insertion order, deletions removed.
    pub fn get_experiment_step_ids(
        &self,
        experiment_id: ExperimentId,
    ) -> LedgerResult<Vec<StepId>> {
        self.live_experiment(experiment_id)?;
        Ok(self.repo.live_step_ids(experiment_id)?)
    }

    /// Full step records for `get_experiment_step_ids`, same order.
    pub fn get_experiment_steps(&self, experiment_id: ExperimentId) -> LedgerResult<Vec<Step>> {
        let ids = self.get_experiment_step_ids(experiment_id)?;
        ids.into_iter()
            .map(|id| {
                self.repo.get_step(id)?.ok_or_else(|| {
                    LedgerError::Repo(RepoError::InvalidData(format!(
                        "step index of experiment {experiment_id} references missing step {id}"
                    )))
                })
            })
            .collect()
    }

    /// Live experiments owned by `owner`, in id order.
    pub fn list_experiments_by_owner(&self, owner: &Principal) -> LedgerResult<Vec<Experiment>> {
        Ok(self
            .repo
            .list_experiments()?
            .into_iter()
            .filter(|experiment| experiment.exists && experiment.is_owned_by(owner))
            .collect())
    }

    /// Experiment ids allocated so far.
    pub fn experiment_count(&self) -> LedgerResult<u64> {
        Ok(self.repo.experiment_count()?)
    }

    /// Step ids allocated so far; deletions do not lower it.
    pub fn step_count(&self) -> LedgerResult<u64> {
        Ok(self.repo.step_count()?)
    }

    fn live_experiment(&self, experiment_id: ExperimentId) -> LedgerResult<Experiment> {
        self.repo
            .get_experiment(experiment_id)?
            .filter(|experiment| experiment.exists)
            .ok_or(LedgerError::ExperimentNotFound(experiment_id))
    }

    fn live_step(&self, step_id: StepId) -> LedgerResult<Step> {
        self.repo
            .get_step(step_id)?
            .filter(|step| step.exists)
            .ok_or(LedgerError::StepNotFound(step_id))
    }

    fn parent_experiment(&self, step: &Step) -> LedgerResult<Experiment> {
        self.repo.get_experiment(step.experiment_id)?.ok_or_else(|| {
            LedgerError::Repo(RepoError::InvalidData(format!(
                "step {} references missing experiment {}",
                step.id, step.experiment_id
            )))
        })
    }
}

fn log_rejection(operation: &str, caller: &Principal, err: &LedgerError) {
    match err.kind() {
        ErrorKind::Storage => error!(
            "event={operation} module=ledger status=error caller={caller} error_code={} error={err}",
            err.code()
        ),
        _ => warn!(
            "event={operation} module=ledger status=rejected caller={caller} error_code={}",
            err.code()
        ),
    }
}
