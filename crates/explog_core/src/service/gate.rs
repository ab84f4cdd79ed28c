//! Access-control and rate-limit gate for ledger mutations.
//!
//! # Invariants
//! - Only an experiment's recorded owner may mutate its steps.
//! - The cooldown applies to step inserts only, keyed off the most recent
//!   successful insert for the same experiment; the first insert is exempt.

use crate::model::experiment::{Experiment, ExperimentId, Principal, Timestamp};
use crate::service::ledger_service::{LedgerError, LedgerResult};

/// Rejects callers other than the experiment owner.
pub fn ensure_owner(experiment: &Experiment, caller: &Principal) -> LedgerResult<()> {
    if experiment.is_owned_by(caller) {
        return Ok(());
    }
    Err(LedgerError::Unauthorized {
        experiment_id: experiment.id,
        caller: caller.clone(),
    })
}

/// Rejects a step insert issued before `cooldown_secs` have elapsed since
/// `last_step_at`.
///
/// A clock reading earlier than `last_step_at` counts as zero elapsed time;
/// the retry hint then covers the regression plus the full cooldown.
pub fn ensure_cooldown_elapsed(
    experiment_id: ExperimentId,
    last_step_at: Option<Timestamp>,
    now: Timestamp,
    cooldown_secs: u64,
) -> LedgerResult<()> {
    let Some(last) = last_step_at else {
        return Ok(());
    };

    let elapsed = now.saturating_sub(last);
    if elapsed >= cooldown_secs {
        return Ok(());
    }
    Err(LedgerError::RateLimited {
        experiment_id,
        retry_after_secs: last.saturating_add(cooldown_secs).saturating_sub(now),
    })
}
