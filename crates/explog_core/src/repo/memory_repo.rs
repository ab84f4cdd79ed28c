//! In-process ledger store.
//!
//! Two counters, two keyed maps, and per-experiment step-id lists. The
//! whole ledger lives in one owned value passed to the service.

use crate::model::experiment::{Experiment, ExperimentId, Principal, Timestamp};
use crate::model::step::{Step, StepDraft, StepId};
use crate::repo::ledger_repo::{LedgerRepository, RepoError, RepoResult};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct InMemoryLedgerRepository {
    experiment_count: u64,
    step_count: u64,
    experiments: BTreeMap<ExperimentId, Experiment>,
    steps: BTreeMap<StepId, Step>,
    step_index: HashMap<ExperimentId, Vec<StepId>>,
    last_step_at: HashMap<ExperimentId, Timestamp>,
}

impl InMemoryLedgerRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerRepository for InMemoryLedgerRepository {
    fn experiment_count(&self) -> RepoResult<u64> {
        Ok(self.experiment_count)
    }

    fn step_count(&self) -> RepoResult<u64> {
        Ok(self.step_count)
    }

    fn insert_experiment(
        &mut self,
        owner: &Principal,
        name: &str,
        created_at: Timestamp,
    ) -> RepoResult<Experiment> {
        let experiment = Experiment {
            id: self.experiment_count,
            owner: owner.clone(),
            name: name.to_string(),
            created_at,
            exists: true,
        };
        self.experiments.insert(experiment.id, experiment.clone());
        self.experiment_count += 1;
        Ok(experiment)
    }

    fn get_experiment(&self, id: ExperimentId) -> RepoResult<Option<Experiment>> {
        Ok(self.experiments.get(&id).cloned())
    }

    fn list_experiments(&self) -> RepoResult<Vec<Experiment>> {
        Ok(self.experiments.values().cloned().collect())
    }

    fn last_step_at(&self, experiment_id: ExperimentId) -> RepoResult<Option<Timestamp>> {
        Ok(self.last_step_at.get(&experiment_id).copied())
    }

    fn insert_step(
        &mut self,
        experiment_id: ExperimentId,
        draft: &StepDraft,
        added_at: Timestamp,
    ) -> RepoResult<Step> {
        if !self.experiments.contains_key(&experiment_id) {
            return Err(RepoError::ExperimentNotFound(experiment_id));
        }

        let step = Step {
            id: self.step_count,
            experiment_id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            is_encrypted: draft.is_encrypted,
            exists: true,
        };
        self.steps.insert(step.id, step.clone());
        self.step_index
            .entry(experiment_id)
            .or_default()
            .push(step.id);
        self.last_step_at.insert(experiment_id, added_at);
        self.step_count += 1;
        Ok(step)
    }

    fn get_step(&self, id: StepId) -> RepoResult<Option<Step>> {
        Ok(self.steps.get(&id).cloned())
    }

    fn update_step(&mut self, id: StepId, draft: &StepDraft) -> RepoResult<()> {
        let step = self.steps.get_mut(&id).ok_or(RepoError::StepNotFound(id))?;
        step.apply(draft);
        Ok(())
    }

    fn tombstone_step(&mut self, id: StepId) -> RepoResult<()> {
        let step = self.steps.get_mut(&id).ok_or(RepoError::StepNotFound(id))?;
        step.tombstone();
        if let Some(ids) = self.step_index.get_mut(&step.experiment_id) {
            // Ordered shrink: surviving ids keep their relative order.
            ids.retain(|candidate| *candidate != id);
        }
        Ok(())
    }

    fn live_step_ids(&self, experiment_id: ExperimentId) -> RepoResult<Vec<StepId>> {
        Ok(self
            .step_index
            .get(&experiment_id)
            .cloned()
            .unwrap_or_default())
    }
}
