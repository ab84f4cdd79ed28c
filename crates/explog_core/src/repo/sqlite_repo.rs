//! SQLite-backed ledger repository.
//!
//! # Invariants
//! - Every write runs in one transaction; counters and rows move together.
//! - Read paths reject rows that violate persisted invariants instead of
//!   masking them.
//! - The live step index is derived from `steps` ordered by id, which equals
//!   insertion order because ids are allocated monotonically.

use crate::model::experiment::{Experiment, ExperimentId, Principal, Timestamp};
use crate::model::step::{Step, StepDraft, StepId};
use crate::repo::ledger_repo::{LedgerRepository, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const EXPERIMENT_SELECT_SQL: &str = "SELECT
    id,
    owner,
    name,
    created_at,
    exists_flag
FROM experiments";

const STEP_SELECT_SQL: &str = "SELECT
    id,
    experiment_id,
    title,
    content,
    is_encrypted,
    exists_flag
FROM steps";

/// Ledger repository over a migrated SQLite connection.
pub struct SqliteLedgerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerRepository<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn counter(&self, column: &'static str) -> RepoResult<u64> {
        let value: i64 = self.conn.query_row(
            &format!("SELECT {column} FROM ledger_state WHERE id = 1;"),
            [],
            |row| row.get(0),
        )?;
        from_db_int(value, column)
    }
}

impl LedgerRepository for SqliteLedgerRepository<'_> {
    fn experiment_count(&self) -> RepoResult<u64> {
        self.counter("experiment_count")
    }

    fn step_count(&self) -> RepoResult<u64> {
        self.counter("step_count")
    }

    fn insert_experiment(
        &mut self,
        owner: &Principal,
        name: &str,
        created_at: Timestamp,
    ) -> RepoResult<Experiment> {
        let tx = self.conn.unchecked_transaction()?;
        let next_id: i64 = tx.query_row(
            "SELECT experiment_count FROM ledger_state WHERE id = 1;",
            [],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO experiments (id, owner, name, created_at, exists_flag)
             VALUES (?1, ?2, ?3, ?4, 1);",
            params![next_id, owner.as_str(), name, to_db_int(created_at)?],
        )?;
        tx.execute(
            "UPDATE ledger_state SET experiment_count = experiment_count + 1 WHERE id = 1;",
            [],
        )?;
        tx.commit()?;

        Ok(Experiment {
            id: from_db_int(next_id, "experiments.id")?,
            owner: owner.clone(),
            name: name.to_string(),
            created_at,
            exists: true,
        })
    }

    fn get_experiment(&self, id: ExperimentId) -> RepoResult<Option<Experiment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EXPERIMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![to_db_int(id)?])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_experiment_row(row)?));
        }
        Ok(None)
    }

    fn list_experiments(&self) -> RepoResult<Vec<Experiment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EXPERIMENT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut experiments = Vec::new();
        while let Some(row) = rows.next()? {
            experiments.push(parse_experiment_row(row)?);
        }
        Ok(experiments)
    }

    fn last_step_at(&self, experiment_id: ExperimentId) -> RepoResult<Option<Timestamp>> {
        let value: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT last_step_at FROM experiments WHERE id = ?1;",
                params![to_db_int(experiment_id)?],
                |row| row.get(0),
            )
            .optional()?;
        match value.flatten() {
            Some(raw) => Ok(Some(from_db_int(raw, "experiments.last_step_at")?)),
            None => Ok(None),
        }
    }

    fn insert_step(
        &mut self,
        experiment_id: ExperimentId,
        draft: &StepDraft,
        added_at: Timestamp,
    ) -> RepoResult<Step> {
        let db_experiment_id = to_db_int(experiment_id)?;
        let tx = self.conn.unchecked_transaction()?;

        let touched = tx.execute(
            "UPDATE experiments SET last_step_at = ?1 WHERE id = ?2;",
            params![to_db_int(added_at)?, db_experiment_id],
        )?;
        if touched == 0 {
            // Dropping `tx` rolls back.
            return Err(RepoError::ExperimentNotFound(experiment_id));
        }

        let next_id: i64 = tx.query_row(
            "SELECT step_count FROM ledger_state WHERE id = 1;",
            [],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO steps (id, experiment_id, title, content, is_encrypted, exists_flag)
             VALUES (?1, ?2, ?3, ?4, ?5, 1);",
            params![
                next_id,
                db_experiment_id,
                draft.title.as_str(),
                draft.content.as_str(),
                bool_to_int(draft.is_encrypted),
            ],
        )?;
        tx.execute(
            "UPDATE ledger_state SET step_count = step_count + 1 WHERE id = 1;",
            [],
        )?;
        tx.commit()?;

        Ok(Step {
            id: from_db_int(next_id, "steps.id")?,
            experiment_id,
            title: draft.title.clone(),
            content: draft.content.clone(),
            is_encrypted: draft.is_encrypted,
            exists: true,
        })
    }

    fn get_step(&self, id: StepId) -> RepoResult<Option<Step>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STEP_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![to_db_int(id)?])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_step_row(row)?));
        }
        Ok(None)
    }

    fn update_step(&mut self, id: StepId, draft: &StepDraft) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE steps
             SET
                title = ?1,
                content = ?2,
                is_encrypted = ?3
             WHERE id = ?4;",
            params![
                draft.title.as_str(),
                draft.content.as_str(),
                bool_to_int(draft.is_encrypted),
                to_db_int(id)?,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::StepNotFound(id));
        }
        Ok(())
    }

    fn tombstone_step(&mut self, id: StepId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE steps SET exists_flag = 0 WHERE id = ?1;",
            params![to_db_int(id)?],
        )?;

        if changed == 0 {
            return Err(RepoError::StepNotFound(id));
        }
        Ok(())
    }

    fn live_step_ids(&self, experiment_id: ExperimentId) -> RepoResult<Vec<StepId>> {
        let mut stmt = self.conn.prepare(
            "SELECT id
             FROM steps
             WHERE experiment_id = ?1 AND exists_flag = 1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query(params![to_db_int(experiment_id)?])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(from_db_int(row.get("id")?, "steps.id")?);
        }
        Ok(ids)
    }
}

fn parse_experiment_row(row: &Row<'_>) -> RepoResult<Experiment> {
    let owner_text: String = row.get("owner")?;
    let owner = Principal::new(owner_text.clone()).map_err(|_| {
        RepoError::InvalidData(format!("invalid owner `{owner_text}` in experiments.owner"))
    })?;

    Ok(Experiment {
        id: from_db_int(row.get("id")?, "experiments.id")?,
        owner,
        name: row.get("name")?,
        created_at: from_db_int(row.get("created_at")?, "experiments.created_at")?,
        exists: parse_flag(row.get("exists_flag")?, "experiments.exists_flag")?,
    })
}

fn parse_step_row(row: &Row<'_>) -> RepoResult<Step> {
    Ok(Step {
        id: from_db_int(row.get("id")?, "steps.id")?,
        experiment_id: from_db_int(row.get("experiment_id")?, "steps.experiment_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        is_encrypted: parse_flag(row.get("is_encrypted")?, "steps.is_encrypted")?,
        exists: parse_flag(row.get("exists_flag")?, "steps.exists_flag")?,
    })
}

fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn to_db_int(value: u64) -> RepoResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value `{value}` exceeds SQLite integer range")))
}

fn from_db_int(value: i64, column: &str) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("negative value `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
