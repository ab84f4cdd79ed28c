//! Ledger schema scripts.
//!
//! Script `n` in `SCRIPTS` upgrades the schema from version `n` to `n + 1`.
//! Pending scripts run in a single transaction.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

const SCRIPTS: &[&str] = &[include_str!("0001_ledger.sql")];

/// Schema version written by this build.
pub const SCHEMA_VERSION: u32 = SCRIPTS.len() as u32;

/// Reads the schema version recorded in `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Upgrades `conn` to `SCHEMA_VERSION` and checks the counter row.
pub fn migrate(conn: &mut Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    if found > SCHEMA_VERSION {
        return Err(DbError::SchemaTooNew {
            found,
            supported: SCHEMA_VERSION,
        });
    }

    if found < SCHEMA_VERSION {
        let tx = conn.transaction()?;
        for (index, script) in SCRIPTS.iter().enumerate().skip(found as usize) {
            let version = index as u32 + 1;
            tx.execute_batch(script)
                .map_err(|source| DbError::Migration { version, source })?;
            tx.pragma_update(None, "user_version", version)?;
        }
        tx.commit()?;
        info!(
            "event=db_migrate module=db status=ok from_version={found} to_version={SCHEMA_VERSION}"
        );
    }

    ensure_ledger_state(conn)
}

fn ensure_ledger_state(conn: &Connection) -> DbResult<()> {
    let rows: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ledger_state WHERE id = 1;",
        [],
        |row| row.get(0),
    )?;
    if rows == 1 {
        Ok(())
    } else {
        Err(DbError::MissingLedgerState)
    }
}
