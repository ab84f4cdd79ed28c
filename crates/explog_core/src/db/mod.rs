//! SQLite persistence for ledgers.
//!
//! # Responsibility
//! - Open connections backing `SqliteLedgerRepository`.
//! - Bring the ledger schema up to date before any ledger row is touched.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - A returned connection always holds exactly one `ledger_state` row.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating a ledger database.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// The file was written by a newer build of the ledger.
    SchemaTooNew { found: u32, supported: u32 },
    /// A migration script failed; none of the pending scripts were committed.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The schema is current but the counter row is gone.
    MissingLedgerState,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "ledger file has schema {found}; this build reads up to {supported}"
            ),
            Self::Migration { version, source } => {
                write!(f, "ledger migration {version} failed: {source}")
            }
            Self::MissingLedgerState => write!(f, "ledger counters row is missing"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } | Self::MissingLedgerState => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
