//! Core ledger for experiment notebooks.
//! This crate is the single source of truth for ledger invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    ConfigError, LedgerConfig, DEFAULT_MAX_BUFFERED_EVENTS, DEFAULT_STEP_COOLDOWN_SECS,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::event::LedgerEvent;
pub use model::experiment::{Experiment, ExperimentId, Principal, Timestamp};
pub use model::step::{Step, StepDraft, StepId};
pub use model::validation::ValidationError;
pub use repo::ledger_repo::{LedgerRepository, RepoError, RepoResult};
pub use repo::memory_repo::InMemoryLedgerRepository;
pub use repo::sqlite_repo::SqliteLedgerRepository;
pub use service::ledger_service::{ErrorKind, LedgerError, LedgerResult, LedgerService};

/// Minimal health-check API for callers probing the linkage.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
