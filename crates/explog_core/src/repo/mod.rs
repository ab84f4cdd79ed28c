//! Ledger storage contracts and implementations.
//!
//! # Responsibility
//! - Define the storage contract the ledger service drives.
//! - Keep SQL and in-process map details out of the state machine.
//!
//! # Invariants
//! - Repositories allocate ids; callers never choose them.
//! - Each write method is all-or-nothing.
//! - Repositories store and return records; they do not apply ownership,
//!   cooldown, or length rules.

pub mod ledger_repo;
pub mod memory_repo;
pub mod sqlite_repo;
