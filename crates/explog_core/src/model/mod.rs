//! Ledger domain model: experiments, steps, and emitted events.
//!
//! # Responsibility
//! - Define the records stored by every ledger repository.
//! - Own input validation rules shared by all write paths.
//!
//! # Invariants
//! - Experiment and step ids come from monotonic counters and are never reused.
//! - Deletion is represented by the `exists` tombstone, not physical removal.

pub mod event;
pub mod experiment;
pub mod step;
pub mod validation;
