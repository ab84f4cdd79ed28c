//! Ledger use-case services.
//!
//! # Responsibility
//! - Run the ledger state machine over a repository implementation.
//! - Keep CLI/client callers decoupled from storage details.

pub mod gate;
pub mod ledger_service;
