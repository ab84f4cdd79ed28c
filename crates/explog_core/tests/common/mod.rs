#![allow(dead_code, unused_macros)]

use explog_core::{LedgerConfig, ManualClock, Principal, StepDraft};

pub const START: u64 = 1_700_000_000;
pub const COOLDOWN: u64 = 60;

pub fn config() -> LedgerConfig {
    LedgerConfig::default().with_step_cooldown_secs(COOLDOWN)
}

pub fn clock() -> ManualClock {
    ManualClock::starting_at(START)
}

pub fn owner() -> Principal {
    Principal::new("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()
}

pub fn stranger() -> Principal {
    Principal::new("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC").unwrap()
}

pub fn draft(title: &str, content: &str) -> StepDraft {
    StepDraft::new(title, content, false)
}

/// Runs each listed generic test body against the in-memory and SQLite
/// repositories. Bodies take `(LedgerService<R, ManualClock>, ManualClock)`.
macro_rules! on_both_backends {
    ($($name:ident),* $(,)?) => {
        mod memory {
            $(
                #[test]
                fn $name() {
                    let clock = $crate::common::clock();
                    let ledger = explog_core::LedgerService::with_clock(
                        explog_core::InMemoryLedgerRepository::new(),
                        clock.clone(),
                        $crate::common::config(),
                    );
                    super::$name(ledger, clock);
                }
            )*
        }

        mod sqlite {
            $(
                #[test]
                fn $name() {
                    let conn = explog_core::db::open_db_in_memory().unwrap();
                    let clock = $crate::common::clock();
                    let ledger = explog_core::LedgerService::with_clock(
                        explog_core::SqliteLedgerRepository::new(&conn),
                        clock.clone(),
                        $crate::common::config(),
                    );
                    super::$name(ledger, clock);
                }
            )*
        }
    };
}
