use ledger_core::{Ledger, LedgerConfig};
use std::{thread::sleep, time::Duration};

/// Difficulty drops to zero after the first block, so tests mine instantly.
pub fn quick_config() -> LedgerConfig {
    LedgerConfig {
        difficulty: 1,
        mine_rate_ms: 1,
        ..LedgerConfig::default()
    }
}

pub fn quick_ledger() -> Ledger {
    Ledger::new(quick_config())
}

/// Separates input timestamps of consecutive transactions.
pub fn tick() {
    sleep(Duration::from_millis(2));
}
