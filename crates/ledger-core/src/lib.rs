//! Core of a minimal proof-of-work cryptocurrency: blocks and the chain's
//! consensus rules, signed transactions, wallets with history-derived
//! balances, and the pending transaction pool.
pub mod block;
pub mod chain;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod ledger;
pub mod mine;
pub mod pool;
pub mod transaction;
pub mod wallet;

pub use block::{Block, BlockData};
pub use chain::Blockchain;
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{Gossip, Ledger, NoGossip};
pub use pool::TransactionPool;
pub use transaction::{Input, Output, Transaction};
pub use wallet::Wallet;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch; zero if the clock reads before it.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
