use ed25519_dalek::SigningKey;
use std::fmt;
use tracing::{info, warn};

use crate::chain::Blockchain;
use crate::crypto;
use crate::error::{LedgerError, Result};
use crate::pool::TransactionPool;
use crate::transaction::Transaction;

/// A keypair plus a cached balance. The signing key never leaves the wallet.
pub struct Wallet {
    key: SigningKey,
    public_key: String,
    balance: u64,
}

impl Wallet {
    pub fn new(initial_balance: u64) -> Self {
        let key = crypto::generate_keypair();
        let public_key = crypto::address_of(&key);
        Self {
            key,
            public_key,
            balance: initial_balance,
        }
    }

    /// Wallet that signs miner rewards. It is an ordinary local keypair: any
    /// node can produce one, so rewards carry no authority beyond convention.
    pub fn issuing(initial_balance: u64) -> Self {
        Self::new(initial_balance)
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Cached balance, refreshed by [`Wallet::create_transaction`].
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn sign(&self, digest: &str) -> String {
        crypto::sign(&self.key, digest)
    }

    /// Send `amount` to `recipient`. Folds into this wallet's pending
    /// transaction when the pool already holds one, otherwise admits a new one.
    pub fn create_transaction(
        &mut self,
        recipient: &str,
        amount: u64,
        chain: &Blockchain,
        pool: &mut TransactionPool,
    ) -> Result<Transaction> {
        self.balance = self.calculate_balance(chain);

        if amount > self.balance {
            warn!("Amount {amount} exceeds current balance {}", self.balance);
            return Err(LedgerError::InsufficientBalance {
                amount,
                balance: self.balance,
            });
        }

        let transaction = match pool.find_by_sender(&self.public_key) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.update(self, recipient, amount)?;
                updated
            }
            None => Transaction::new_transaction(self, recipient, amount)?,
        };
        pool.admit_or_replace(transaction.clone());
        info!("Wallet {} queued transaction {}", short(&self.public_key), transaction.id);
        Ok(transaction)
    }

    /// Balance derived from mined history: the change output of this wallet's
    /// latest mined transaction (or the cached balance if it never sent one),
    /// plus every output paid to it by transactions signed after that point.
    pub fn calculate_balance(&self, chain: &Blockchain) -> u64 {
        let transactions: Vec<&Transaction> = chain.transactions().collect();

        let latest_sent = transactions
            .iter()
            .filter(|t| t.input.address == self.public_key)
            .max_by_key(|t| t.input.timestamp);

        let (mut balance, since) = match latest_sent {
            Some(t) => (
                t.output_for(&self.public_key).map_or(0, |o| o.amount),
                t.input.timestamp,
            ),
            None => (self.balance, 0),
        };

        for t in transactions.iter().filter(|t| t.input.timestamp > since) {
            match t.amount_to(&self.public_key) {
                Some(amount) => balance = balance.saturating_add(amount),
                None => warn!("Skipping transaction {} with overflowing outputs", t.id),
            }
        }
        balance
    }
}

fn short(key: &str) -> &str {
    key.get(..12).unwrap_or(key)
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("public_key", &self.public_key)
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Wallet - public key: {}, balance: {}", self.public_key, self.balance)
    }
}
