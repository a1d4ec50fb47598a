use tracing::warn;

use crate::transaction::Transaction;

/// Pending transactions awaiting a block, in admission order.
#[derive(Clone, Debug, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending transaction with the same id in place, or append.
    pub fn admit_or_replace(&mut self, transaction: Transaction) {
        match self.transactions.iter_mut().find(|t| t.id == transaction.id) {
            Some(slot) => *slot = transaction,
            None => self.transactions.push(transaction),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn find_by_sender(&self, address: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.input.address == address)
    }

    /// Transactions whose outputs add up to their input and whose signature
    /// verifies. Rejected ones stay pooled until the next block settles them.
    pub fn valid_transactions(&self) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| is_valid(t))
            .cloned()
            .collect()
    }

    /// Drop what a newly mined block settles: entries it holds verbatim and
    /// entries that can never be mined. A pending entry whose id was mined in
    /// an earlier form is removed too and handed back to the caller.
    pub fn settle(&mut self, mined: &[Transaction]) -> Vec<Transaction> {
        let mut superseded = Vec::new();
        self.transactions
            .retain(|t| match mined.iter().find(|m| m.id == t.id) {
                Some(m) => {
                    if m != t {
                        superseded.push(t.clone());
                    }
                    false
                }
                None => is_valid(t),
            });
        superseded
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn clear(&mut self) {
        self.transactions.clear();
    }
}

fn is_valid(t: &Transaction) -> bool {
    if t.output_total() != Some(t.input.amount) {
        warn!("Invalid transaction from {}", t.input.address);
        return false;
    }
    if !t.verify() {
        warn!("Invalid signature from {}", t.input.address);
        return false;
    }
    true
}
