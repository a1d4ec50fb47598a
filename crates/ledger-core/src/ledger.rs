//! A node's whole mutable state and the mining sequence that ties it together.
use tracing::{info, warn};

use crate::block::{Block, BlockData};
use crate::chain::Blockchain;
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::pool::TransactionPool;
use crate::transaction::Transaction;
use crate::wallet::Wallet;

/// Where the ledger announces its changes. Delivery is best effort.
pub trait Gossip {
    fn broadcast_chain(&self, chain: &[Block]);
    fn broadcast_transaction(&self, transaction: &Transaction);
    fn broadcast_clear_transactions(&self);
}

/// For a node with no peers.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoGossip;

impl Gossip for NoGossip {
    fn broadcast_chain(&self, _chain: &[Block]) {}
    fn broadcast_transaction(&self, _transaction: &Transaction) {}
    fn broadcast_clear_transactions(&self) {}
}

/// Chain, pool and wallet of one node. Owned by a single writer.
#[derive(Debug)]
pub struct Ledger {
    pub chain: Blockchain,
    pub pool: TransactionPool,
    pub wallet: Wallet,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            chain: Blockchain::new(config),
            pool: TransactionPool::new(),
            wallet: Wallet::new(config.initial_balance),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        self.chain.config()
    }

    pub fn balance(&self) -> u64 {
        self.wallet.calculate_balance(&self.chain)
    }

    /// Create (or extend) this node's pending transfer and announce it.
    pub fn transact(&mut self, recipient: &str, amount: u64, gossip: &impl Gossip) -> Result<Transaction> {
        let transaction = self
            .wallet
            .create_transaction(recipient, amount, &self.chain, &mut self.pool)?;
        gossip.broadcast_transaction(&transaction);
        Ok(transaction)
    }

    /// Mine an opaque payload on the tip and announce the new chain.
    pub fn add_block(&mut self, data: impl Into<BlockData>, gossip: &impl Gossip) -> Block {
        let block = self.chain.add_block(data);
        info!("New block added: {block}");
        gossip.broadcast_chain(self.chain.blocks());
        block
    }

    /// The valid pooled transactions followed by this node's reward.
    pub fn block_template(&self) -> Result<Vec<Transaction>> {
        let mut transactions = self.pool.valid_transactions();
        let issuer = Wallet::issuing(self.config().initial_balance);
        transactions.push(Transaction::reward_transaction(
            &self.wallet,
            &issuer,
            self.config().mining_reward,
        )?);
        Ok(transactions)
    }

    /// Mine the pool into a block, blocking until the proof of work is found,
    /// then publish it and clear the pool locally and on every peer.
    pub fn mine(&mut self, gossip: &impl Gossip) -> Result<Block> {
        let transactions = self.block_template()?;
        let block = self.chain.add_block(transactions);
        self.publish(gossip);
        Ok(block)
    }

    /// Append a payload block mined off-thread and announce the new chain.
    pub fn commit_block(&mut self, block: Block, gossip: &impl Gossip) -> Result<()> {
        self.chain.append_mined(block)?;
        info!("New block added: {}", self.chain.last());
        gossip.broadcast_chain(self.chain.blocks());
        Ok(())
    }

    /// Accept a pool block mined off-thread against the current tip and
    /// publish it the way [`Ledger::mine`] does. Transactions pooled while the
    /// block was being searched for stay pending and are re-announced.
    pub fn commit_mined(&mut self, block: Block, gossip: &impl Gossip) -> Result<()> {
        self.chain.append_mined(block)?;
        self.publish(gossip);
        Ok(())
    }

    fn publish(&mut self, gossip: &impl Gossip) {
        info!("New block has been added: {}", self.chain.last());
        gossip.broadcast_chain(self.chain.blocks());

        let mined = self.chain.last().transactions().to_vec();
        let superseded = self.pool.settle(&mined);
        gossip.broadcast_clear_transactions();
        for pending in &superseded {
            self.requeue(pending, &mined);
        }
        for pending in self.pool.transactions() {
            gossip.broadcast_transaction(pending);
        }
    }

    /// Re-create the transfers this wallet folded into a transaction after an
    /// earlier copy of it went into the block. Other senders resubmit their own.
    fn requeue(&mut self, pending: &Transaction, mined: &[Transaction]) {
        if pending.input.address != self.wallet.public_key() {
            warn!("Dropping transaction {} superseded by its mined copy", pending.id);
            return;
        }
        let settled = mined
            .iter()
            .find(|m| m.id == pending.id)
            .map_or(0, |m| m.outputs.len());
        for output in pending.outputs.iter().skip(settled) {
            if let Err(err) =
                self.wallet
                    .create_transaction(&output.address, output.amount, &self.chain, &mut self.pool)
            {
                warn!("Could not requeue transfer to {}: {err}", output.address);
            }
        }
    }
}
