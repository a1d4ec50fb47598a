//! The consensus engine: extending the local chain by proof of work and
//! adopting a peer's chain when it is strictly longer and fully valid.
use std::sync::atomic::AtomicBool;
use tracing::{info, warn};

use crate::block::{meets_difficulty, Block, BlockData};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::mine::{mine_block, mine_block_parallel};
use crate::transaction::Transaction;

#[derive(Clone, Debug)]
pub struct Blockchain {
    chain: Vec<Block>,
    config: LedgerConfig,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Blockchain {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            chain: vec![Block::genesis(config.difficulty)],
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Always false: a chain holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn last(&self) -> &Block {
        // The vector is never empty: it starts at genesis and replacements are validated.
        &self.chain[self.chain.len() - 1]
    }

    /// Every transaction in every block, in chain order.
    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.chain.iter().flat_map(|b| b.transactions())
    }

    /// Mine `data` on top of the tip and append it. Blocks the calling thread
    /// for the whole proof-of-work search.
    pub fn add_block(&mut self, data: impl Into<BlockData>) -> Block {
        let data = data.into();
        let last = self.last();
        let block = if self.config.parallel_mining {
            let never = AtomicBool::new(false);
            mine_block_parallel(last, data.clone(), self.config.mine_rate_ms, &never)
                .unwrap_or_else(|| mine_block(last, data, self.config.mine_rate_ms))
        } else {
            mine_block(last, data, self.config.mine_rate_ms)
        };
        self.chain.push(block.clone());
        block
    }

    /// Append a block mined elsewhere against this chain's tip.
    pub fn append_mined(&mut self, block: Block) -> Result<()> {
        let tip = self.last();
        if block.last_hash != tip.hash {
            return Err(LedgerError::StaleTip {
                expected: block.last_hash,
                found: tip.hash.clone(),
            });
        }
        check_block(tip, &block)?;
        self.chain.push(block);
        Ok(())
    }

    pub fn is_valid_chain(&self, chain: &[Block]) -> bool {
        self.validate_chain(chain).is_ok()
    }

    /// Genesis must match ours exactly; every later block must link to its
    /// predecessor's hash and rehash to its own stored hash.
    pub fn validate_chain(&self, chain: &[Block]) -> Result<()> {
        let Some(first) = chain.first() else {
            return Err(LedgerError::InvalidChain("chain is empty".into()));
        };
        if *first != Block::genesis(self.config.difficulty) {
            return Err(LedgerError::InvalidChain("genesis block mismatch".into()));
        }
        for (i, pair) in chain.windows(2).enumerate() {
            check_block(&pair[0], &pair[1])
                .map_err(|e| LedgerError::InvalidChain(format!("block {}: {e}", i + 1)))?;
        }
        Ok(())
    }

    /// Install `candidate` if it is longer than the local chain and valid.
    /// Otherwise the local chain is untouched and the reason is returned.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<()> {
        if candidate.len() <= self.chain.len() {
            let err = LedgerError::ChainNotLonger {
                candidate: candidate.len(),
                local: self.chain.len(),
            };
            info!("Not replacing chain: {err}");
            return Err(err);
        }
        if let Err(err) = self.validate_chain(&candidate) {
            warn!("Not replacing chain: {err}");
            return Err(err);
        }
        info!("Replacing chain of length {} with {}", self.chain.len(), candidate.len());
        self.chain = candidate;
        Ok(())
    }
}

fn check_block(last: &Block, block: &Block) -> Result<()> {
    if block.last_hash != last.hash {
        return Err(LedgerError::InvalidChain("last hash does not link".into()));
    }
    if block.compute_hash() != block.hash {
        return Err(LedgerError::InvalidChain("hash does not match contents".into()));
    }
    if !meets_difficulty(&block.hash, block.difficulty) {
        return Err(LedgerError::InvalidChain("hash misses its difficulty".into()));
    }
    Ok(())
}
