//! Mining off the async runtime. The tip and block contents are snapshotted
//! under the ledger lock, the proof-of-work search runs on a blocking thread
//! without holding it, and the result is committed back under the lock only
//! if the tip has not moved in the meantime.
use anyhow::{anyhow, Result};
use ledger_core::mine::{mine_block_cancellable, mine_block_parallel};
use ledger_core::{Block, BlockData};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

use crate::server::P2pServer;

#[derive(Clone, Debug)]
pub enum MiningJob {
    /// Valid pool transactions plus the reward; clears pools once mined.
    Pool,
    /// An opaque payload.
    Data(BlockData),
}

pub struct MiningHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<Result<Block>>,
}

impl MiningHandle {
    /// Stop the search. `join` then reports the cancellation as an error.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<Block> {
        self.task.await?
    }
}

pub fn spawn_mining(server: &P2pServer, job: MiningJob) -> MiningHandle {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let server = server.clone();

    let task = tokio::spawn(async move {
        let (last, data, config) = {
            let ledger = server.ledger().lock().await;
            let data = match &job {
                MiningJob::Pool => BlockData::from(ledger.block_template()?),
                MiningJob::Data(data) => data.clone(),
            };
            (ledger.chain.last().clone(), data, *ledger.config())
        };

        let block = tokio::task::spawn_blocking(move || {
            if config.parallel_mining {
                mine_block_parallel(&last, data, config.mine_rate_ms, &flag)
            } else {
                mine_block_cancellable(&last, data, config.mine_rate_ms, &flag)
            }
        })
        .await?
        .ok_or_else(|| anyhow!("mining cancelled"))?;

        let mut ledger = server.ledger().lock().await;
        match job {
            MiningJob::Pool => ledger.commit_mined(block.clone(), &server)?,
            MiningJob::Data(_) => ledger.commit_block(block.clone(), &server)?,
        }
        info!("Committed block {}", block.hash);
        Ok(block)
    });

    MiningHandle { cancel, task }
}
