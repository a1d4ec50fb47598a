use crate::block::{adjust_difficulty, block_hash, meets_difficulty, Block, BlockData};
use crate::now_millis;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// One nonce tried: each attempt stamps its own time and retargets difficulty.
struct Attempt {
    timestamp: u64,
    nonce: u64,
    difficulty: u32,
    hash: String,
}

fn attempt(last: &Block, data: &[u8], nonce: u64, mine_rate_ms: u64) -> Attempt {
    let timestamp = now_millis();
    let difficulty = adjust_difficulty(last, timestamp, mine_rate_ms);
    let hash = block_hash(timestamp, &last.hash, data, nonce, difficulty);
    Attempt {
        timestamp,
        nonce,
        difficulty,
        hash,
    }
}

fn assemble(last: &Block, data: BlockData, found: Attempt) -> Block {
    info!(
        "Mined block with nonce {} at difficulty {} and hash {}",
        found.nonce, found.difficulty, found.hash
    );
    Block {
        timestamp: found.timestamp,
        last_hash: last.hash.clone(),
        hash: found.hash,
        data,
        nonce: found.nonce,
        difficulty: found.difficulty,
    }
}

/// Mine a block on top of `last`, blocking the calling thread until the hash
/// carries as many leading zero hex digits as the retargeted difficulty.
pub fn mine_block(last: &Block, data: BlockData, mine_rate_ms: u64) -> Block {
    let bytes = data.canonical_bytes();
    let mut nonce = 0u64;
    loop {
        nonce = nonce.wrapping_add(1);
        let found = attempt(last, &bytes, nonce, mine_rate_ms);
        if meets_difficulty(&found.hash, found.difficulty) {
            return assemble(last, data, found);
        }
    }
}

/// Like [`mine_block`], but gives up and returns `None` once `cancel` is set.
pub fn mine_block_cancellable(
    last: &Block,
    data: BlockData,
    mine_rate_ms: u64,
    cancel: &AtomicBool,
) -> Option<Block> {
    let bytes = data.canonical_bytes();
    let mut nonce = 0u64;
    while !cancel.load(Ordering::Relaxed) {
        nonce = nonce.wrapping_add(1);
        let found = attempt(last, &bytes, nonce, mine_rate_ms);
        if meets_difficulty(&found.hash, found.difficulty) {
            return Some(assemble(last, data, found));
        }
    }
    info!("Mining cancelled after {} attempts", nonce);
    None
}

/// Searches nonces in parallel on the rayon pool until some attempt meets its
/// difficulty or `cancel` is set.
pub fn mine_block_parallel(
    last: &Block,
    data: BlockData,
    mine_rate_ms: u64,
    cancel: &AtomicBool,
) -> Option<Block> {
    let bytes = data.canonical_bytes();

    // Rayon splits the nonce range across worker threads.
    let found = (1u64..u64::MAX)
        .into_par_iter()
        .map(|nonce| attempt(last, &bytes, nonce, mine_rate_ms))
        .find_any(|a| cancel.load(Ordering::Relaxed) || meets_difficulty(&a.hash, a.difficulty))?;

    if !meets_difficulty(&found.hash, found.difficulty) {
        info!("Parallel mining cancelled");
        return None;
    }
    Some(assemble(last, data, found))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DIFFICULTY, MINE_RATE_MS};

    #[test]
    fn mined_block_links_to_last_and_carries_data() {
        let last = Block::genesis(DIFFICULTY);
        let block = mine_block(&last, BlockData::from("bar"), MINE_RATE_MS);
        assert_eq!(block.data, BlockData::from("bar"));
        assert_eq!(block.last_hash, last.hash);
    }

    #[test]
    fn mined_hash_matches_difficulty_and_fields() {
        let last = Block::genesis(DIFFICULTY);
        let block = mine_block(&last, BlockData::from("bar"), MINE_RATE_MS);
        let prefix = "0".repeat(block.difficulty as usize);
        assert!(block.hash.starts_with(&prefix));
        assert_eq!(block.compute_hash(), block.hash);
    }

    #[test]
    fn difficulty_moves_one_step_from_predecessor() {
        let genesis = Block::genesis(DIFFICULTY);
        // Genesis is stamped at the epoch, so the first block is always slow.
        let first = mine_block(&genesis, BlockData::from("a"), MINE_RATE_MS);
        assert_eq!(first.difficulty, DIFFICULTY - 1);
        // Right after `first`, an hour-long mine rate makes the next block fast.
        let second = mine_block(&first, BlockData::from("b"), 3_600_000);
        assert_eq!(second.difficulty, first.difficulty + 1);
    }

    #[test]
    fn cancelled_search_returns_none() {
        let mut last = Block::genesis(64);
        last.timestamp = now_millis();
        let cancel = AtomicBool::new(true);
        assert!(mine_block_cancellable(&last, BlockData::from("x"), MINE_RATE_MS, &cancel).is_none());
        assert!(mine_block_parallel(&last, BlockData::from("x"), MINE_RATE_MS, &cancel).is_none());
    }

    #[test]
    fn parallel_search_finds_valid_block() {
        let last = Block::genesis(DIFFICULTY);
        let cancel = AtomicBool::new(false);
        let block = mine_block_parallel(&last, BlockData::from("p"), MINE_RATE_MS, &cancel)
            .expect("not cancelled");
        assert!(meets_difficulty(&block.hash, block.difficulty));
        assert_eq!(block.compute_hash(), block.hash);
        assert_eq!(block.last_hash, last.hash);
    }
}
