use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::constants::{GENESIS_HASH, GENESIS_LAST_HASH, GENESIS_TIMESTAMP};
use crate::transaction::Transaction;

/// What a block carries: mined transactions, or an opaque payload submitted
/// straight to `add_block`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockData {
    Transactions(Vec<Transaction>),
    Payload(serde_json::Value),
}

impl BlockData {
    pub fn empty() -> Self {
        BlockData::Transactions(Vec::new())
    }

    pub fn transactions(&self) -> &[Transaction] {
        match self {
            BlockData::Transactions(txs) => txs,
            BlockData::Payload(_) => &[],
        }
    }

    /// Canonical JSON bytes fed into the block hash.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Values built by serde_json always serialize.
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl From<Vec<Transaction>> for BlockData {
    fn from(txs: Vec<Transaction>) -> Self {
        BlockData::Transactions(txs)
    }
}

impl From<serde_json::Value> for BlockData {
    fn from(value: serde_json::Value) -> Self {
        BlockData::Payload(value)
    }
}

impl From<&str> for BlockData {
    fn from(value: &str) -> Self {
        BlockData::Payload(serde_json::Value::String(value.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Milliseconds since the unix epoch.
    pub timestamp: u64,
    pub last_hash: String,
    pub hash: String,
    pub data: BlockData,
    pub nonce: u64,
    pub difficulty: u32,
}

impl Block {
    /// The fixed first block of every chain. It is never mined.
    pub fn genesis(difficulty: u32) -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            last_hash: GENESIS_LAST_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            data: BlockData::empty(),
            nonce: 0,
            difficulty,
        }
    }

    /// Recompute the hash from the stored fields.
    pub fn compute_hash(&self) -> String {
        block_hash(
            self.timestamp,
            &self.last_hash,
            &self.data.canonical_bytes(),
            self.nonce,
            self.difficulty,
        )
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.data.transactions()
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = String::from_utf8_lossy(&self.data.canonical_bytes()).into_owned();
        write!(
            f,
            "Block - timestamp: {}, last hash: {}, hash: {}, nonce: {}, difficulty: {}, data: {}",
            self.timestamp,
            short(&self.last_hash),
            short(&self.hash),
            self.nonce,
            self.difficulty,
            data
        )
    }
}

fn short(hash: &str) -> &str {
    hash.get(..10).unwrap_or(hash)
}

/// Bytes hashed for a block. Variable length fields are length prefixed so no
/// two field tuples share an encoding.
pub fn hash_bytes(
    timestamp: u64,
    last_hash: &str,
    data: &[u8],
    nonce: u64,
    difficulty: u32,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(8 + 8 + last_hash.len() + 8 + data.len() + 8 + 4);
    bytes.extend_from_slice(&timestamp.to_le_bytes());
    bytes.extend_from_slice(&(last_hash.len() as u64).to_le_bytes());
    bytes.extend_from_slice(last_hash.as_bytes());
    bytes.extend_from_slice(&(data.len() as u64).to_le_bytes());
    bytes.extend_from_slice(data);
    bytes.extend_from_slice(&nonce.to_le_bytes());
    bytes.extend_from_slice(&difficulty.to_le_bytes());
    bytes
}

pub fn block_hash(timestamp: u64, last_hash: &str, data: &[u8], nonce: u64, difficulty: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(hash_bytes(timestamp, last_hash, data, nonce, difficulty));
    hex::encode(hasher.finalize())
}

/// Retarget against the predecessor: one harder when the attempt lands within
/// `mine_rate_ms` of it, one easier otherwise. Saturates at zero.
pub fn adjust_difficulty(last: &Block, current_time: u64, mine_rate_ms: u64) -> u32 {
    if last.timestamp.saturating_add(mine_rate_ms) > current_time {
        last.difficulty.saturating_add(1)
    } else {
        last.difficulty.saturating_sub(1)
    }
}

pub fn leading_zero_hex(hash: &str) -> u32 {
    hash.bytes().take_while(|b| *b == b'0').count() as u32
}

pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    leading_zero_hex(hash) >= difficulty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DIFFICULTY;

    #[test]
    fn genesis_block_example() {
        let genesis = Block::genesis(DIFFICULTY);
        assert_eq!(genesis.timestamp, GENESIS_TIMESTAMP);
        assert_eq!(genesis.last_hash, "------");
        assert_eq!(genesis.hash, "f1r57-h45h");
        assert_eq!(genesis.data, BlockData::empty());
        assert_eq!(genesis.nonce, 0);
        assert_eq!(genesis, Block::genesis(DIFFICULTY));
    }

    #[test]
    fn leading_zero_hex_examples() {
        assert_eq!(leading_zero_hex("000abc"), 3);
        assert_eq!(leading_zero_hex("a000"), 0);
        assert_eq!(leading_zero_hex("0000"), 4);
        assert!(meets_difficulty("00f", 2));
        assert!(!meets_difficulty("00f", 3));
        assert!(meets_difficulty("f", 0));
    }

    #[test]
    fn hash_bytes_layout() {
        let bytes = hash_bytes(7, "ab", b"[]", 42, 3);
        assert_eq!(bytes.len(), 8 + 8 + 2 + 8 + 2 + 8 + 4);
        assert_eq!(&bytes[0..8], &7u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &2u64.to_le_bytes());
        assert_eq!(&bytes[16..18], b"ab");
        assert_eq!(&bytes[26..28], b"[]");
        assert_eq!(&bytes[28..36], &42u64.to_le_bytes());
        assert_eq!(&bytes[36..40], &3u32.to_le_bytes());
    }

    #[test]
    fn block_hash_changes_with_nonce() {
        let mut block = Block::genesis(DIFFICULTY);
        block.data = BlockData::from("foo");
        let first = block.compute_hash();
        assert_eq!(first, block.compute_hash());
        block.nonce += 1;
        assert_ne!(first, block.compute_hash());
    }

    #[test]
    fn lowers_difficulty_for_slowly_mined_block() {
        let mut last = Block::genesis(DIFFICULTY);
        last.timestamp = 1_600_000_000_000;
        assert_eq!(
            adjust_difficulty(&last, last.timestamp + 360_000, 3000),
            DIFFICULTY - 1
        );
    }

    #[test]
    fn raises_difficulty_for_quickly_mined_block() {
        let mut last = Block::genesis(DIFFICULTY);
        last.timestamp = 1_600_000_000_000;
        assert_eq!(adjust_difficulty(&last, last.timestamp + 1, 3000), DIFFICULTY + 1);
    }

    #[test]
    fn difficulty_saturates_at_zero() {
        let last = Block::genesis(0);
        assert_eq!(adjust_difficulty(&last, 1_600_000_000_000, 3000), 0);
    }

    #[test]
    fn data_round_trips_through_json() {
        let json = serde_json::to_string(&Block::genesis(DIFFICULTY)).unwrap();
        assert!(json.contains("\"lastHash\":\"------\""));
        assert!(json.contains("\"data\":[]"));
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Block::genesis(DIFFICULTY));

        let payload: BlockData = serde_json::from_str(r#"{"note":"hi"}"#).unwrap();
        assert!(matches!(payload, BlockData::Payload(_)));
        assert!(payload.transactions().is_empty());
    }

    #[test]
    fn display_truncates_hashes() {
        let mut block = Block::genesis(DIFFICULTY);
        block.hash = "0123456789abcdef".into();
        let shown = block.to_string();
        assert!(shown.contains("hash: 0123456789,"));
        assert!(shown.contains("last hash: ------"));
    }
}
