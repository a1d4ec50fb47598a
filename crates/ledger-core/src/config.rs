use serde::{Deserialize, Serialize};

use crate::constants::{DIFFICULTY, INITIAL_BALANCE, MINE_RATE_MS, MINING_REWARD};

/// Tunables shared by every node on a network. Nodes that disagree on
/// `difficulty` build different genesis blocks and will reject each other's chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Difficulty of the genesis block; later blocks retarget from it.
    pub difficulty: u32,
    pub mine_rate_ms: u64,
    pub initial_balance: u64,
    pub mining_reward: u64,
    /// Search nonces on the rayon pool instead of the calling thread.
    pub parallel_mining: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DIFFICULTY,
            mine_rate_ms: MINE_RATE_MS,
            initial_balance: INITIAL_BALANCE,
            mining_reward: MINING_REWARD,
            parallel_mining: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: LedgerConfig = serde_json::from_str(r#"{"difficulty":1}"#).unwrap();
        assert_eq!(cfg.difficulty, 1);
        assert_eq!(cfg.mine_rate_ms, MINE_RATE_MS);
        assert_eq!(cfg.mining_reward, MINING_REWARD);
        assert!(!cfg.parallel_mining);
    }
}
