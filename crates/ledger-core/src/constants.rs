pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const DIFFICULTY: u32 = 3;
/// Target interval between blocks, in milliseconds.
pub const MINE_RATE_MS: u64 = 3000;
pub const INITIAL_BALANCE: u64 = 500;
pub const MINING_REWARD: u64 = 50;
pub const GENESIS_TIMESTAMP: u64 = 0;
pub const GENESIS_LAST_HASH: &str = "------";
pub const GENESIS_HASH: &str = "f1r57-h45h";
