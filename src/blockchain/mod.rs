pub mod block;
pub mod model;
pub mod stats;

pub use block::Block;
pub use model::Ledger;
pub use stats::{AddressStats, ChainStats};

/// Default Proof-of-Work difficulty (number of leading zeros).
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Reward paid to the miner of each block (dev value).
pub const DEFAULT_MINING_REWARD: u64 = 100;

/// Difficulty bounds (keep low in dev to avoid long waits).
/// Every mined block must carry at least `DIFF_MIN`.
pub const DIFF_MIN: u32 = 1;
pub const DIFF_MAX: u32 = 6;

/// Fixed genesis time (2025-01-01T00:00:00Z, in ms).
pub const GENESIS_TIMESTAMP: i64 = 1_735_689_600_000;

/// How many miners `Ledger::stats` reports.
pub const TOP_MINERS: usize = 5;
