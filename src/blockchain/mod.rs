pub mod assemble;
pub mod block;
pub mod difficulty;
pub mod miner;
pub mod model;
pub mod validate;

pub use block::Block;
pub use miner::MinerControl;
pub use model::Blockchain;
pub use validate::ValidationError;

/// Target seconds per block.
pub const BLOCK_INTERVAL_SECS: i64 = 10;

/// Blocks between difficulty retargets.
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;
