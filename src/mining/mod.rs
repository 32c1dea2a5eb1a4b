//! Mining and the unconfirmed-transaction pool.

pub mod miner;
pub mod pool;

pub use miner::{mine_on, Miner};
pub use pool::{PoolError, TransactionPool};
