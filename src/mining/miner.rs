//! Block assembly and proof-of-work mining.

use crate::core::chain::generate_next_block;
use crate::core::{Block, Chain, Transaction};

/// Builds blocks crediting the coinbase to a fixed address
pub struct Miner {
    address: String,
}

impl Miner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
        }
    }

    /// Assemble and mine the next block on top of `tip`: a coinbase for the
    /// miner's address followed by the supplied pending transactions.
    pub fn mine_next(&self, tip: &Block, pending: Vec<Transaction>, difficulty: u32) -> Block {
        let mut transactions = vec![Transaction::coinbase(&self.address, tip.index + 1)];
        transactions.extend(pending);
        generate_next_block(tip, transactions, difficulty)
    }
}

/// Mine the next block for a chain and return it without appending;
/// the caller appends under its own lock.
pub fn mine_on(chain: &Chain, address: &str, pending: Vec<Transaction>) -> Block {
    Miner::new(address).mine_next(chain.latest_block(), pending, chain.difficulty())
}
