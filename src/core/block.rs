//! Block structure and proof-of-work hashing.

use crate::core::transaction::Transaction;
use crate::crypto::{meets_difficulty, sha256_hex};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp of the genesis block (fixed so every node derives the same
/// genesis hash)
pub const GENESIS_TIMESTAMP: i64 = 1_640_995_200;

/// Wall-clock time truncated to whole seconds, the precision blocks carry on
/// the wire
pub fn timestamp_now() -> DateTime<Utc> {
    Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap()
}

/// A block in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Height of the block, starting at 0 for genesis
    pub index: u64,
    /// SHA-256 over the block contents
    pub hash: String,
    /// Hash of the block at `index - 1`
    pub previous_hash: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    /// Required leading zero bits of `hash`
    pub difficulty: u32,
    pub nonce: u64,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create an unmined block (nonce 0); callers mine it before use
    pub fn new(
        index: u64,
        previous_hash: String,
        timestamp: DateTime<Utc>,
        transactions: Vec<Transaction>,
        difficulty: u32,
    ) -> Self {
        let mut block = Self {
            index,
            hash: String::new(),
            previous_hash,
            timestamp,
            difficulty,
            nonce: 0,
            transactions,
        };
        block.hash = block.compute_hash();
        block
    }

    /// The genesis block, identical on every node
    pub fn genesis() -> Self {
        Self::new(
            0,
            "0".repeat(64),
            Utc.timestamp_opt(GENESIS_TIMESTAMP, 0).unwrap(),
            Vec::new(),
            0,
        )
    }

    /// Hash over every field except the hash itself
    pub fn compute_hash(&self) -> String {
        let transactions = serde_json::to_string(&self.transactions).unwrap_or_default();
        let data = format!(
            "{}{}{}{}{}{}",
            self.index,
            self.previous_hash,
            self.timestamp.timestamp(),
            self.difficulty,
            self.nonce,
            transactions
        );
        sha256_hex(data.as_bytes())
    }

    /// Check that the stored hash matches the block contents
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Check that the hash meets the block's difficulty target
    pub fn meets_pow(&self) -> bool {
        let hash_bytes = hex::decode(&self.hash).unwrap_or_default();
        meets_difficulty(&hash_bytes, self.difficulty)
    }

    /// Grind the nonce until the hash meets the difficulty target
    pub fn mine(&mut self) {
        loop {
            self.hash = self.compute_hash();
            if self.meets_pow() {
                return;
            }
            self.nonce += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genesis_is_deterministic() {
        assert_eq!(Block::genesis(), Block::genesis());
        assert_eq!(Block::genesis().index, 0);
        assert!(Block::genesis().verify_hash());
    }

    #[test]
    fn test_mining_meets_difficulty() {
        let genesis = Block::genesis();
        let mut block = Block::new(1, genesis.hash, Utc::now(), Vec::new(), 8);
        block.mine();
        assert!(block.meets_pow());
        assert!(block.verify_hash());
    }

    #[test]
    fn test_tampering_invalidates_hash() {
        let mut block = Block::genesis();
        block.nonce += 1;
        assert!(!block.verify_hash());
    }
}
