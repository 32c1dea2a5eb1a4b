//! Tinycoin: a minimal gossip-synchronized blockchain node
//!
//! This crate implements a small blockchain node whose peers keep each other
//! eventually consistent through a WebSocket gossip protocol:
//! - SHA-256 proof-of-work chain with a UTXO transaction model
//! - Chain reconciliation (extend, re-query, or replace on peer responses)
//! - Shared unconfirmed-transaction pool, merged and re-gossiped on sync
//! - secp256k1 wallet for signing transfers
//! - HTTP control-plane for mining, balances, and peer management
//!
//! # Example
//!
//! ```rust
//! use tinycoin::core::Chain;
//! use tinycoin::mining::mine_on;
//!
//! // Create a new chain and mine one block on it
//! let mut chain = Chain::with_difficulty(8);
//! let block = mine_on(&chain, "miner-address", vec![]);
//! chain.add_block(block).unwrap();
//! assert_eq!(chain.height(), 1);
//! ```

pub mod api;
pub mod core;
pub mod crypto;
pub mod mining;
pub mod network;
pub mod wallet;

// Re-export commonly used types
pub use api::create_router;
pub use core::{Block, Chain, ChainError, Transaction, COINBASE_AMOUNT, DEFAULT_DIFFICULTY};
pub use crypto::KeyPair;
pub use mining::{Miner, TransactionPool};
pub use network::{Message, Node, PeerRegistry};
pub use wallet::Wallet;
