//! Core blockchain types: blocks, the chain, and UTXO transactions.

pub mod block;
pub mod chain;
pub mod transaction;

pub use block::Block;
pub use chain::{generate_next_block, Chain, ChainError, DEFAULT_DIFFICULTY};
pub use transaction::{
    Transaction, TransactionError, TxIn, TxOut, UnspentOutput, COINBASE_AMOUNT,
};
