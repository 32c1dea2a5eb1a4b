//! The canonical chain and its derived unspent-output set.
//!
//! Owns the append (`add_block`) and wholesale-replacement (`replace_chain`)
//! operations that the gossip reconciliation engine drives.

use crate::core::block::Block;
use crate::core::transaction::{Transaction, UnspentOutput};
use thiserror::Error;

/// Default mining difficulty (leading zero bits)
pub const DEFAULT_DIFFICULTY: u32 = 16;

/// Chain validation errors
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Invalid index: expected {expected}, got {actual}")]
    InvalidIndex { expected: u64, actual: u64 },
    #[error("Previous hash does not match the chain tip")]
    PreviousHashMismatch,
    #[error("Block hash does not match its contents")]
    InvalidHash,
    #[error("Insufficient proof of work")]
    InsufficientProofOfWork,
    #[error("Wrong difficulty: expected {expected}, got {actual}")]
    WrongDifficulty { expected: u32, actual: u32 },
    #[error("Missing coinbase transaction")]
    MissingCoinbase,
    #[error("Invalid transaction in block: {0}")]
    InvalidTransaction(#[from] crate::core::transaction::TransactionError),
    #[error("Output spent twice within one block: {0}:{1}")]
    DoubleSpendInBlock(String, u64),
    #[error("Candidate chain does not start at the genesis block")]
    GenesisMismatch,
    #[error("Candidate chain is not longer than the local chain")]
    NotLonger,
    #[error("Candidate chain is empty")]
    EmptyChain,
}

/// The block chain plus the unspent-output set derived from it
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
    unspent: Vec<UnspentOutput>,
}

impl Chain {
    /// Create a chain containing only the genesis block
    pub fn new() -> Self {
        Self::with_difficulty(DEFAULT_DIFFICULTY)
    }

    /// Create a chain with a custom mining difficulty
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            blocks: vec![Block::genesis()],
            difficulty,
            unspent: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The chain tip
    pub fn latest_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always contains the genesis block")
    }

    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn unspent_outputs(&self) -> &[UnspentOutput] {
        &self.unspent
    }

    /// Append a block to the tip after full validation
    pub fn add_block(&mut self, block: Block) -> Result<(), ChainError> {
        self.validate_successor(&block, self.latest_block())?;
        Self::validate_block_transactions(&block, &self.unspent)?;
        Self::apply_block(&mut self.unspent, &block);
        self.blocks.push(block);
        Ok(())
    }

    /// Replace the whole chain with a candidate, per the longest-valid-chain
    /// rule: the candidate must anchor on the same genesis block, validate
    /// end to end, and be strictly longer than the local chain.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        if candidate.len() <= self.blocks.len() {
            return Err(ChainError::NotLonger);
        }
        let unspent = self.validate_full_chain(&candidate)?;

        log::info!(
            "Replacing local chain of height {} with candidate of height {}",
            self.height(),
            candidate.len() as u64 - 1
        );
        self.blocks = candidate;
        self.unspent = unspent;
        Ok(())
    }

    /// Structural checks on a block extending `previous`
    fn validate_successor(&self, block: &Block, previous: &Block) -> Result<(), ChainError> {
        if block.index != previous.index + 1 {
            return Err(ChainError::InvalidIndex {
                expected: previous.index + 1,
                actual: block.index,
            });
        }
        if block.previous_hash != previous.hash {
            return Err(ChainError::PreviousHashMismatch);
        }
        if block.difficulty != self.difficulty {
            return Err(ChainError::WrongDifficulty {
                expected: self.difficulty,
                actual: block.difficulty,
            });
        }
        if !block.verify_hash() {
            return Err(ChainError::InvalidHash);
        }
        if !block.meets_pow() {
            return Err(ChainError::InsufficientProofOfWork);
        }
        Ok(())
    }

    /// Validate a block's transactions against an unspent-output set:
    /// first transaction is the coinbase, the rest are regular transfers,
    /// and no output is spent twice within the block.
    fn validate_block_transactions(
        block: &Block,
        unspent: &[UnspentOutput],
    ) -> Result<(), ChainError> {
        // Genesis carries no transactions
        if block.index == 0 {
            return Ok(());
        }

        let (coinbase, rest) = block
            .transactions
            .split_first()
            .ok_or(ChainError::MissingCoinbase)?;
        coinbase.validate_coinbase(block.index)?;

        let mut spent: Vec<(&str, u64)> = Vec::new();
        for tx in rest {
            tx.validate(unspent)?;
            for input in &tx.inputs {
                if spent
                    .iter()
                    .any(|(id, idx)| *id == input.tx_out_id && *idx == input.tx_out_index)
                {
                    return Err(ChainError::DoubleSpendInBlock(
                        input.tx_out_id.clone(),
                        input.tx_out_index,
                    ));
                }
                spent.push((&input.tx_out_id, input.tx_out_index));
            }
        }
        Ok(())
    }

    /// Consume the inputs and add the outputs of every transaction in a block
    fn apply_block(unspent: &mut Vec<UnspentOutput>, block: &Block) {
        for tx in &block.transactions {
            if !tx.is_coinbase() {
                unspent.retain(|u| {
                    !tx.inputs
                        .iter()
                        .any(|i| i.tx_out_id == u.tx_out_id && i.tx_out_index == u.tx_out_index)
                });
            }
            for (index, output) in tx.outputs.iter().enumerate() {
                unspent.push(UnspentOutput {
                    tx_out_id: tx.id.clone(),
                    tx_out_index: index as u64,
                    address: output.address.clone(),
                    amount: output.amount,
                });
            }
        }
    }

    /// Walk a candidate chain from genesis, validating every link and every
    /// transaction; returns the unspent-output set of the validated chain.
    fn validate_full_chain(&self, candidate: &[Block]) -> Result<Vec<UnspentOutput>, ChainError> {
        let genesis = candidate.first().ok_or(ChainError::EmptyChain)?;
        if *genesis != Block::genesis() {
            return Err(ChainError::GenesisMismatch);
        }

        let mut unspent = Vec::new();
        for window in candidate.windows(2) {
            let (previous, block) = (&window[0], &window[1]);
            self.validate_successor(block, previous)?;
            Self::validate_block_transactions(block, &unspent)?;
            Self::apply_block(&mut unspent, block);
        }
        Ok(unspent)
    }
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the next block on top of a chain tip and mine it.
pub fn generate_next_block(
    previous: &Block,
    transactions: Vec<Transaction>,
    difficulty: u32,
) -> Block {
    let mut block = Block::new(
        previous.index + 1,
        previous.hash.clone(),
        crate::core::block::timestamp_now(),
        transactions,
        difficulty,
    );
    block.mine();
    block
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::transaction::Transaction;

    /// A zero-difficulty chain extended by `extra` mined coinbase-only blocks
    pub(crate) fn chain_of_height(extra: u64) -> Chain {
        let mut chain = Chain::with_difficulty(0);
        for _ in 0..extra {
            let coinbase = Transaction::coinbase("miner", chain.height() + 1);
            let block = generate_next_block(chain.latest_block(), vec![coinbase], 0);
            chain.add_block(block).expect("generated block is valid");
        }
        chain
    }
}
