//! Transaction pool for unconfirmed transactions.
//!
//! Transactions are deduplicated by id and validated against the current
//! unspent-output set before acceptance; a transaction whose inputs collide
//! with one already pending is rejected as a double spend.

use crate::core::transaction::{Transaction, TransactionError, UnspentOutput};
use thiserror::Error;

/// Pool admission errors
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Transaction {0} is already in the pool")]
    Duplicate(String),
    #[error("Input {0}:{1} is already spent by a pooled transaction")]
    DoubleSpend(String, u64),
    #[error("Transaction rejected: {0}")]
    Invalid(#[from] TransactionError),
}

/// Pending transactions in arrival order
#[derive(Debug, Default)]
pub struct TransactionPool {
    transactions: Vec<Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a transaction against the unspent-output set and the pool
    /// itself, then admit it.
    pub fn add(
        &mut self,
        tx: Transaction,
        unspent: &[UnspentOutput],
    ) -> Result<(), PoolError> {
        if self.contains(&tx.id) {
            return Err(PoolError::Duplicate(tx.id));
        }

        for input in &tx.inputs {
            if self.is_output_reserved(&input.tx_out_id, input.tx_out_index) {
                return Err(PoolError::DoubleSpend(
                    input.tx_out_id.clone(),
                    input.tx_out_index,
                ));
            }
        }

        tx.validate(unspent)?;
        self.transactions.push(tx);
        Ok(())
    }

    /// Point-in-time copy of the pending transactions, in arrival order
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.transactions.iter().any(|tx| tx.id == id)
    }

    /// Whether some pooled transaction already spends the given output
    pub fn is_output_reserved(&self, tx_out_id: &str, tx_out_index: u64) -> bool {
        self.transactions.iter().any(|tx| {
            tx.inputs
                .iter()
                .any(|i| i.tx_out_id == tx_out_id && i.tx_out_index == tx_out_index)
        })
    }

    /// Drop transactions whose inputs are no longer unspent. Called after the
    /// chain advances so confirmed or conflicting transactions leave the pool.
    pub fn remove_confirmed(&mut self, unspent: &[UnspentOutput]) {
        let before = self.transactions.len();
        self.transactions.retain(|tx| {
            tx.inputs.iter().all(|input| {
                unspent
                    .iter()
                    .any(|u| u.tx_out_id == input.tx_out_id && u.tx_out_index == input.tx_out_index)
            })
        });
        let dropped = before - self.transactions.len();
        if dropped > 0 {
            log::info!("Dropped {} settled transaction(s) from the pool", dropped);
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
