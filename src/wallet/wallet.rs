//! The node wallet: one keypair, balance queries, and transaction building.

use crate::core::transaction::{Transaction, TxIn, TxOut, UnspentOutput};
use crate::crypto::{KeyError, KeyPair};
use crate::mining::TransactionPool;
use thiserror::Error;

/// Wallet errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("Key error: {0}")]
    KeyError(#[from] KeyError),
}

/// A single-keypair wallet. The address is the compressed public key in hex.
pub struct Wallet {
    keypair: KeyPair,
}

impl Wallet {
    /// Generate a wallet with a fresh random keypair
    pub fn generate() -> Self {
        Self {
            keypair: KeyPair::generate(),
        }
    }

    /// Load a wallet from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, WalletError> {
        Ok(Self {
            keypair: KeyPair::from_private_key_hex(hex_key)?,
        })
    }

    pub fn address(&self) -> String {
        self.keypair.public_key_hex()
    }

    /// Sum of the unspent outputs owned by this wallet
    pub fn balance(&self, unspent: &[UnspentOutput]) -> u64 {
        let address = self.address();
        unspent
            .iter()
            .filter(|u| u.address == address)
            .map(|u| u.amount)
            .sum()
    }

    /// Build a signed transfer to `to`. Outputs already committed to a pooled
    /// transaction are skipped during coin selection; change returns to this
    /// wallet.
    pub fn create_transaction(
        &self,
        to: &str,
        amount: u64,
        unspent: &[UnspentOutput],
        pool: &TransactionPool,
    ) -> Result<Transaction, WalletError> {
        let address = self.address();
        let spendable: Vec<&UnspentOutput> = unspent
            .iter()
            .filter(|u| u.address == address)
            .filter(|u| !pool.is_output_reserved(&u.tx_out_id, u.tx_out_index))
            .collect();

        let mut selected = Vec::new();
        let mut selected_total = 0u64;
        for output in spendable {
            selected.push(output);
            selected_total += output.amount;
            if selected_total >= amount {
                break;
            }
        }
        if selected_total < amount {
            return Err(WalletError::InsufficientFunds {
                needed: amount,
                available: selected_total,
            });
        }

        let inputs = selected
            .iter()
            .map(|u| TxIn {
                tx_out_id: u.tx_out_id.clone(),
                tx_out_index: u.tx_out_index,
                signature: String::new(),
            })
            .collect();

        let mut outputs = vec![TxOut {
            address: to.to_string(),
            amount,
        }];
        let change = selected_total - amount;
        if change > 0 {
            outputs.push(TxOut {
                address: address.clone(),
                amount: change,
            });
        }

        let mut tx = Transaction::new(inputs, outputs);
        let signature = self.keypair.sign_digest_hex(&tx.id)?;
        for input in &mut tx.inputs {
            input.signature = signature.clone();
        }
        Ok(tx)
    }
}
