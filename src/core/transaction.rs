//! UTXO-based transactions with secp256k1 signatures.
//!
//! A transaction id is the SHA-256 of its inputs (referenced outpoints) and
//! outputs; input signatures are computed over that id, so signatures are not
//! part of the id itself.

use crate::crypto::{sha256_hex, verify_signature_hex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amount minted by a coinbase transaction
pub const COINBASE_AMOUNT: u64 = 50;

/// Transaction validation errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: String, actual: String },
    #[error("Referenced output not found: {0}:{1}")]
    ReferencedOutputMissing(String, u64),
    #[error("Duplicate input: {0}:{1}")]
    DuplicateInput(String, u64),
    #[error("Invalid signature on input {0}")]
    InvalidSignature(usize),
    #[error("Input total {input} does not match output total {output}")]
    AmountMismatch { input: u64, output: u64 },
    #[error("Invalid coinbase transaction: {0}")]
    InvalidCoinbase(&'static str),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] crate::crypto::KeyError),
}

/// Transaction input: a reference to an unspent output plus a spend signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    /// Id of the transaction that produced the referenced output
    pub tx_out_id: String,
    /// Index of the referenced output within that transaction
    pub tx_out_index: u64,
    /// Hex signature over the spending transaction's id
    pub signature: String,
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Recipient address (compressed public key, hex)
    pub address: String,
    pub amount: u64,
}

/// An entry in the unspent-output set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub tx_out_id: String,
    pub tx_out_index: u64,
    pub address: String,
    pub amount: u64,
}

/// A transaction moving coins between addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    /// Build a transaction with its id computed from inputs and outputs
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        let mut tx = Self {
            id: String::new(),
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Create the coinbase transaction for a block.
    /// The block index is carried in the input so every coinbase has a
    /// distinct id.
    pub fn coinbase(address: &str, block_index: u64) -> Self {
        Self::new(
            vec![TxIn {
                tx_out_id: String::new(),
                tx_out_index: block_index,
                signature: String::new(),
            }],
            vec![TxOut {
                address: address.to_string(),
                amount: COINBASE_AMOUNT,
            }],
        )
    }

    /// Compute the transaction id (excludes signatures)
    pub fn compute_id(&self) -> String {
        let mut data = String::new();
        for input in &self.inputs {
            data.push_str(&input.tx_out_id);
            data.push_str(&input.tx_out_index.to_string());
        }
        for output in &self.outputs {
            data.push_str(&output.address);
            data.push_str(&output.amount.to_string());
        }
        sha256_hex(data.as_bytes())
    }

    /// A coinbase transaction has a single unsigned input with no outpoint id
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].tx_out_id.is_empty()
    }

    /// Validate a regular transaction against the unspent-output set:
    /// id integrity, input existence, signatures, and amount conservation.
    pub fn validate(&self, unspent: &[UnspentOutput]) -> Result<(), TransactionError> {
        let expected = self.compute_id();
        if self.id != expected {
            return Err(TransactionError::IdMismatch {
                expected,
                actual: self.id.clone(),
            });
        }

        let mut input_total = 0u64;
        for (index, input) in self.inputs.iter().enumerate() {
            let duplicated = self.inputs[..index]
                .iter()
                .any(|i| i.tx_out_id == input.tx_out_id && i.tx_out_index == input.tx_out_index);
            if duplicated {
                return Err(TransactionError::DuplicateInput(
                    input.tx_out_id.clone(),
                    input.tx_out_index,
                ));
            }

            let funding = unspent
                .iter()
                .find(|u| u.tx_out_id == input.tx_out_id && u.tx_out_index == input.tx_out_index)
                .ok_or_else(|| {
                    TransactionError::ReferencedOutputMissing(
                        input.tx_out_id.clone(),
                        input.tx_out_index,
                    )
                })?;

            if !verify_signature_hex(&funding.address, &self.id, &input.signature)
                .unwrap_or(false)
            {
                return Err(TransactionError::InvalidSignature(index));
            }

            input_total += funding.amount;
        }

        let output_total: u64 = self.outputs.iter().map(|o| o.amount).sum();
        if input_total != output_total {
            return Err(TransactionError::AmountMismatch {
                input: input_total,
                output: output_total,
            });
        }

        Ok(())
    }

    /// Validate a coinbase transaction for the block at `block_index`
    pub fn validate_coinbase(&self, block_index: u64) -> Result<(), TransactionError> {
        let expected = self.compute_id();
        if self.id != expected {
            return Err(TransactionError::IdMismatch {
                expected,
                actual: self.id.clone(),
            });
        }
        if !self.is_coinbase() {
            return Err(TransactionError::InvalidCoinbase("not a coinbase input"));
        }
        if self.inputs[0].tx_out_index != block_index {
            return Err(TransactionError::InvalidCoinbase(
                "input index does not match block index",
            ));
        }
        if self.outputs.len() != 1 {
            return Err(TransactionError::InvalidCoinbase("expected a single output"));
        }
        if self.outputs[0].amount != COINBASE_AMOUNT {
            return Err(TransactionError::InvalidCoinbase("wrong coinbase amount"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn funded_keypair() -> (KeyPair, Vec<UnspentOutput>) {
        let kp = KeyPair::generate();
        let unspent = vec![UnspentOutput {
            tx_out_id: "a".repeat(64),
            tx_out_index: 0,
            address: kp.public_key_hex(),
            amount: 50,
        }];
        (kp, unspent)
    }

    fn signed_transfer(
        kp: &KeyPair,
        unspent: &UnspentOutput,
        to: &str,
        amount: u64,
    ) -> Transaction {
        let mut tx = Transaction::new(
            vec![TxIn {
                tx_out_id: unspent.tx_out_id.clone(),
                tx_out_index: unspent.tx_out_index,
                signature: String::new(),
            }],
            vec![
                TxOut {
                    address: to.to_string(),
                    amount,
                },
                TxOut {
                    address: kp.public_key_hex(),
                    amount: unspent.amount - amount,
                },
            ],
        );
        let signature = kp.sign_digest_hex(&tx.id).unwrap();
        for input in &mut tx.inputs {
            input.signature = signature.clone();
        }
        tx
    }

    #[test]
    fn test_valid_transfer() {
        let (kp, unspent) = funded_keypair();
        let tx = signed_transfer(&kp, &unspent[0], "recipient", 30);
        assert!(tx.validate(&unspent).is_ok());
    }

    #[test]
    fn test_missing_referenced_output() {
        let (kp, unspent) = funded_keypair();
        let tx = signed_transfer(&kp, &unspent[0], "recipient", 30);
        assert!(matches!(
            tx.validate(&[]),
            Err(TransactionError::ReferencedOutputMissing(_, _))
        ));
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let (kp, mut unspent) = funded_keypair();
        let tx = signed_transfer(&kp, &unspent[0], "recipient", 30);

        // Repoint the funding output at a different owner
        unspent[0].address = KeyPair::generate().public_key_hex();
        assert!(matches!(
            tx.validate(&unspent),
            Err(TransactionError::InvalidSignature(0))
        ));
    }

    #[test]
    fn test_amount_conservation() {
        let (kp, unspent) = funded_keypair();
        let mut tx = signed_transfer(&kp, &unspent[0], "recipient", 30);
        tx.outputs[0].amount = 40;
        tx.id = tx.compute_id();
        let signature = kp.sign_digest_hex(&tx.id).unwrap();
        tx.inputs[0].signature = signature;
        assert!(matches!(
            tx.validate(&unspent),
            Err(TransactionError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_tampered_id_rejected() {
        let (kp, unspent) = funded_keypair();
        let mut tx = signed_transfer(&kp, &unspent[0], "recipient", 30);
        tx.id = "0".repeat(64);
        assert!(matches!(
            tx.validate(&unspent),
            Err(TransactionError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_coinbase_validation() {
        let coinbase = Transaction::coinbase("miner", 7);
        assert!(coinbase.is_coinbase());
        assert!(coinbase.validate_coinbase(7).is_ok());
        assert!(coinbase.validate_coinbase(8).is_err());
    }

    #[test]
    fn test_coinbase_wrong_amount() {
        let mut coinbase = Transaction::coinbase("miner", 1);
        coinbase.outputs[0].amount = 100;
        coinbase.id = coinbase.compute_id();
        assert!(matches!(
            coinbase.validate_coinbase(1),
            Err(TransactionError::InvalidCoinbase(_))
        ));
    }

    #[test]
    fn test_coinbase_ids_distinct_per_block() {
        let a = Transaction::coinbase("miner", 1);
        let b = Transaction::coinbase("miner", 2);
        assert_ne!(a.id, b.id);
    }
}
