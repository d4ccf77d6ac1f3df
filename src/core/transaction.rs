//! Transaction model and validation
//!
//! Transactions move value between addresses by consuming unspent outputs
//! and creating new ones. Every input carries an ECDSA signature over the
//! transaction id, made by the owner of the referenced output. The only
//! exception is the coinbase transaction a miner grants itself.

use crate::core::utxo::UtxoSet;
use crate::crypto::{
    public_key_from_address, sha256_hex, verify_signature, KeyError, KeyPair,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Fixed reward paid by the coinbase transaction of every block
pub const COINBASE_REWARD: u64 = 50;

/// Transaction-related errors
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("Input references missing unspent output {tx_id}:{output_index}")]
    Reference { tx_id: String, output_index: u64 },
    #[error("Signer {signer} does not own referenced output of {owner}")]
    Authorization { signer: String, owner: String },
    #[error("Invalid signature on input {input_index} of transaction {tx_id}")]
    InvalidSignature { tx_id: String, input_index: usize },
    #[error("Output {tx_id}:{output_index} spent twice in the same block")]
    DoubleSpend { tx_id: String, output_index: u64 },
    #[error("Transaction {tx_id} creates {created} from inputs worth {consumed}")]
    ValueMismatch {
        tx_id: String,
        consumed: u64,
        created: u64,
    },
    #[error("Input index {input_index} out of range for transaction {tx_id}")]
    InputIndex { tx_id: String, input_index: usize },
    #[error("Block does not start with a coinbase transaction")]
    MissingCoinbase,
    #[error("Block carries a second coinbase transaction {tx_id}")]
    ExtraCoinbase { tx_id: String },
    #[error("Transaction id {stored} does not match its contents")]
    IdMismatch { stored: String },
    #[error("Invalid coinbase transaction: {0}")]
    BadCoinbase(String),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Reference to a previously created output, with proof of ownership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxInput {
    /// Id of the transaction that created the referenced output.
    /// Empty for the coinbase input.
    pub referenced_tx_id: String,
    /// Index of the referenced output. The coinbase input overloads this
    /// field to carry the block index, keeping coinbase ids unique per
    /// height.
    pub referenced_output_index: u64,
    /// Compact ECDSA signature over the transaction id, hex-encoded.
    /// Empty for the coinbase input.
    pub signature: String,
}

/// Value assigned to an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutput {
    pub owner_address: String,
    pub amount: u64,
}

/// A value-transfer transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Transaction {
    /// Assemble an unsigned transaction and stamp its id
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: String::new(),
            inputs,
            outputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Create the coinbase (mining reward) transaction for a block
    pub fn coinbase(miner_address: &str, block_index: u64) -> Self {
        let inputs = vec![TxInput {
            referenced_tx_id: String::new(),
            referenced_output_index: block_index,
            signature: String::new(),
        }];
        let outputs = vec![TxOutput {
            owner_address: miner_address.to_string(),
            amount: COINBASE_REWARD,
        }];
        Self::new(inputs, outputs)
    }

    /// Hash of the concatenated input references followed by the
    /// concatenated outputs, in order. Reordering either list changes the
    /// id.
    pub fn compute_id(&self) -> String {
        let input_content: String = self
            .inputs
            .iter()
            .map(|input| {
                format!(
                    "{}{}",
                    input.referenced_tx_id, input.referenced_output_index
                )
            })
            .collect();

        let output_content: String = self
            .outputs
            .iter()
            .map(|output| format!("{}{}", output.owner_address, output.amount))
            .collect();

        sha256_hex(format!("{}{}", input_content, output_content).as_bytes())
    }

    /// Whether this transaction has the synthetic no-reference input shape
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].referenced_tx_id.is_empty()
    }

    /// The 32-byte digest inputs are signed over (the decoded id)
    pub fn signing_digest(&self) -> Result<Vec<u8>, TransactionError> {
        hex::decode(&self.id).map_err(|_| TransactionError::IdMismatch {
            stored: self.id.clone(),
        })
    }

    /// Sign one input against the UTXO snapshot.
    ///
    /// Fails if the referenced output is absent or if `key_pair` does not
    /// belong to its owner. Returns the hex-encoded compact signature.
    pub fn sign_input(
        &self,
        input_index: usize,
        key_pair: &KeyPair,
        utxo_set: &UtxoSet,
    ) -> Result<String, TransactionError> {
        let input =
            self.inputs
                .get(input_index)
                .ok_or_else(|| TransactionError::InputIndex {
                    tx_id: self.id.clone(),
                    input_index,
                })?;
        let referenced = utxo_set
            .lookup(&input.referenced_tx_id, input.referenced_output_index)
            .ok_or_else(|| TransactionError::Reference {
                tx_id: input.referenced_tx_id.clone(),
                output_index: input.referenced_output_index,
            })?;

        let signer = key_pair.address();
        if signer != referenced.owner_address {
            return Err(TransactionError::Authorization {
                signer,
                owner: referenced.owner_address.clone(),
            });
        }

        let signature = key_pair.sign(&self.signing_digest()?)?;
        Ok(hex::encode(signature))
    }

    /// Verify one input's signature against the referenced output's owner.
    /// Returns the amount the input consumes.
    fn verify_input(
        &self,
        input_index: usize,
        utxo_set: &UtxoSet,
    ) -> Result<u64, TransactionError> {
        let input = &self.inputs[input_index];
        let referenced = utxo_set
            .lookup(&input.referenced_tx_id, input.referenced_output_index)
            .ok_or_else(|| TransactionError::Reference {
                tx_id: input.referenced_tx_id.clone(),
                output_index: input.referenced_output_index,
            })?;

        let invalid = || TransactionError::InvalidSignature {
            tx_id: self.id.clone(),
            input_index,
        };

        let owner_key = public_key_from_address(&referenced.owner_address)?;
        let signature = hex::decode(&input.signature).map_err(|_| invalid())?;
        if !verify_signature(&owner_key, &self.signing_digest()?, &signature)? {
            return Err(invalid());
        }
        Ok(referenced.amount)
    }

    /// Full validation of a non-coinbase transaction against a UTXO
    /// snapshot: id integrity, input resolution, signatures, and value
    /// conservation. The outputs must carry exactly the value the inputs
    /// consume; only the coinbase mints.
    pub fn validate(&self, utxo_set: &UtxoSet) -> Result<(), TransactionError> {
        if self.compute_id() != self.id {
            return Err(TransactionError::IdMismatch {
                stored: self.id.clone(),
            });
        }
        let mut consumed: u64 = 0;
        for index in 0..self.inputs.len() {
            consumed += self.verify_input(index, utxo_set)?;
        }
        let created = self.total_output();
        if created != consumed {
            return Err(TransactionError::ValueMismatch {
                tx_id: self.id.clone(),
                consumed,
                created,
            });
        }
        Ok(())
    }

    /// Check the fixed coinbase shape for a given block height
    pub fn validate_coinbase(&self, block_index: u64) -> Result<(), TransactionError> {
        if self.compute_id() != self.id {
            return Err(TransactionError::IdMismatch {
                stored: self.id.clone(),
            });
        }
        if self.inputs.len() != 1 {
            return Err(TransactionError::BadCoinbase(
                "must have exactly one input".to_string(),
            ));
        }
        let input = &self.inputs[0];
        if !input.referenced_tx_id.is_empty() || !input.signature.is_empty() {
            return Err(TransactionError::BadCoinbase(
                "input reference and signature must be empty".to_string(),
            ));
        }
        if input.referenced_output_index != block_index {
            return Err(TransactionError::BadCoinbase(format!(
                "carries block index {}, expected {}",
                input.referenced_output_index, block_index
            )));
        }
        if self.outputs.len() != 1 {
            return Err(TransactionError::BadCoinbase(
                "must have exactly one output".to_string(),
            ));
        }
        if self.outputs[0].amount != COINBASE_REWARD {
            return Err(TransactionError::BadCoinbase(format!(
                "reward {} differs from {}",
                self.outputs[0].amount, COINBASE_REWARD
            )));
        }
        Ok(())
    }

    /// Total value of all outputs
    pub fn total_output(&self) -> u64 {
        self.outputs.iter().map(|o| o.amount).sum()
    }
}

/// Validate a block's transaction list against the UTXO snapshot taken
/// before the block's effects are applied.
///
/// The list must open with exactly one coinbase, which is checked for
/// shape (and signature-exempt); every other transaction must resolve
/// and sign its inputs and conserve value. Two inputs anywhere in the
/// list consuming the same output is a same-block double spend and is
/// rejected here rather than silently collapsed by the set update.
pub fn validate_block_transactions(
    transactions: &[Transaction],
    utxo_set: &UtxoSet,
    block_index: u64,
) -> Result<(), TransactionError> {
    match transactions.first() {
        Some(first) if first.is_coinbase() => first.validate_coinbase(block_index)?,
        _ => return Err(TransactionError::MissingCoinbase),
    }

    let mut consumed: HashSet<(String, u64)> = HashSet::new();

    for tx in &transactions[1..] {
        if tx.is_coinbase() {
            return Err(TransactionError::ExtraCoinbase { tx_id: tx.id.clone() });
        }

        tx.validate(utxo_set)?;

        for input in &tx.inputs {
            let key = (
                input.referenced_tx_id.clone(),
                input.referenced_output_index,
            );
            if !consumed.insert(key) {
                return Err(TransactionError::DoubleSpend {
                    tx_id: input.referenced_tx_id.clone(),
                    output_index: input.referenced_output_index,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(key_pair: &KeyPair) -> (Transaction, UtxoSet) {
        let coinbase = Transaction::coinbase(&key_pair.address(), 1);
        let set = UtxoSet::new().apply(std::slice::from_ref(&coinbase));
        (coinbase, set)
    }

    fn signed_spend(
        key_pair: &KeyPair,
        coinbase: &Transaction,
        set: &UtxoSet,
        receiver: &str,
        amount: u64,
    ) -> Transaction {
        let mut tx = Transaction::new(
            vec![TxInput {
                referenced_tx_id: coinbase.id.clone(),
                referenced_output_index: 0,
                signature: String::new(),
            }],
            vec![TxOutput {
                owner_address: receiver.to_string(),
                amount,
            }],
        );
        tx.inputs[0].signature = tx.sign_input(0, key_pair, set).unwrap();
        tx
    }

    #[test]
    fn test_coinbase_shape() {
        let tx = Transaction::coinbase("miner", 7);
        assert!(tx.is_coinbase());
        assert_eq!(tx.total_output(), COINBASE_REWARD);
        assert_eq!(tx.inputs[0].referenced_output_index, 7);
        tx.validate_coinbase(7).unwrap();
        assert!(tx.validate_coinbase(8).is_err());
    }

    #[test]
    fn test_coinbase_ids_unique_per_height() {
        let a = Transaction::coinbase("miner", 1);
        let b = Transaction::coinbase("miner", 2);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_id_depends_on_order() {
        let outputs = vec![
            TxOutput {
                owner_address: "a".to_string(),
                amount: 1,
            },
            TxOutput {
                owner_address: "b".to_string(),
                amount: 2,
            },
        ];
        let forward = Transaction::new(vec![], outputs.clone());
        let reversed = Transaction::new(vec![], outputs.into_iter().rev().collect());
        assert_ne!(forward.id, reversed.id);
    }

    #[test]
    fn test_id_is_stable() {
        let tx = Transaction::coinbase("miner", 3);
        assert_eq!(tx.compute_id(), tx.compute_id());
        assert_eq!(tx.id, tx.compute_id());
    }

    #[test]
    fn test_sign_missing_reference() {
        let key_pair = KeyPair::generate();
        let tx = Transaction::new(
            vec![TxInput {
                referenced_tx_id: "deadbeef".to_string(),
                referenced_output_index: 0,
                signature: String::new(),
            }],
            vec![],
        );
        let err = tx.sign_input(0, &key_pair, &UtxoSet::new()).unwrap_err();
        assert!(matches!(err, TransactionError::Reference { .. }));
    }

    #[test]
    fn test_sign_wrong_owner() {
        let owner = KeyPair::generate();
        let intruder = KeyPair::generate();
        let (coinbase, set) = funded(&owner);

        let tx = Transaction::new(
            vec![TxInput {
                referenced_tx_id: coinbase.id.clone(),
                referenced_output_index: 0,
                signature: String::new(),
            }],
            vec![],
        );
        let err = tx.sign_input(0, &intruder, &set).unwrap_err();
        assert!(matches!(err, TransactionError::Authorization { .. }));
    }

    #[test]
    fn test_signed_transaction_validates() {
        let key_pair = KeyPair::generate();
        let (coinbase, set) = funded(&key_pair);
        let tx = signed_spend(&key_pair, &coinbase, &set, "receiver", 50);
        tx.validate(&set).unwrap();
    }

    #[test]
    fn test_tampered_output_rejected() {
        let key_pair = KeyPair::generate();
        let (coinbase, set) = funded(&key_pair);
        let mut tx = signed_spend(&key_pair, &coinbase, &set, "receiver", 50);

        tx.outputs[0].amount = 49;
        assert!(matches!(
            tx.validate(&set),
            Err(TransactionError::IdMismatch { .. })
        ));
    }

    #[test]
    fn test_same_block_double_spend_rejected() {
        let key_pair = KeyPair::generate();
        let (coinbase, set) = funded(&key_pair);

        let first = signed_spend(&key_pair, &coinbase, &set, "receiver-a", 50);
        let second = signed_spend(&key_pair, &coinbase, &set, "receiver-b", 50);

        let block_txs = vec![Transaction::coinbase("miner", 2), first, second];
        let err = validate_block_transactions(&block_txs, &set, 2).unwrap_err();
        assert!(matches!(err, TransactionError::DoubleSpend { .. }));
    }

    #[test]
    fn test_inflating_transaction_rejected() {
        let key_pair = KeyPair::generate();
        let (coinbase, set) = funded(&key_pair);

        let tx = signed_spend(&key_pair, &coinbase, &set, "receiver", 1000);
        let err = tx.validate(&set).unwrap_err();
        assert!(matches!(
            err,
            TransactionError::ValueMismatch {
                consumed: 50,
                created: 1000,
                ..
            }
        ));

        let block_txs = vec![Transaction::coinbase("miner", 2), tx];
        assert!(validate_block_transactions(&block_txs, &set, 2).is_err());
    }

    #[test]
    fn test_block_requires_single_leading_coinbase() {
        let set = UtxoSet::new();

        let err = validate_block_transactions(&[], &set, 1).unwrap_err();
        assert!(matches!(err, TransactionError::MissingCoinbase));

        let doubled = vec![
            Transaction::coinbase("miner-a", 1),
            Transaction::coinbase("miner-b", 1),
        ];
        let err = validate_block_transactions(&doubled, &set, 1).unwrap_err();
        assert!(matches!(err, TransactionError::ExtraCoinbase { .. }));

        let single = vec![Transaction::coinbase("miner-a", 1)];
        validate_block_transactions(&single, &set, 1).unwrap();
    }

    #[test]
    fn test_sign_input_index_out_of_range() {
        let key_pair = KeyPair::generate();
        let (coinbase, set) = funded(&key_pair);

        let tx = Transaction::new(
            vec![TxInput {
                referenced_tx_id: coinbase.id.clone(),
                referenced_output_index: 0,
                signature: String::new(),
            }],
            vec![],
        );
        let err = tx.sign_input(5, &key_pair, &set).unwrap_err();
        assert!(matches!(err, TransactionError::InputIndex { input_index: 5, .. }));
    }
}
