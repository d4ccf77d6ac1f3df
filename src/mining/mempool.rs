//! Pending-transaction pool
//!
//! Insertion-ordered collection of transactions waiting for the next
//! block. Admission re-verifies every signature against the current UTXO
//! set; the pool is discarded wholesale when a block is accepted.

use crate::core::{Transaction, TransactionError, UtxoSet};
use thiserror::Error;

/// Pool admission errors
#[derive(Error, Debug)]
pub enum MempoolError {
    #[error("Transaction {0} already in pool")]
    Duplicate(String),
    #[error("Coinbase transactions are minted by blocks, not submitted")]
    CoinbaseNotAllowed,
    #[error("Input {tx_id}:{output_index} already spent by pooled transaction")]
    Conflict { tx_id: String, output_index: u64 },
    #[error("Transaction validation failed: {0}")]
    Validation(#[from] TransactionError),
}

/// The pending-transaction pool, in insertion order
#[derive(Debug, Default)]
pub struct Mempool {
    transactions: Vec<Transaction>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a transaction after validating it against the given UTXO
    /// snapshot: id integrity, input resolution, signatures, and no
    /// conflict with an input already claimed by a pooled transaction.
    pub fn submit(&mut self, tx: Transaction, utxo_set: &UtxoSet) -> Result<(), MempoolError> {
        if tx.is_coinbase() {
            return Err(MempoolError::CoinbaseNotAllowed);
        }
        if self.transactions.iter().any(|pooled| pooled.id == tx.id) {
            return Err(MempoolError::Duplicate(tx.id));
        }

        tx.validate(utxo_set)?;

        for input in &tx.inputs {
            let claimed = self.transactions.iter().flat_map(|p| p.inputs.iter()).any(|p| {
                p.referenced_tx_id == input.referenced_tx_id
                    && p.referenced_output_index == input.referenced_output_index
            });
            if claimed {
                return Err(MempoolError::Conflict {
                    tx_id: input.referenced_tx_id.clone(),
                    output_index: input.referenced_output_index,
                });
            }
        }

        log::debug!("pool admitted transaction {}", tx.id);
        self.transactions.push(tx);
        Ok(())
    }

    /// The pooled transactions in insertion order. The pool is not
    /// consumed by the read.
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.clone()
    }

    /// Drop the entire pool. Called only when a block has been accepted;
    /// pooled transactions the block did not include are dropped with it,
    /// not re-queued.
    pub fn clear(&mut self) {
        if !self.transactions.is_empty() {
            log::debug!("clearing {} pooled transactions", self.transactions.len());
        }
        self.transactions.clear();
    }

    pub fn contains(&self, tx_id: &str) -> bool {
        self.transactions.iter().any(|tx| tx.id == tx_id)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
