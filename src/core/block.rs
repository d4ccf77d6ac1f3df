//! Block structure and content hashing
//!
//! A block commits to its position in the chain, its transaction list, and
//! the proof-of-work parameters through a single SHA-256 content hash.

use crate::core::transaction::Transaction;
use crate::crypto::sha256_hex;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Timestamp of the fixed genesis block
pub const GENESIS_TIMESTAMP: i64 = 1465154705;

/// A block in the chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Height of this block; genesis is 0
    pub index: u64,
    /// Transactions applied by this block, coinbase first
    pub transactions: Vec<Transaction>,
    /// Creation time, unix seconds
    pub timestamp: i64,
    /// Leading zero bits required of `hash`
    pub difficulty: u32,
    /// Proof-of-work counter
    pub nonce: u64,
    /// Hash of the preceding block; empty for genesis
    pub previous_hash: String,
    /// Content hash of this block
    pub hash: String,
    /// Address credited by the coinbase transaction
    pub miner_address: String,
}

impl Block {
    /// Deterministic hash over the block fields, concatenated in fixed
    /// order. The transaction list contributes its ids in order, so any
    /// reordering or substitution changes the hash.
    pub fn content_hash(
        index: u64,
        previous_hash: &str,
        timestamp: i64,
        transactions: &[Transaction],
        difficulty: u32,
        nonce: u64,
    ) -> String {
        let tx_content: String = transactions.iter().map(|tx| tx.id.as_str()).collect();
        sha256_hex(
            format!(
                "{}{}{}{}{}{}",
                index, previous_hash, timestamp, tx_content, difficulty, nonce
            )
            .as_bytes(),
        )
    }

    /// The fixed genesis block: empty transaction list, zero difficulty,
    /// empty previous hash, constant timestamp. Its hash is fully
    /// determined by those constants.
    pub fn genesis() -> Self {
        let hash = Self::content_hash(0, "", GENESIS_TIMESTAMP, &[], 0, 0);
        Self {
            index: 0,
            transactions: Vec::new(),
            timestamp: GENESIS_TIMESTAMP,
            difficulty: 0,
            nonce: 0,
            previous_hash: String::new(),
            hash,
            miner_address: String::new(),
        }
    }

    /// Recompute the content hash from the stored fields
    pub fn recompute_hash(&self) -> String {
        Self::content_hash(
            self.index,
            &self.previous_hash,
            self.timestamp,
            &self.transactions,
            self.difficulty,
            self.nonce,
        )
    }
}

/// Current wall-clock time in unix seconds
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}
