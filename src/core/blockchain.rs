//! Chain engine: candidate validation, chain extension, difficulty retarget
//!
//! The chain is append-only. A candidate block moves through the checks in
//! a fixed order (structure, linkage, timestamp, hash, transactions) and
//! the first failure rejects it for good; nothing is retried. An accepted
//! block is appended and the UTXO set derived from it is swapped in
//! wholesale.

use crate::core::block::{current_timestamp, Block};
use crate::core::transaction::{validate_block_transactions, TransactionError};
use crate::core::utxo::UtxoSet;
use crate::crypto::{hash_meets_difficulty, EncodingError};
use thiserror::Error;

/// Target seconds between blocks
pub const BLOCK_GENERATION_INTERVAL: i64 = 10;

/// Number of blocks between difficulty adjustments
pub const DIFFICULTY_ADJUSTMENT_INTERVAL: u64 = 10;

/// Allowed clock drift when validating block timestamps, in seconds
pub const TIMESTAMP_TOLERANCE: i64 = 60;

/// Why a candidate block was rejected. Checks run in declaration order
/// and short-circuit on the first failure.
#[derive(Error, Debug)]
pub enum BlockError {
    #[error("Malformed block: {0}")]
    Structure(String),
    #[error("Broken linkage: {0}")]
    Linkage(String),
    #[error("Timestamp {candidate} out of range of {previous}")]
    Timestamp { candidate: i64, previous: i64 },
    #[error("Declared hash {declared} does not match content hash {computed}")]
    HashMismatch { declared: String, computed: String },
    #[error("Hash {hash} does not meet difficulty {required}")]
    DifficultyNotMet { hash: String, required: u32 },
    #[error("Hash encoding error: {0}")]
    Encoding(#[from] EncodingError),
    #[error("Invalid transaction in block: {0}")]
    Transaction(#[from] TransactionError),
}

/// The chain plus the UTXO set derived from it
#[derive(Debug, Clone)]
pub struct Blockchain {
    blocks: Vec<Block>,
    utxo_set: UtxoSet,
}

impl Blockchain {
    /// Create a chain holding only the genesis block
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::genesis()],
            utxo_set: UtxoSet::new(),
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The latest accepted block
    pub fn latest_block(&self) -> &Block {
        self.blocks.last().expect("chain always holds genesis")
    }

    /// Height of the chain (genesis is height 0)
    pub fn height(&self) -> u64 {
        self.blocks.len() as u64 - 1
    }

    /// Snapshot of the current UTXO set
    pub fn utxo_set(&self) -> &UtxoSet {
        &self.utxo_set
    }

    /// Difficulty required of the next block.
    ///
    /// The latest block's difficulty, except at retarget heights (strictly
    /// positive multiples of the adjustment interval) where the window of
    /// recent block times is inspected.
    pub fn current_difficulty(&self) -> u32 {
        let latest = self.latest_block();
        if latest.index % DIFFICULTY_ADJUSTMENT_INTERVAL == 0
            && latest.index != 0
            && self.blocks.len() > DIFFICULTY_ADJUSTMENT_INTERVAL as usize
        {
            self.adjusted_difficulty()
        } else {
            latest.difficulty
        }
    }

    /// Compare the time the last adjustment window actually took against
    /// the expected window and nudge difficulty by one in response.
    fn adjusted_difficulty(&self) -> u32 {
        let window_start = &self.blocks[self.blocks.len() - DIFFICULTY_ADJUSTMENT_INTERVAL as usize];
        let expected = BLOCK_GENERATION_INTERVAL * DIFFICULTY_ADJUSTMENT_INTERVAL as i64;
        let actual = self.latest_block().timestamp - window_start.timestamp;

        if actual < expected / 2 {
            window_start.difficulty + 1
        } else if actual > expected * 2 {
            window_start.difficulty.saturating_sub(1)
        } else {
            window_start.difficulty
        }
    }

    /// Validate a candidate against the current latest block.
    ///
    /// Ordered checks, first failure wins: structure, linkage, timestamp,
    /// then hash (content match before difficulty). Transaction-level
    /// validation happens on acceptance, against the pre-block UTXO set.
    pub fn validate_candidate(&self, candidate: &Block) -> Result<(), BlockError> {
        let previous = self.latest_block();

        check_structure(candidate)?;

        if candidate.index != previous.index + 1 {
            return Err(BlockError::Linkage(format!(
                "index {} does not follow {}",
                candidate.index, previous.index
            )));
        }
        if candidate.previous_hash != previous.hash {
            return Err(BlockError::Linkage(format!(
                "previous hash {} is not the latest block's hash",
                candidate.previous_hash
            )));
        }

        if previous.timestamp - TIMESTAMP_TOLERANCE >= candidate.timestamp
            || candidate.timestamp - TIMESTAMP_TOLERANCE >= current_timestamp()
        {
            return Err(BlockError::Timestamp {
                candidate: candidate.timestamp,
                previous: previous.timestamp,
            });
        }

        let computed = candidate.recompute_hash();
        if computed != candidate.hash {
            return Err(BlockError::HashMismatch {
                declared: candidate.hash.clone(),
                computed,
            });
        }
        if !hash_meets_difficulty(&candidate.hash, candidate.difficulty)? {
            return Err(BlockError::DifficultyNotMet {
                hash: candidate.hash.clone(),
                required: candidate.difficulty,
            });
        }

        Ok(())
    }

    /// Validate and append a candidate block.
    ///
    /// On success the UTXO set derived from the block replaces the current
    /// one atomically with the append; on failure no state changes.
    pub fn add_block(&mut self, block: Block) -> Result<(), BlockError> {
        self.validate_candidate(&block)?;
        validate_block_transactions(&block.transactions, &self.utxo_set, block.index)?;

        self.utxo_set = self.utxo_set.apply(&block.transactions);
        log::info!(
            "accepted block {} ({} txs, difficulty {})",
            block.index,
            block.transactions.len(),
            block.difficulty
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Check the hash-linkage invariants over the whole chain
    pub fn is_valid(&self) -> bool {
        if self.blocks[0] != Block::genesis() {
            return false;
        }
        for pair in self.blocks.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            if current.index != previous.index + 1
                || current.previous_hash != previous.hash
                || current.recompute_hash() != current.hash
                || !hash_meets_difficulty(&current.hash, current.difficulty).unwrap_or(false)
            {
                return false;
            }
        }
        true
    }

    /// Sum of amounts owned by `address` in the current UTXO set
    pub fn balance_of(&self, address: &str) -> u64 {
        self.utxo_set.balance_of(address)
    }
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

fn check_structure(block: &Block) -> Result<(), BlockError> {
    if block.hash.is_empty() {
        return Err(BlockError::Structure("empty hash".to_string()));
    }
    if block.previous_hash.is_empty() {
        return Err(BlockError::Structure("empty previous hash".to_string()));
    }
    if block.transactions.iter().any(|tx| tx.id.is_empty()) {
        return Err(BlockError::Structure(
            "transaction with empty id".to_string(),
        ));
    }
    Ok(())
}
