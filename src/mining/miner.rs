//! Proof-of-work search
//!
//! The nonce search is unbounded and CPU-bound, so it never runs on the
//! async runtime directly. The node dispatches it to a blocking worker
//! and hands it a cancellation token plus a deadline; a competing block
//! accepted first cancels the search mid-flight.

use crate::core::{Block, Transaction};
use crate::crypto::hash_meets_difficulty;
use log::{debug, info};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Nonces tried between checks of the cancellation token and deadline
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Result of a proof-of-work search
#[derive(Debug, Clone)]
pub enum MineOutcome {
    /// A nonce satisfying the difficulty was found
    Found(Block),
    /// The search was superseded by a competing accepted block
    Cancelled,
    /// The deadline passed before a satisfying nonce was found
    TimedOut,
}

/// Statistics of a finished (or abandoned) search
#[derive(Debug, Clone)]
pub struct MiningStats {
    /// Number of hash attempts
    pub hash_attempts: u64,
    /// Time taken in milliseconds
    pub time_ms: u128,
    /// Hashes per second
    pub hash_rate: f64,
}

/// Search nonces from 0 upward until the block's content hash carries
/// `difficulty` leading zero bits, the token is cancelled, or the
/// deadline passes.
pub fn search(
    index: u64,
    previous_hash: String,
    timestamp: i64,
    transactions: Vec<Transaction>,
    difficulty: u32,
    miner_address: String,
    cancel: CancellationToken,
    deadline: Instant,
) -> (MineOutcome, MiningStats) {
    let start = Instant::now();
    info!("mining block {} at difficulty {}", index, difficulty);

    let mut nonce: u64 = 0;
    loop {
        if nonce % CANCEL_CHECK_INTERVAL == 0 {
            if cancel.is_cancelled() {
                debug!("mining of block {} cancelled after {} attempts", index, nonce);
                return (MineOutcome::Cancelled, stats(nonce, start));
            }
            if Instant::now() >= deadline {
                debug!("mining of block {} timed out after {} attempts", index, nonce);
                return (MineOutcome::TimedOut, stats(nonce, start));
            }
        }

        let hash = Block::content_hash(
            index,
            &previous_hash,
            timestamp,
            &transactions,
            difficulty,
            nonce,
        );
        // Our own hex output cannot contain non-hex characters; a decoding
        // failure is treated as not meeting the difficulty.
        if hash_meets_difficulty(&hash, difficulty).unwrap_or(false) {
            let block = Block {
                index,
                transactions,
                timestamp,
                difficulty,
                nonce,
                previous_hash,
                hash,
                miner_address,
            };
            let stats = stats(nonce + 1, start);
            info!(
                "block {} mined in {}ms ({} attempts, {:.2} H/s)",
                index, stats.time_ms, stats.hash_attempts, stats.hash_rate
            );
            return (MineOutcome::Found(block), stats);
        }

        nonce += 1;
    }
}

fn stats(attempts: u64, start: Instant) -> MiningStats {
    let time_ms = start.elapsed().as_millis();
    let hash_rate = if time_ms > 0 {
        attempts as f64 / (time_ms as f64 / 1000.0)
    } else {
        attempts as f64
    };
    MiningStats {
        hash_attempts: attempts,
        time_ms,
        hash_rate,
    }
}
