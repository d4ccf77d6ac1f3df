//! The node service: single owner of chain, UTXO set, and pool
//!
//! All three shared resources live behind one lock, so a block append,
//! the UTXO swap, and the pool clear are observed atomically by readers.
//! Every mutation goes through a `Node` method; the proof-of-work search
//! runs on a blocking worker holding a cancellation token so a competing
//! accepted block can supersede it.

pub mod events;

pub use events::{EventBus, NodeEvent};

use crate::core::{
    current_timestamp, Block, BlockError, Blockchain, Transaction, UnspentOutput,
};
use crate::crypto::KeyError;
use crate::mining::{miner, MempoolError, Mempool, MineOutcome};
use crate::wallet::{Wallet, WalletError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

/// Node-level errors
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Block rejected: {0}")]
    Block(#[from] BlockError),
    #[error("Transaction rejected: {0}")]
    Mempool(#[from] MempoolError),
    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
    #[error("Mining superseded by a competing block")]
    MiningCancelled,
    #[error("Mining timed out before a satisfying nonce was found")]
    MiningTimeout,
    #[error("Mining task failed: {0}")]
    MiningTask(String),
}

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Upper bound on a single proof-of-work search
    pub mining_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            mining_timeout: Duration::from_secs(600),
        }
    }
}

/// The three shared mutable resources, guarded together
struct LedgerState {
    chain: Blockchain,
    pool: Mempool,
}

/// A single-node ledger service
pub struct Node {
    config: NodeConfig,
    state: Arc<RwLock<LedgerState>>,
    events: EventBus,
    /// Token of the search currently in flight, if any
    active_search: Mutex<Option<CancellationToken>>,
}

impl Node {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(LedgerState {
                chain: Blockchain::new(),
                pool: Mempool::new(),
            })),
            events: EventBus::new(),
            active_search: Mutex::new(None),
        }
    }

    /// Subscribe to ledger events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }

    /// The full chain, genesis first
    pub async fn chain(&self) -> Vec<Block> {
        self.state.read().await.chain.blocks().to_vec()
    }

    /// Height of the chain
    pub async fn height(&self) -> u64 {
        self.state.read().await.chain.height()
    }

    /// The current unspent-output set
    pub async fn utxo_set(&self) -> Vec<UnspentOutput> {
        self.state.read().await.chain.utxo_set().entries()
    }

    /// The pending transactions, in submission order
    pub async fn mempool(&self) -> Vec<Transaction> {
        self.state.read().await.pool.snapshot()
    }

    /// Spendable balance of an address
    pub async fn balance_of(&self, address: &str) -> u64 {
        self.state.read().await.chain.balance_of(address)
    }

    /// Check a candidate block against the current latest block
    pub async fn validate_candidate(&self, candidate: &Block) -> bool {
        self.state.read().await.chain.validate_candidate(candidate).is_ok()
    }

    /// Build a signed transaction from the caller's key and admit it to
    /// the pool.
    pub async fn submit_transaction(
        &self,
        receiver: &str,
        amount: u64,
        private_key_hex: &str,
    ) -> Result<Transaction, NodeError> {
        let wallet = Wallet::from_private_key(private_key_hex)?;

        let tx = {
            let mut state = self.state.write().await;
            let LedgerState { chain, pool } = &mut *state;
            let tx = wallet.create_transaction(receiver, amount, chain.utxo_set())?;
            pool.submit(tx.clone(), chain.utxo_set())?;
            tx
        };

        self.events.notify(NodeEvent::TransactionSubmitted {
            transaction: tx.clone(),
        });
        Ok(tx)
    }

    /// Validate and append an externally produced candidate block.
    ///
    /// On acceptance the pool is cleared wholesale and any in-flight
    /// mining search is cancelled (superseded).
    pub async fn submit_block(&self, block: Block) -> Result<Block, NodeError> {
        self.accept(block).await
    }

    /// Assemble coinbase plus the full pool contents, run the
    /// proof-of-work search off the async runtime, and append the result.
    pub async fn mine_next(&self, reward_address: &str) -> Result<Block, NodeError> {
        let (index, previous_hash, transactions, difficulty) = {
            let state = self.state.read().await;
            let latest = state.chain.latest_block();
            let index = latest.index + 1;
            let mut transactions = vec![Transaction::coinbase(reward_address, index)];
            transactions.extend(state.pool.snapshot());
            (
                index,
                latest.hash.clone(),
                transactions,
                state.chain.current_difficulty(),
            )
        };

        let token = CancellationToken::new();
        if let Some(previous) = self.active_search.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        let deadline = Instant::now() + self.config.mining_timeout;
        let timestamp = current_timestamp();
        let address = reward_address.to_string();
        let search_token = token.clone();
        let (outcome, _stats) = tokio::task::spawn_blocking(move || {
            miner::search(
                index,
                previous_hash,
                timestamp,
                transactions,
                difficulty,
                address,
                search_token,
                deadline,
            )
        })
        .await
        .map_err(|e| NodeError::MiningTask(e.to_string()))?;

        match outcome {
            MineOutcome::Found(block) => self.accept(block).await,
            MineOutcome::Cancelled => Err(NodeError::MiningCancelled),
            MineOutcome::TimedOut => Err(NodeError::MiningTimeout),
        }
    }

    async fn accept(&self, block: Block) -> Result<Block, NodeError> {
        {
            let mut state = self.state.write().await;
            state.chain.add_block(block.clone())?;
            state.pool.clear();
        }

        // Supersede any search still running against the old chain tip
        if let Some(token) = self.active_search.lock().await.take() {
            token.cancel();
        }

        self.events.notify(NodeEvent::BlockAccepted {
            block: block.clone(),
        });
        Ok(block)
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(NodeConfig::default())
    }
}
