//! Picochain: a single-node proof-of-work UTXO ledger
//!
//! A hash-linked chain of blocks, each carrying signed transactions and
//! extended through a proof-of-work puzzle. Balances are derived from an
//! unspent-output set that is recomputed from each accepted block.
//!
//! - secp256k1 ECDSA signatures; the hex public key is the address
//! - SHA-256 content hashing with a leading-zero-bits difficulty target
//! - insertion-ordered mempool, discarded wholesale on each block
//! - an async node service serializing all mutations and running the
//!   nonce search on a cancellable background worker
//!
//! # Example
//!
//! ```no_run
//! use picochain::node::Node;
//! use picochain::wallet::Wallet;
//!
//! #[tokio::main]
//! async fn main() {
//!     let node = Node::default();
//!     let wallet = Wallet::new();
//!
//!     let block = node.mine_next(&wallet.address()).await.unwrap();
//!     println!("mined block {} -> {}", block.index, block.hash);
//!     println!("balance: {}", node.balance_of(&wallet.address()).await);
//! }
//! ```

pub mod core;
pub mod crypto;
pub mod mining;
pub mod node;
pub mod wallet;

// Re-export commonly used types
pub use core::{
    Block, BlockError, Blockchain, Transaction, TransactionError, TxInput, TxOutput,
    UnspentOutput, UtxoSet, COINBASE_REWARD,
};
pub use crypto::KeyPair;
pub use mining::{Mempool, MineOutcome, MiningStats};
pub use node::{Node, NodeConfig, NodeError, NodeEvent};
pub use wallet::Wallet;
