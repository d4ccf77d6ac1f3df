//! Core ledger types: blocks, transactions, the UTXO set, and the chain

pub mod block;
pub mod blockchain;
pub mod transaction;
pub mod utxo;

pub use block::{current_timestamp, Block, GENESIS_TIMESTAMP};
pub use blockchain::{
    BlockError, Blockchain, BLOCK_GENERATION_INTERVAL, DIFFICULTY_ADJUSTMENT_INTERVAL,
    TIMESTAMP_TOLERANCE,
};
pub use transaction::{
    validate_block_transactions, Transaction, TransactionError, TxInput, TxOutput, COINBASE_REWARD,
};
pub use utxo::{UnspentOutput, UtxoSet};
