//! Wallet: keys, coin selection, and transaction assembly

pub mod wallet;

pub use wallet::{select_outputs_for_amount, Wallet, WalletError};
