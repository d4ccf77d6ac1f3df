//! Wallet: key management, coin selection, transaction assembly
//!
//! A wallet owns one secp256k1 key pair. Its hex-encoded public key is
//! the account address, and the outputs it may spend are whatever the
//! UTXO set currently assigns to that address.

use crate::core::{Transaction, TransactionError, TxInput, TxOutput, UnspentOutput, UtxoSet};
use crate::crypto::{KeyError, KeyPair};
use thiserror::Error;

/// Wallet-related errors
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Transaction error: {0}")]
    Transaction(#[from] TransactionError),
    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

/// Consume outputs in the order supplied until the cumulative amount
/// covers the request, returning the selection and the change amount.
///
/// Sufficiency is the caller's concern: when the supplied outputs cannot
/// cover `amount`, the full list comes back with zero change and no error
/// is signaled here.
pub fn select_outputs_for_amount(
    amount: u64,
    owned: Vec<UnspentOutput>,
) -> (Vec<UnspentOutput>, u64) {
    let mut selected = Vec::new();
    let mut accumulated = 0u64;

    for utxo in owned {
        accumulated += utxo.amount;
        selected.push(utxo);
        if accumulated >= amount {
            return (selected, accumulated - amount);
        }
    }
    (selected, 0)
}

/// A ledger wallet holding a single key pair
pub struct Wallet {
    key_pair: KeyPair,
}

impl Wallet {
    /// Create a wallet with a fresh key pair
    pub fn new() -> Self {
        Self {
            key_pair: KeyPair::generate(),
        }
    }

    /// Import a wallet from a hex-encoded private key
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, WalletError> {
        Ok(Self {
            key_pair: KeyPair::from_private_key_hex(private_key_hex)?,
        })
    }

    /// The account address: hex-encoded public key
    pub fn address(&self) -> String {
        self.key_pair.address()
    }

    /// The private key as hex. Keep it secret.
    pub fn private_key(&self) -> String {
        self.key_pair.private_key_hex()
    }

    /// Spendable balance under the given UTXO snapshot
    pub fn balance(&self, utxo_set: &UtxoSet) -> u64 {
        utxo_set.balance_of(&self.address())
    }

    /// Build and sign a transaction sending `amount` to `receiver`.
    ///
    /// Under-funded requests are rejected up front rather than producing
    /// a transaction that can never validate. Change, if any, returns to
    /// this wallet as a second output.
    pub fn create_transaction(
        &self,
        receiver: &str,
        amount: u64,
        utxo_set: &UtxoSet,
    ) -> Result<Transaction, WalletError> {
        let owned = utxo_set.owned_by(&self.address());
        let have: u64 = owned.iter().map(|u| u.amount).sum();
        if have < amount {
            return Err(WalletError::InsufficientFunds { have, need: amount });
        }

        let (selected, change) = select_outputs_for_amount(amount, owned);

        let inputs = selected
            .iter()
            .map(|utxo| TxInput {
                referenced_tx_id: utxo.tx_id.clone(),
                referenced_output_index: utxo.output_index,
                signature: String::new(),
            })
            .collect();

        let mut outputs = vec![TxOutput {
            owner_address: receiver.to_string(),
            amount,
        }];
        if change > 0 {
            outputs.push(TxOutput {
                owner_address: self.address(),
                amount: change,
            });
        }

        // Signatures sign the id, and the id covers references and
        // outputs only, so signing after assembly leaves the id stable.
        let mut tx = Transaction::new(inputs, outputs);
        let signatures: Result<Vec<String>, TransactionError> = (0..tx.inputs.len())
            .map(|index| tx.sign_input(index, &self.key_pair, utxo_set))
            .collect();
        for (input, signature) in tx.inputs.iter_mut().zip(signatures?) {
            input.signature = signature;
        }

        Ok(tx)
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_wallet() -> (Wallet, UtxoSet) {
        let wallet = Wallet::new();
        let coinbase = Transaction::coinbase(&wallet.address(), 1);
        let set = UtxoSet::new().apply(&[coinbase]);
        (wallet, set)
    }

    #[test]
    fn test_address_round_trip() {
        let wallet = Wallet::new();
        let restored = Wallet::from_private_key(&wallet.private_key()).unwrap();
        assert_eq!(wallet.address(), restored.address());
    }

    #[test]
    fn test_selection_returns_change() {
        let owned = vec![
            UnspentOutput {
                tx_id: "a".to_string(),
                output_index: 0,
                owner_address: "me".to_string(),
                amount: 20,
            },
            UnspentOutput {
                tx_id: "b".to_string(),
                output_index: 0,
                owner_address: "me".to_string(),
                amount: 40,
            },
        ];
        let (selected, change) = select_outputs_for_amount(30, owned);
        assert_eq!(selected.len(), 2);
        assert_eq!(change, 30);
    }

    #[test]
    fn test_selection_does_not_signal_insufficiency() {
        let owned = vec![UnspentOutput {
            tx_id: "a".to_string(),
            output_index: 0,
            owner_address: "me".to_string(),
            amount: 10,
        }];
        let (selected, change) = select_outputs_for_amount(100, owned);
        assert_eq!(selected.len(), 1);
        assert_eq!(change, 0);
    }

    #[test]
    fn test_send_with_change() {
        let (wallet, set) = funded_wallet();
        let receiver = Wallet::new();

        let tx = wallet
            .create_transaction(&receiver.address(), 30, &set)
            .unwrap();

        assert_eq!(tx.outputs.len(), 2);
        assert_eq!(tx.outputs[0].owner_address, receiver.address());
        assert_eq!(tx.outputs[0].amount, 30);
        assert_eq!(tx.outputs[1].owner_address, wallet.address());
        assert_eq!(tx.outputs[1].amount, 20);

        // Signature verifies against the sender and the id is stable
        tx.validate(&set).unwrap();
        assert_eq!(tx.id, tx.compute_id());
    }

    #[test]
    fn test_exact_send_has_no_change_output() {
        let (wallet, set) = funded_wallet();
        let tx = wallet.create_transaction("receiver", 50, &set).unwrap();
        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.total_output(), 50);
    }

    #[test]
    fn test_underfunded_request_rejected() {
        let (wallet, set) = funded_wallet();
        let err = wallet.create_transaction("receiver", 51, &set).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { have: 50, need: 51 }
        ));
    }
}
