//! The wallet object the adapter talks to.
//!
//! Mirrors the `request` / `on` / `removeListener` surface of an injected
//! browser wallet. Only [`ProviderAdapter`](super::ProviderAdapter) holds one.

use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use std::sync::Arc;

use crate::error::MinterResult;
use crate::wallet::types::Receipt;

/// Callback invoked with the wallet's new account list.
pub type AccountsListener = Arc<dyn Fn(&[Address]) + Send + Sync>;

/// Handle for a registered accounts listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Ask the user to authorize accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> MinterResult<Vec<Address>>;

    /// Accounts already authorized, without prompting (`eth_accounts`).
    async fn accounts(&self) -> MinterResult<Vec<Address>>;

    async fn chain_id(&self) -> MinterResult<u64>;

    /// Read-only contract call (`eth_call`).
    async fn call(&self, from: Option<Address>, to: Address, data: Bytes) -> MinterResult<Bytes>;

    /// Sign and broadcast a transaction. Resolves once the hash is known.
    async fn send_transaction(&self, from: Address, to: Address, data: Bytes)
        -> MinterResult<TxHash>;

    /// Resolve once the transaction is mined. No timeout is imposed here.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> MinterResult<Receipt>;

    /// Register for `accountsChanged` notifications.
    fn on_accounts_changed(&self, listener: AccountsListener) -> ListenerId;

    /// Returns `true` if the listener was registered.
    fn remove_listener(&self, id: ListenerId) -> bool;
}
