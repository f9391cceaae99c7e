//! Wallet backed by a local private key and a JSON-RPC endpoint.
//!
//! Stands in for the browser-injected wallet when the coordinator is hosted
//! outside a browser.
//!
//! # Security
//! - Private keys are loaded ONLY from environment variables or explicit input
//! - Keys are never logged or serialized

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, timeout, Instant};

use crate::config::ChainConfig;
use crate::error::{MinterError, MinterResult};
use crate::wallet::provider::{AccountsListener, ListenerId, WalletProvider};
use crate::wallet::types::Receipt;

/// Wallet over a local signing key.
pub struct LocalWallet {
    provider: Arc<dyn Provider + Send + Sync>,
    /// `None` for a read-only wallet.
    signer_address: Option<Address>,
    chain_id: u64,
    /// Accounts the host has authorized so far.
    accounts: Mutex<Vec<Address>>,
    listeners: Mutex<HashMap<u64, AccountsListener>>,
    next_listener: AtomicU64,
    timeout_duration: Duration,
    poll_interval: Duration,
    /// How long a hash may stay unknown before it counts as dropped.
    drop_grace: Duration,
}

impl LocalWallet {
    /// Create a wallet. Without a signer it can only read.
    pub fn new(config: &ChainConfig, signer: Option<PrivateKeySigner>) -> MinterResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            MinterError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;

        let signer_address = signer.as_ref().map(|s| s.address());
        let provider: Arc<dyn Provider + Send + Sync> = match signer {
            Some(signer) => Arc::new(
                ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer))
                    .connect_http(url),
            ),
            None => Arc::new(ProviderBuilder::new().connect_http(url)),
        };

        tracing::info!(
            rpc_url = %config.rpc_url,
            chain_id = config.chain_id,
            account = ?signer_address,
            "Local wallet initialized"
        );

        Ok(Self {
            provider,
            signer_address,
            chain_id: config.chain_id,
            accounts: Mutex::new(Vec::new()),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            timeout_duration: Duration::from_secs(config.rpc_timeout_secs),
            poll_interval: Duration::from_millis(config.receipt_poll_interval_ms),
            drop_grace: Duration::from_millis(config.tx_drop_grace_ms),
        })
    }

    /// Create a wallet from a hex-encoded private key (with or without 0x).
    pub fn from_private_key(config: &ChainConfig, private_key_hex: &str) -> MinterResult<Self> {
        let key_hex = private_key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| MinterError::Wallet(format!("Invalid private key format: {}", e)))?;
        Self::new(config, Some(signer))
    }

    /// Load the key from `env_var`. Falls back to a read-only wallet when unset.
    pub fn from_env(config: &ChainConfig, env_var: &str) -> MinterResult<Self> {
        match std::env::var(env_var) {
            Ok(key) => Self::from_private_key(config, &key),
            Err(_) => {
                tracing::info!(env_var = env_var, "No private key set, wallet is read-only");
                Self::new(config, None)
            }
        }
    }

    /// Address of the signing key, if any.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    /// Replace the active account list and notify listeners, as a browser
    /// wallet does when the user switches or locks accounts.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock().unwrap_or_else(|e| e.into_inner()) = accounts.clone();
        let listeners: Vec<AccountsListener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for listener in listeners {
            listener(&accounts);
        }
    }

    fn current_accounts(&self) -> Vec<Address> {
        self.accounts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn timed<F, T, E>(&self, what: &str, fut: F) -> MinterResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(MinterError::Rpc(format!("{} failed: {}", what, e))),
            Err(_) => Err(MinterError::Rpc(format!(
                "{} timed out after {} seconds",
                what,
                self.timeout_duration.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> MinterResult<Vec<Address>> {
        let address = self.signer_address.ok_or(MinterError::NoWalletFound)?;
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if accounts.is_empty() {
            accounts.push(address);
        }
        Ok(accounts.clone())
    }

    async fn accounts(&self) -> MinterResult<Vec<Address>> {
        Ok(self.current_accounts())
    }

    async fn chain_id(&self) -> MinterResult<u64> {
        self.timed("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn call(&self, from: Option<Address>, to: Address, data: Bytes) -> MinterResult<Bytes> {
        let mut tx = TransactionRequest::default().with_to(to).with_input(data);
        if let Some(from) = from {
            tx = tx.with_from(from);
        }
        self.timed("eth_call", self.provider.call(tx)).await
    }

    async fn send_transaction(&self, from: Address, to: Address, data: Bytes) -> MinterResult<TxHash> {
        if self.signer_address != Some(from) || !self.current_accounts().contains(&from) {
            return Err(MinterError::Wallet(format!("Account {} is not authorized", from)));
        }

        let tx = TransactionRequest::default()
            .with_from(from)
            .with_to(to)
            .with_input(data)
            .with_chain_id(self.chain_id);

        let pending = self
            .timed("eth_sendRawTransaction", self.provider.send_transaction(tx))
            .await?;
        Ok(*pending.tx_hash())
    }

    /// Poll until mined. A hash the node does not know is reported as
    /// dropped only once it has stayed unknown for the whole grace period.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> MinterResult<Receipt> {
        let mut ticker = interval(self.poll_interval);
        // First tick completes immediately.
        ticker.tick().await;
        let mut unknown_since: Option<Instant> = None;

        loop {
            ticker.tick().await;

            let receipt = self
                .timed(
                    "eth_getTransactionReceipt",
                    self.provider.get_transaction_receipt(tx_hash),
                )
                .await?;
            if let Some(r) = receipt {
                return Ok(Receipt {
                    tx_hash,
                    block_number: r.block_number,
                    success: r.status(),
                });
            }

            let known = self
                .timed(
                    "eth_getTransactionByHash",
                    self.provider.get_transaction_by_hash(tx_hash),
                )
                .await?;
            if known.is_some() {
                unknown_since = None;
                tracing::debug!(tx_hash = %tx_hash, "Transaction pending");
                continue;
            }

            let since = *unknown_since.get_or_insert_with(Instant::now);
            if since.elapsed() >= self.drop_grace {
                tracing::warn!(
                    tx_hash = %tx_hash,
                    grace_ms = self.drop_grace.as_millis() as u64,
                    "Transaction unknown to node, treating as dropped"
                );
                return Err(MinterError::TxDropped(tx_hash.to_string()));
            }
            tracing::debug!(tx_hash = %tx_hash, "Transaction not yet visible to node");
        }
    }

    fn on_accounts_changed(&self, listener: AccountsListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, listener);
        ListenerId(id)
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id.0)
            .is_some()
    }
}

impl std::fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWallet")
            .field("account", &self.signer_address)
            .field("chain_id", &self.chain_id)
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .field("drop_grace_ms", &self.drop_grace.as_millis())
            .finish()
    }
}
