//! Provider adapter: the only code that touches the wallet object.
//!
//! # Session Transitions
//! ```text
//! accounts == []                      → Disconnected (epoch + 1)
//! accounts[0] != current account      → AccountChanged (epoch + 1)
//! accounts[0] == current account      → Unchanged
//! ```
//!
//! Signers are minted for one epoch. Once the epoch moves on they refuse to
//! send, so a signer for a previous account can never be reused.

use alloy::primitives::{Address, Bytes, TxHash};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::error::{MinterError, MinterResult};
use crate::wallet::provider::{ListenerId, WalletProvider};
use crate::wallet::types::{network_name, Receipt, Session, SessionChange};

/// Callback for session changes.
pub type SessionHandler = Arc<dyn Fn(&SessionChange) + Send + Sync>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct SessionSlot {
    current: Option<Session>,
    epoch: u64,
}

#[derive(Default)]
struct AdapterShared {
    session: Mutex<SessionSlot>,
    handlers: Mutex<HashMap<u64, SessionHandler>>,
    next_handler: AtomicU64,
}

impl AdapterShared {
    /// Apply a new account list. `network` overrides the stored network name
    /// when known.
    fn transition(&self, accounts: &[Address], network: Option<String>) -> SessionChange {
        let mut slot = lock(&self.session);
        let previous = slot.current.clone();

        let change = match accounts.first() {
            None => {
                slot.epoch += 1;
                SessionChange::Disconnected(Session::disconnected(slot.epoch))
            }
            Some(primary) => match previous {
                Some(ref s) if s.connected && s.account == Some(*primary) => {
                    let mut same = s.clone();
                    if network.is_some() {
                        same.network = network;
                    }
                    SessionChange::Unchanged(same)
                }
                _ => {
                    slot.epoch += 1;
                    let network = network.or_else(|| previous.and_then(|s| s.network));
                    SessionChange::AccountChanged(Session::connected(*primary, network, slot.epoch))
                }
            },
        };

        slot.current = Some(change.session().clone());
        change
    }

    fn notify(&self, change: &SessionChange) {
        // Snapshot so handlers may subscribe or unsubscribe re-entrantly.
        let handlers: Vec<SessionHandler> = lock(&self.handlers).values().cloned().collect();
        for handler in handlers {
            handler(change);
        }
    }

    fn is_current(&self, account: Address, epoch: u64) -> bool {
        let slot = lock(&self.session);
        match &slot.current {
            Some(s) => s.connected && s.epoch == epoch && s.account == Some(account),
            None => false,
        }
    }
}

/// Owned subscription to session changes.
///
/// Dropping it unsubscribes.
pub struct Subscription {
    shared: Weak<AdapterShared>,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Remove the handler now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.handlers).remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

/// Read-only access to the chain. Needs no account.
#[derive(Clone)]
pub struct WalletReader {
    provider: Arc<dyn WalletProvider>,
}

impl WalletReader {
    pub async fn call(&self, from: Option<Address>, to: Address, data: Bytes) -> MinterResult<Bytes> {
        self.provider.call(from, to, data).await
    }

    pub async fn wait_for_receipt(&self, tx_hash: TxHash) -> MinterResult<Receipt> {
        self.provider.wait_for_receipt(tx_hash).await
    }
}

/// Signing identity bound to one session epoch.
#[derive(Clone)]
pub struct WalletSigner {
    provider: Arc<dyn WalletProvider>,
    shared: Arc<AdapterShared>,
    account: Address,
    epoch: u64,
}

impl WalletSigner {
    pub fn address(&self) -> Address {
        self.account
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether this signer still belongs to the active session.
    pub fn is_current(&self) -> bool {
        self.shared.is_current(self.account, self.epoch)
    }

    pub async fn send_transaction(&self, to: Address, data: Bytes) -> MinterResult<TxHash> {
        if !self.is_current() {
            tracing::warn!(account = %self.account, epoch = self.epoch, "Refusing to use stale signer");
            return Err(MinterError::StaleSigner(self.account));
        }
        self.provider.send_transaction(self.account, to, data).await
    }
}

impl std::fmt::Debug for WalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSigner")
            .field("account", &self.account)
            .field("epoch", &self.epoch)
            .finish()
    }
}

/// Wraps the injected wallet and tracks the session.
pub struct ProviderAdapter {
    provider: Option<Arc<dyn WalletProvider>>,
    shared: Arc<AdapterShared>,
    listener: Option<ListenerId>,
}

impl ProviderAdapter {
    /// Create an adapter. `None` means no wallet is installed.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let shared = Arc::new(AdapterShared::default());

        let listener = provider.as_ref().map(|p| {
            let shared = shared.clone();
            p.on_accounts_changed(Arc::new(move |accounts: &[Address]| {
                let change = shared.transition(accounts, None);
                match &change {
                    SessionChange::Disconnected(_) => tracing::info!("Wallet reported no accounts, session closed"),
                    SessionChange::AccountChanged(s) => tracing::info!(
                        account = ?s.account,
                        epoch = s.epoch,
                        "Wallet switched account"
                    ),
                    SessionChange::Unchanged(_) => tracing::debug!("Wallet account list refreshed"),
                }
                shared.notify(&change);
            }))
        });

        Self {
            provider,
            shared,
            listener,
        }
    }

    /// Whether a wallet is present.
    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    fn provider(&self) -> MinterResult<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(MinterError::NoWalletFound)
    }

    /// Prompt the wallet for accounts and establish a session.
    pub async fn connect(&self) -> MinterResult<Session> {
        let provider = self.provider()?;
        let accounts = provider.request_accounts().await?;
        if accounts.is_empty() {
            return Err(MinterError::UserRejected);
        }
        let network = self.network(provider).await;
        let change = self.shared.transition(&accounts, network);
        tracing::info!(account = ?change.session().account, "Wallet connected");
        self.shared.notify(&change);
        Ok(change.session().clone())
    }

    /// Re-establish a session the wallet already authorized, without prompting.
    pub async fn restore(&self) -> MinterResult<Option<Session>> {
        let provider = self.provider()?;
        let accounts = provider.accounts().await?;
        if accounts.is_empty() {
            return Ok(None);
        }
        let network = self.network(provider).await;
        let change = self.shared.transition(&accounts, network);
        self.shared.notify(&change);
        Ok(Some(change.session().clone()))
    }

    async fn network(&self, provider: &Arc<dyn WalletProvider>) -> Option<String> {
        match provider.chain_id().await {
            Ok(id) => Some(network_name(id)),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read chain id");
                None
            }
        }
    }

    /// Current session, if any. Never prompts.
    pub fn session(&self) -> Option<Session> {
        lock(&self.shared.session).current.clone()
    }

    /// Forget the session locally.
    pub fn disconnect(&self) -> Session {
        let change = self.shared.transition(&[], None);
        self.shared.notify(&change);
        change.session().clone()
    }

    /// Register a handler for session changes.
    pub fn subscribe_account_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&SessionChange) + Send + Sync + 'static,
    {
        let id = self.shared.next_handler.fetch_add(1, Ordering::SeqCst);
        lock(&self.shared.handlers).insert(id, Arc::new(handler));
        Subscription {
            shared: Arc::downgrade(&self.shared),
            id,
            active: true,
        }
    }

    /// Number of live session subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.shared.handlers).len()
    }

    pub fn reader(&self) -> MinterResult<WalletReader> {
        Ok(WalletReader {
            provider: self.provider()?.clone(),
        })
    }

    /// Signer for the current session.
    pub fn signer(&self) -> MinterResult<WalletSigner> {
        let provider = self.provider()?.clone();
        let session = self.session().filter(|s| s.connected).ok_or(MinterError::NotConnected)?;
        let account = session.account.ok_or(MinterError::NotConnected)?;
        Ok(WalletSigner {
            provider,
            shared: self.shared.clone(),
            account,
            epoch: session.epoch,
        })
    }
}

impl Drop for ProviderAdapter {
    fn drop(&mut self) {
        if let (Some(provider), Some(id)) = (&self.provider, self.listener.take()) {
            provider.remove_listener(id);
        }
    }
}

impl std::fmt::Debug for ProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderAdapter")
            .field("available", &self.is_available())
            .field("session", &self.session())
            .finish()
    }
}
