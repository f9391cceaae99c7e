//! Session and transaction coordinator.
//!
//! Owns the session view, the token snapshot and one action slot per kind.
//! Writes are single-flight per kind: a second mint is refused while a mint is
//! in flight, but a transfer may proceed alongside it.
//!
//! Balance reads carry an issue ticket. A result is applied only if no read
//! with a later ticket has been applied, so overlapping refreshes settle on
//! the newest one regardless of completion order.

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::coordinator::state::{ActionKind, ActionStatus, CoordinatorView, TokenSnapshot};
use crate::error::{MinterError, MinterResult};
use crate::observability::metrics;
use crate::token::units::{parse_recipient, DecimalAmount};
use crate::token::TokenContract;
use crate::wallet::{ProviderAdapter, Session, SessionChange, Subscription};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Result of a confirmed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionOutcome {
    pub kind: ActionKind,
    /// Normalized human amount.
    pub amount: String,
    pub base_units: U256,
    pub recipient: Option<Address>,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// Balance after the read-after-write, `None` if that read failed.
    pub balance: Option<U256>,
}

/// A validated write.
#[derive(Debug, Clone, Copy)]
enum WriteCall {
    Mint,
    Burn,
    Transfer(Address),
}

impl WriteCall {
    fn recipient(&self) -> Option<Address> {
        match self {
            WriteCall::Transfer(to) => Some(*to),
            WriteCall::Mint | WriteCall::Burn => None,
        }
    }
}

/// Marks a slot in flight until finished. Dropping it unfinished (the caller
/// stopped waiting) returns the slot to idle.
struct InFlight<'a> {
    coordinator: &'a Coordinator,
    kind: ActionKind,
    done: bool,
}

impl InFlight<'_> {
    fn succeed(mut self) {
        self.done = true;
        self.coordinator.view.send_modify(|v| {
            let slot = v.actions.get_mut(self.kind);
            slot.status = ActionStatus::Succeeded;
            slot.tx_hash = None;
            slot.error = None;
        });
        metrics::record_action(self.kind, "succeeded");
    }

    fn fail(mut self, error: MinterError) {
        self.done = true;
        tracing::warn!(kind = %self.kind, error = %error, "Action failed");
        self.coordinator.view.send_modify(|v| {
            let slot = v.actions.get_mut(self.kind);
            slot.status = ActionStatus::Failed;
            slot.tx_hash = None;
            slot.error = Some(error);
        });
        metrics::record_action(self.kind, "failed");
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let kind = self.kind;
        self.coordinator.view.send_modify(|v| {
            let slot = v.actions.get_mut(kind);
            if let Some(hash) = slot.tx_hash {
                tracing::warn!(kind = %kind, tx_hash = %hash, "Stopped waiting for transaction");
            }
            slot.status = ActionStatus::Idle;
            slot.tx_hash = None;
        });
        metrics::record_action(kind, "abandoned");
    }
}

/// Coordinates wallet session, token snapshot and write actions.
pub struct Coordinator {
    adapter: ProviderAdapter,
    token_address: Address,
    display_decimals: u8,
    /// Binding for the current session, signer attached when connected.
    binding: Mutex<Option<TokenContract>>,
    view: watch::Sender<CoordinatorView>,
    refresh_issued: AtomicU64,
    subscription: Mutex<Option<Subscription>>,
    torn_down: AtomicBool,
}

impl Coordinator {
    /// Create a coordinator around `adapter` and start following its session.
    pub fn create(adapter: ProviderAdapter, token_address: Address, display_decimals: u8) -> Arc<Self> {
        let (view, _) = watch::channel(CoordinatorView::default());
        let coordinator = Arc::new(Self {
            adapter,
            token_address,
            display_decimals,
            binding: Mutex::new(None),
            view,
            refresh_issued: AtomicU64::new(0),
            subscription: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        });

        let weak = Arc::downgrade(&coordinator);
        let subscription = coordinator.adapter.subscribe_account_change(move |change| {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.on_session_change(change);
            }
        });
        *lock(&coordinator.subscription) = Some(subscription);

        if let Some(session) = coordinator.adapter.session() {
            let change = if session.connected {
                SessionChange::AccountChanged(session)
            } else {
                SessionChange::Disconnected(session)
            };
            coordinator.on_session_change(&change);
        }

        tracing::info!(token = %token_address, "Coordinator created");
        coordinator
    }

    /// Stop following the wallet and refuse further actions.
    pub fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.unsubscribe();
        }
        *lock(&self.binding) = None;
        tracing::info!("Coordinator torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub fn adapter(&self) -> &ProviderAdapter {
        &self.adapter
    }

    pub fn token_address(&self) -> Address {
        self.token_address
    }

    pub fn display_decimals(&self) -> u8 {
        self.display_decimals
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorView> {
        self.view.subscribe()
    }

    /// Current state.
    pub fn view(&self) -> CoordinatorView {
        self.view.borrow().clone()
    }

    fn ensure_live(&self) -> MinterResult<()> {
        if self.is_torn_down() {
            return Err(MinterError::NotConnected);
        }
        Ok(())
    }

    pub async fn connect(&self) -> MinterResult<Session> {
        self.ensure_live()?;
        self.adapter.connect().await
    }

    /// Pick up a session the wallet already authorized.
    pub async fn restore(&self) -> MinterResult<Option<Session>> {
        self.ensure_live()?;
        self.adapter.restore().await
    }

    pub fn disconnect(&self) -> Session {
        self.adapter.disconnect()
    }

    fn on_session_change(&self, change: &SessionChange) {
        if self.is_torn_down() {
            return;
        }
        let session = change.session().clone();

        // Notifications from racing transitions may arrive out of order.
        let superseded = self
            .view
            .borrow()
            .session
            .as_ref()
            .is_some_and(|shown| shown.epoch > session.epoch);
        if superseded {
            tracing::debug!(epoch = session.epoch, "Ignoring superseded session change");
            return;
        }

        if !change.requires_rebind() {
            self.view.send_modify(|v| v.session = Some(session));
            return;
        }

        let binding = self.adapter.reader().ok().map(|reader| {
            TokenContract::new(self.token_address, reader, self.adapter.signer().ok())
        });
        *lock(&self.binding) = binding;

        // Reads still in flight belong to the previous account.
        let ticket = self.next_ticket();
        self.view.send_modify(|v| {
            v.session = Some(session);
            v.snapshot.user_balance = None;
            v.balance_ticket = v.balance_ticket.max(ticket);
        });
    }

    fn signed_binding(&self) -> MinterResult<TokenContract> {
        self.ensure_live()?;
        lock(&self.binding)
            .clone()
            .filter(|b| b.account().is_some())
            .ok_or(MinterError::NotConnected)
    }

    fn read_binding(&self) -> MinterResult<TokenContract> {
        self.ensure_live()?;
        Ok(TokenContract::new(self.token_address, self.adapter.reader()?, None))
    }

    /// Read name, symbol, decimals and total supply. Fields whose read fails
    /// keep their previous value.
    pub async fn load_metadata(&self) -> MinterResult<TokenSnapshot> {
        let binding = self.read_binding()?;
        let (name, symbol, decimals, total_supply) = tokio::join!(
            binding.name(),
            binding.symbol(),
            binding.decimals(),
            binding.total_supply()
        );

        for (field, err) in [
            ("name", name.as_ref().err()),
            ("symbol", symbol.as_ref().err()),
            ("decimals", decimals.as_ref().err()),
            ("totalSupply", total_supply.as_ref().err()),
        ] {
            if let Some(e) = err {
                tracing::warn!(field = field, error = %e, "Token metadata read failed");
            }
        }

        self.view.send_modify(|v| {
            if let Ok(name) = name {
                v.snapshot.name = Some(name);
            }
            if let Ok(symbol) = symbol {
                v.snapshot.symbol = Some(symbol);
            }
            if let Ok(decimals) = decimals {
                v.snapshot.decimals = Some(decimals);
            }
            if let Ok(supply) = total_supply {
                v.snapshot.total_supply = Some(supply);
            }
        });

        Ok(self.view.borrow().snapshot.clone())
    }

    async fn decimals(&self, binding: &TokenContract) -> MinterResult<u8> {
        let cached = self.view.borrow().snapshot.decimals;
        if let Some(decimals) = cached {
            return Ok(decimals);
        }
        let decimals = binding.decimals().await?;
        self.view.send_modify(|v| v.snapshot.decimals = Some(decimals));
        Ok(decimals)
    }

    fn next_ticket(&self) -> u64 {
        self.refresh_issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Re-read the connected account's balance.
    ///
    /// A failed read leaves the balance unknown instead of failing. Returns
    /// the balance shown once this read has settled.
    pub async fn refresh_balance(&self) -> MinterResult<Option<U256>> {
        let binding = self.signed_binding()?;
        let ticket = self.next_ticket();
        Ok(self.read_balance(ticket, &binding).await)
    }

    async fn read_balance(&self, ticket: u64, binding: &TokenContract) -> Option<U256> {
        let result = binding.user_balance().await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Balance read failed, balance unknown");
        }

        let account = binding.account();
        let applied = self.view.send_if_modified(|v| {
            if ticket <= v.balance_ticket || v.account() != account {
                return false;
            }
            v.balance_ticket = ticket;
            v.snapshot.user_balance = result.ok();
            true
        });

        if applied {
            metrics::record_balance_refresh(outcome);
        } else {
            tracing::debug!(ticket = ticket, "Discarding superseded balance read");
            metrics::record_balance_refresh("stale");
        }
        self.view.borrow().snapshot.user_balance
    }

    /// Drop reads issued before now and hide the balance until the next one
    /// lands. Returns the ticket for that next read.
    fn invalidate_balance(&self) -> u64 {
        let ticket = self.next_ticket();
        self.view.send_if_modified(|v| {
            if v.balance_ticket >= ticket {
                return false;
            }
            v.balance_ticket = ticket - 1;
            v.snapshot.user_balance = None;
            true
        });
        ticket
    }

    pub async fn mint(&self, amount: &str) -> MinterResult<ActionOutcome> {
        self.run(ActionKind::Mint, amount, None).await
    }

    pub async fn burn(&self, amount: &str) -> MinterResult<ActionOutcome> {
        self.run(ActionKind::Burn, amount, None).await
    }

    pub async fn transfer(&self, recipient: &str, amount: &str) -> MinterResult<ActionOutcome> {
        self.run(ActionKind::Transfer, amount, Some(recipient)).await
    }

    /// Claim the slot for `kind`, refusing if it is already in flight.
    fn reserve(&self, kind: ActionKind, amount: &str) -> MinterResult<InFlight<'_>> {
        let mut busy = false;
        self.view.send_if_modified(|v| {
            let slot = v.actions.get_mut(kind);
            if slot.status.is_in_flight() {
                busy = true;
                return false;
            }
            slot.status = ActionStatus::Validating;
            slot.amount = Some(amount.to_string());
            slot.recipient = None;
            slot.tx_hash = None;
            slot.error = None;
            true
        });

        if busy {
            metrics::record_action(kind, "rejected");
            return Err(MinterError::ActionInProgress(kind));
        }
        Ok(InFlight {
            coordinator: self,
            kind,
            done: false,
        })
    }

    async fn run(
        &self,
        kind: ActionKind,
        amount: &str,
        recipient: Option<&str>,
    ) -> MinterResult<ActionOutcome> {
        let binding = self.signed_binding()?;
        let in_flight = self.reserve(kind, amount)?;

        match self.execute(kind, &binding, amount, recipient).await {
            Ok(outcome) => {
                in_flight.succeed();
                tracing::info!(
                    kind = %kind,
                    amount = %outcome.amount,
                    tx_hash = %outcome.tx_hash,
                    "Action confirmed"
                );
                Ok(outcome)
            }
            Err(e) => {
                in_flight.fail(e.clone());
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        kind: ActionKind,
        binding: &TokenContract,
        amount: &str,
        recipient: Option<&str>,
    ) -> MinterResult<ActionOutcome> {
        // Validating: syntax checks run before anything reaches the wallet.
        let amount = DecimalAmount::parse(amount);
        let call = match (kind, recipient) {
            (ActionKind::Mint, _) => Ok(WriteCall::Mint),
            (ActionKind::Burn, _) => Ok(WriteCall::Burn),
            (ActionKind::Transfer, Some(r)) => parse_recipient(r).map(WriteCall::Transfer),
            (ActionKind::Transfer, None) => {
                Err(MinterError::InvalidInput("recipient is required".to_string()))
            }
        };
        let amount = amount?;
        let call = call?;
        let recipient = call.recipient();

        let decimals = self.decimals(binding).await?;
        let base_units = amount.to_base_units(decimals)?;

        self.view.send_modify(|v| {
            let slot = v.actions.get_mut(kind);
            slot.status = ActionStatus::Submitting;
            slot.recipient = recipient;
        });

        let handle = match call {
            WriteCall::Mint => binding.mint(base_units).await?,
            WriteCall::Burn => binding.burn_token(base_units).await?,
            WriteCall::Transfer(to) => binding.transfer(to, base_units).await?,
        };

        let tx_hash = handle.hash();
        self.view.send_modify(|v| {
            let slot = v.actions.get_mut(kind);
            slot.status = ActionStatus::AwaitingConfirmation;
            slot.tx_hash = Some(tx_hash);
        });

        let receipt = handle.wait().await?;

        // Read-after-write before reporting success.
        let ticket = self.invalidate_balance();
        let balance = self.read_balance(ticket, binding).await;

        Ok(ActionOutcome {
            kind,
            amount: amount.to_string(),
            base_units,
            recipient,
            tx_hash,
            block_number: receipt.block_number,
            balance,
        })
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("token_address", &self.token_address)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
