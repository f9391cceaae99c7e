//! Observable coordinator state.
//!
//! # Action States
//! ```text
//! Idle → Validating → Submitting → AwaitingConfirmation → Succeeded
//!             │            │                 │
//!             └────────────┴─────────────────┴──────────→ Failed
//! ```
//!
//! Succeeded and Failed are terminal for one attempt and accept a new
//! submission, like Idle.

use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;

use crate::error::MinterError;
use crate::token::units::display_units;
use crate::wallet::Session;

/// The three write actions. Each has its own single-flight slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Mint,
    Burn,
    Transfer,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [ActionKind::Mint, ActionKind::Burn, ActionKind::Transfer];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Mint => "mint",
            ActionKind::Burn => "burn",
            ActionKind::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    #[default]
    Idle,
    Validating,
    Submitting,
    AwaitingConfirmation,
    Succeeded,
    Failed,
}

impl ActionStatus {
    /// Whether a new submission of the same kind must be refused.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ActionStatus::Validating | ActionStatus::Submitting | ActionStatus::AwaitingConfirmation
        )
    }
}

/// State of one action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub status: ActionStatus,
    /// Amount as typed by the user.
    pub amount: Option<String>,
    pub recipient: Option<Address>,
    /// Set once submitted, cleared once the action finishes either way.
    pub tx_hash: Option<TxHash>,
    /// Reason for the last failure.
    #[serde(skip)]
    pub error: Option<MinterError>,
}

impl PendingAction {
    pub fn idle(kind: ActionKind) -> Self {
        Self {
            kind,
            status: ActionStatus::Idle,
            amount: None,
            recipient: None,
            tx_hash: None,
            error: None,
        }
    }
}

/// One slot per action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionSlots {
    pub mint: PendingAction,
    pub burn: PendingAction,
    pub transfer: PendingAction,
}

impl Default for ActionSlots {
    fn default() -> Self {
        Self {
            mint: PendingAction::idle(ActionKind::Mint),
            burn: PendingAction::idle(ActionKind::Burn),
            transfer: PendingAction::idle(ActionKind::Transfer),
        }
    }
}

impl ActionSlots {
    pub fn get(&self, kind: ActionKind) -> &PendingAction {
        match kind {
            ActionKind::Mint => &self.mint,
            ActionKind::Burn => &self.burn,
            ActionKind::Transfer => &self.transfer,
        }
    }

    pub fn get_mut(&mut self, kind: ActionKind) -> &mut PendingAction {
        match kind {
            ActionKind::Mint => &mut self.mint,
            ActionKind::Burn => &mut self.burn,
            ActionKind::Transfer => &mut self.transfer,
        }
    }

    /// Hashes of transactions still awaiting confirmation.
    pub fn pending_hashes(&self) -> Vec<(ActionKind, TxHash)> {
        ActionKind::ALL
            .iter()
            .filter_map(|kind| self.get(*kind).tx_hash.map(|h| (*kind, h)))
            .collect()
    }
}

/// Read-only mirror of on-chain token state. `None` means unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TokenSnapshot {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub total_supply: Option<U256>,
    pub user_balance: Option<U256>,
}

/// Everything a rendering layer needs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorView {
    pub session: Option<Session>,
    pub snapshot: TokenSnapshot,
    pub actions: ActionSlots,
    /// Issue ticket of the balance currently shown.
    #[serde(skip)]
    pub(crate) balance_ticket: u64,
}

impl CoordinatorView {
    pub fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.connected)
    }

    pub fn account(&self) -> Option<Address> {
        self.session.as_ref().and_then(|s| s.account)
    }

    /// Balance rounded for display, `None` while unknown.
    pub fn display_balance(&self, places: u8) -> Option<String> {
        let balance = self.snapshot.user_balance?;
        let decimals = self.snapshot.decimals?;
        display_units(balance, decimals, places).ok()
    }

    pub fn display_total_supply(&self, places: u8) -> Option<String> {
        let supply = self.snapshot.total_supply?;
        let decimals = self.snapshot.decimals?;
        display_units(supply, decimals, places).ok()
    }
}
