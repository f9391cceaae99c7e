//! Session and receipt types.

use alloy::primitives::{Address, TxHash};
use serde::Serialize;

/// Wallet session as seen by the rest of the crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Primary account, `None` once the wallet reports no accounts.
    pub account: Option<Address>,
    /// Human-readable network name.
    pub network: Option<String>,
    pub connected: bool,
    /// Bumped on every change of primary account. Signers are tied to it.
    pub epoch: u64,
}

impl Session {
    pub fn connected(account: Address, network: Option<String>, epoch: u64) -> Self {
        Self {
            account: Some(account),
            network,
            connected: true,
            epoch,
        }
    }

    pub fn disconnected(epoch: u64) -> Self {
        Self {
            account: None,
            network: None,
            connected: false,
            epoch,
        }
    }
}

/// What an account-change notification did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// The wallet reported an empty account list.
    Disconnected(Session),
    /// A different primary account is active. Existing signers are stale.
    AccountChanged(Session),
    /// Same primary account as before.
    Unchanged(Session),
}

impl SessionChange {
    pub fn session(&self) -> &Session {
        match self {
            SessionChange::Disconnected(s)
            | SessionChange::AccountChanged(s)
            | SessionChange::Unchanged(s) => s,
        }
    }

    /// Whether contract bindings built for the previous session must be rebuilt.
    pub fn requires_rebind(&self) -> bool {
        !matches!(self, SessionChange::Unchanged(_))
    }
}

/// Confirmation record for a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction reverted.
    pub success: bool,
}

/// Map a chain id to the name wallets usually show for it.
pub fn network_name(chain_id: u64) -> String {
    match chain_id {
        1 => "mainnet".to_string(),
        11155111 => "sepolia".to_string(),
        17000 => "holesky".to_string(),
        31337 => "anvil".to_string(),
        other => format!("chain-{}", other),
    }
}
