//! Error taxonomy shared by the adapter, binding and coordinator.

use alloy::primitives::Address;
use thiserror::Error;

use crate::coordinator::state::ActionKind;

/// Errors surfaced to callers and observers.
///
/// Every variant is terminal for the action that produced it; nothing here is
/// retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinterError {
    /// No wallet provider is injected into the host.
    #[error("No wallet found: install a browser wallet such as MetaMask")]
    NoWalletFound,

    /// An action needed a connected account and there is none.
    #[error("Wallet not connected: connect your wallet first")]
    NotConnected,

    /// The wallet prompt was declined.
    #[error("Request rejected in wallet")]
    UserRejected,

    /// Amount or recipient failed validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Another action of the same kind is still in flight.
    #[error("A {0} is already in progress")]
    ActionInProgress(ActionKind),

    /// The transaction was mined but reverted.
    #[error("Transaction reverted: {0}")]
    TxReverted(String),

    /// The transaction disappeared before being mined.
    #[error("Transaction dropped: {0}")]
    TxDropped(String),

    /// A signer minted for a superseded session was used.
    #[error("Signer for {0} belongs to a previous session")]
    StaleSigner(Address),

    /// Signing key could not be loaded.
    #[error("Wallet error: {0}")]
    Wallet(String),

    /// Transport or provider failure.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Contract return data could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Result type for wallet and token operations.
pub type MinterResult<T> = Result<T, MinterError>;
