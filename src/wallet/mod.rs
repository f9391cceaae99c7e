//! Wallet provider adapter.
//!
//! # Data Flow
//! ```text
//! injected wallet (WalletProvider: browser object, LocalWallet, test stub)
//!     → adapter.rs (session tracking, account-change fan-out)
//!     → WalletReader / WalletSigner handed to the token binding
//! ```
//!
//! # Constraints
//! - Nothing outside this module calls the wallet object directly
//! - Private keys are only read from the environment and never logged

pub mod adapter;
pub mod local;
pub mod provider;
pub mod types;

pub use adapter::{ProviderAdapter, SessionHandler, Subscription, WalletReader, WalletSigner};
pub use local::LocalWallet;
pub use provider::{AccountsListener, ListenerId, WalletProvider};
pub use types::{network_name, Receipt, Session, SessionChange};
