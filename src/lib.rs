//! ERC20 Minter Library
//!
//! Wallet session and transaction coordination for a single deployed
//! mintable/burnable token contract.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod observability;
pub mod token;
pub mod wallet;

pub use config::MinterConfig;
pub use coordinator::{ActionKind, ActionOutcome, Coordinator, CoordinatorView};
pub use error::{MinterError, MinterResult};
pub use token::TokenContract;
pub use wallet::{LocalWallet, ProviderAdapter, Session, WalletProvider};
