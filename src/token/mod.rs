//! Contract binding for the token.
//!
//! # Data Flow
//! ```text
//! "1.5" (human units)
//!     → units.rs (validate, scale by token decimals)
//!     → abi.rs (ABI-encode mint/burnToken/transfer)
//!     → binding.rs (sign via WalletSigner, return TxHandle)
//! ```

pub mod abi;
pub mod binding;
pub mod units;

pub use abi::IToken;
pub use binding::{TokenContract, TxHandle};
pub use units::{display_units, format_units, parse_recipient, DecimalAmount};
