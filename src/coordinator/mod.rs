//! Session and transaction coordination.
//!
//! # Data Flow
//! ```text
//! UI action (amount, recipient)
//!     → coordinator.rs (connection check, per-kind single-flight, validation)
//!     → token binding (submit via signer, hash exposed immediately)
//!     → receipt → balance read-after-write
//!     → state.rs view published on a watch channel
//! ```

#[allow(clippy::module_inception)]
pub mod coordinator;
pub mod state;

pub use coordinator::{ActionOutcome, Coordinator};
pub use state::{ActionKind, ActionSlots, ActionStatus, CoordinatorView, PendingAction, TokenSnapshot};
