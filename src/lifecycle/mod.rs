//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT → CancelToken::cancel
//!
//! Cancellation (cancel.rs):
//!     CancelToken → checked at every suspension point of a receipt watch
//! ```

pub mod cancel;
pub mod signals;

pub use cancel::CancelToken;
