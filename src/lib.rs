//! Client-side transaction lifecycle engine for appchain nodes.
//!
//! Builds, signs, serializes and submits transactions over JSON-RPC, then
//! tracks them to a confirmed, failed or timed-out outcome.

pub mod blockchain;
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use blockchain::{
    ConfirmationOutcome, NodeClient, ReceiptWatcher, Scheme, Transaction, TransactionBuilder,
    TxError, TxSender, Wallet,
};
pub use config::schema::AppConfig;
pub use lifecycle::CancelToken;
