//! Transaction lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! value.rs        (amount text → canonical bytes)
//!     → transaction.rs (build & validate)
//!     → wire.rs        (raw protobuf bytes)
//!     → wallet.rs      (scheme-tagged signature)
//!     → wire.rs        (0x-hex envelope)
//!     → client.rs      (sendRawTransaction over JSON-RPC)
//!     → receipt.rs     (poll until Confirmed / Failed / TimedOut)
//! ```
//! `sender.rs` drives the whole chain for deployments, calls and bursts.
//!
//! # Security Constraints
//! - Private keys ONLY from environment variables
//! - Never log private keys or signatures
//! - All RPC calls have configurable timeouts

pub mod client;
pub mod receipt;
pub mod sender;
pub mod transaction;
pub mod types;
pub mod value;
pub mod wallet;
pub mod wire;

pub use client::{HttpTransport, NodeClient, RpcTransport};
pub use receipt::{ConfirmationOutcome, ReceiptWatcher, TransactionReceipt};
pub use sender::{run_burst, BurstReport, TxSender};
pub use transaction::{Transaction, TransactionBuilder, TxKind};
pub use types::{Scheme, Signature, TxError, TxResult};
pub use wallet::Wallet;
