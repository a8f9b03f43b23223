//! Resilience subsystem.
//!
//! # Design Decisions
//! - Timeouts live on the transport; every RPC call has a deadline
//! - Submission is never retried automatically
//! - Receipt polling is the only loop, paced by `backoff.rs`

pub mod backoff;

pub use backoff::PollStrategy;
