//! OS signal handling.
//!
//! Ctrl-C cancels in-flight confirmation waits instead of killing the
//! process mid-poll, so the caller still reports what it knows.

use crate::lifecycle::cancel::CancelToken;

/// Cancel `token` when the process receives Ctrl-C.
pub fn cancel_on_ctrl_c(token: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling pending confirmations");
            token.cancel();
        }
    });
}
