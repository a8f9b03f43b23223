//! Receipt polling and confirmation.
//!
//! # Data Flow
//! ```text
//! Submitted (hash returned by sendRawTransaction)
//!     → Pending { attempts }      getTransactionReceipt → null, sleep, repeat
//!     → Confirmed                 receipt without errorMessage
//!     → Failed                    receipt with errorMessage
//!     → TimedOut                  attempt budget spent without a receipt
//!     → Cancelled                 token fired while waiting
//! ```
//!
//! # Design Decisions
//! - The watcher runs on the caller's task; each backoff is a suspension point
//! - `Failed`, `TimedOut` and `Cancelled` are outcomes, not errors
//! - RPC errors during polling propagate; the watcher never retries them

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::blockchain::client::NodeClient;
use crate::blockchain::types::TxResult;
use crate::config::schema::PollConfig;
use crate::lifecycle::CancelToken;
use crate::observability::metrics;
use crate::resilience::backoff::poll_delay;

/// Receipt as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: Option<String>,
    pub contract_address: Option<String>,
    pub error_message: Option<String>,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub quota_used: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub logs: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<Value>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl TransactionReceipt {
    /// The chain's rejection reason, if any. Empty strings count as none.
    pub fn failure(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|m| !m.is_empty())
    }
}

/// Non-terminal states of a watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    Submitted,
    Pending { attempts: u32 },
}

/// Terminal result of watching one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    Confirmed {
        receipt: TransactionReceipt,
        attempts: u32,
    },
    Failed {
        message: String,
        receipt: TransactionReceipt,
        attempts: u32,
    },
    TimedOut {
        attempts: u32,
    },
    Cancelled {
        attempts: u32,
    },
}

impl ConfirmationOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Confirmed { attempts, .. }
            | Self::Failed { attempts, .. }
            | Self::TimedOut { attempts }
            | Self::Cancelled { attempts } => *attempts,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Address of a deployed contract, for confirmed creations.
    pub fn contract_address(&self) -> Option<&str> {
        match self {
            Self::Confirmed { receipt, .. } => receipt.contract_address.as_deref(),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Failed { .. } => "failed",
            Self::TimedOut { .. } => "timed_out",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

/// Polls for a receipt until the transaction reaches a terminal outcome.
#[derive(Debug, Clone)]
pub struct ReceiptWatcher {
    client: NodeClient,
    config: PollConfig,
}

impl ReceiptWatcher {
    pub fn new(client: NodeClient, config: PollConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Watch `hash` until it is confirmed, fails, times out or `cancel` fires.
    pub async fn watch(&self, hash: &str, cancel: &CancelToken) -> TxResult<ConfirmationOutcome> {
        let mut state = ConfirmationState::Submitted;
        tracing::debug!(hash = %hash, ?state, "Watching transaction");

        if self.config.initial_delay_ms > 0
            && !self
                .pause(Duration::from_millis(self.config.initial_delay_ms), cancel)
                .await
        {
            return Ok(self.finish(hash, ConfirmationOutcome::Cancelled { attempts: 0 }));
        }

        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Ok(self.finish(hash, ConfirmationOutcome::Cancelled { attempts }));
            }

            let receipt = self.client.get_transaction_receipt(hash).await?;
            attempts += 1;

            match receipt {
                Some(receipt) => {
                    let outcome = match receipt.failure() {
                        Some(message) => ConfirmationOutcome::Failed {
                            message: message.to_string(),
                            receipt,
                            attempts,
                        },
                        None => ConfirmationOutcome::Confirmed { receipt, attempts },
                    };
                    return Ok(self.finish(hash, outcome));
                }
                None if attempts >= self.config.max_attempts => {
                    return Ok(self.finish(hash, ConfirmationOutcome::TimedOut { attempts }));
                }
                None => {
                    state = ConfirmationState::Pending { attempts };
                    tracing::debug!(hash = %hash, ?state, "Receipt not available yet");

                    let delay = poll_delay(
                        self.config.strategy,
                        attempts,
                        self.config.interval_ms,
                        self.config.max_interval_ms,
                    );
                    if !self.pause(delay, cancel).await {
                        return Ok(self.finish(hash, ConfirmationOutcome::Cancelled { attempts }));
                    }
                }
            }
        }
    }

    /// Sleep for `delay`; returns false if cancelled first.
    async fn pause(&self, delay: Duration, cancel: &CancelToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => true,
            _ = cancel.cancelled() => false,
        }
    }

    fn finish(&self, hash: &str, outcome: ConfirmationOutcome) -> ConfirmationOutcome {
        metrics::record_confirmation(outcome.label());
        match &outcome {
            ConfirmationOutcome::Confirmed { receipt, attempts } => tracing::info!(
                hash = %hash,
                attempts,
                contract_address = receipt.contract_address.as_deref().unwrap_or(""),
                "Transaction confirmed"
            ),
            ConfirmationOutcome::Failed {
                message, attempts, ..
            } => tracing::warn!(hash = %hash, attempts, error = %message, "Transaction failed"),
            ConfirmationOutcome::TimedOut { attempts } => {
                tracing::warn!(hash = %hash, attempts, "No receipt within attempt budget")
            }
            ConfirmationOutcome::Cancelled { attempts } => {
                tracing::info!(hash = %hash, attempts, "Confirmation cancelled")
            }
        }
        outcome
    }
}
