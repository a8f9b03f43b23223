//! End-to-end submission pipeline.
//!
//! # Data Flow
//! ```text
//! TransactionDefaults + payload
//!     → NodeClient::valid_until_block (height + margin)
//!     → TransactionBuilder (random nonce)
//!     → Wallet::sign_to_envelope
//!     → NodeClient::send_raw_transaction → hash
//!     → ReceiptWatcher::watch (optional)
//! ```
//!
//! # Design Decisions
//! - A failed submission is returned, never retried here
//! - Burst workers are independent tasks joined before any hash is watched
//! - Burst confirmations run one watcher task per hash

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::blockchain::client::NodeClient;
use crate::blockchain::receipt::{ConfirmationOutcome, ReceiptWatcher};
use crate::blockchain::transaction::{Transaction, TransactionBuilder, TxKind};
use crate::blockchain::types::{Scheme, TxResult};
use crate::blockchain::wallet::Wallet;
use crate::config::schema::TransactionDefaults;
use crate::lifecycle::CancelToken;
use crate::observability::metrics;

/// Builds, signs and submits transactions with one wallet.
#[derive(Debug, Clone)]
pub struct TxSender {
    client: NodeClient,
    wallet: Arc<Wallet>,
    defaults: TransactionDefaults,
}

impl TxSender {
    pub fn new(client: NodeClient, wallet: Wallet, defaults: TransactionDefaults) -> Self {
        Self {
            client,
            wallet: Arc::new(wallet),
            defaults,
        }
    }

    pub fn client(&self) -> &NodeClient {
        &self.client
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    pub fn scheme(&self) -> Scheme {
        self.defaults.scheme
    }

    /// Build a transaction from the configured defaults.
    ///
    /// The validity bound is taken from the node's current height.
    pub async fn prepare(&self, kind: TxKind, to: &str, data_hex: &str) -> TxResult<Transaction> {
        let valid_until_block = self
            .client
            .valid_until_block(self.defaults.valid_block_margin)
            .await?;

        TransactionBuilder::new(kind)
            .to(to)
            .quota(self.defaults.quota)
            .valid_until_block(valid_until_block)
            .version(self.defaults.version)
            .chain_id(self.defaults.chain_id)
            .value(self.defaults.value.as_str())
            .data_hex(data_hex)
            .build()
    }

    /// Sign and submit; returns the transaction hash.
    pub async fn submit(&self, tx: &Transaction) -> TxResult<String> {
        let scheme = self.defaults.scheme;
        let envelope = self.wallet.sign_to_envelope(tx, scheme)?;
        let hash = self.client.send_raw_transaction(&envelope).await?;

        metrics::record_submission(scheme);
        tracing::info!(
            hash = %hash,
            scheme = %scheme,
            valid_until_block = tx.valid_until_block(),
            "Transaction submitted"
        );
        Ok(hash)
    }

    /// Submit a contract deployment.
    pub async fn deploy(&self, init_code: &str) -> TxResult<String> {
        let tx = self.prepare(TxKind::ContractCreation, "", init_code).await?;
        self.submit(&tx).await
    }

    /// Submit a call to a deployed contract.
    pub async fn call_function(&self, contract: &str, call_data: &str) -> TxResult<String> {
        let tx = self.prepare(TxKind::FunctionCall, contract, call_data).await?;
        self.submit(&tx).await
    }

    /// Submit and wait for the terminal outcome.
    pub async fn send_and_confirm(
        &self,
        tx: &Transaction,
        watcher: &ReceiptWatcher,
        cancel: &CancelToken,
    ) -> TxResult<(String, ConfirmationOutcome)> {
        let hash = self.submit(tx).await?;
        let outcome = watcher.watch(&hash, cancel).await?;
        Ok((hash, outcome))
    }
}

/// Aggregate result of [`run_burst`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BurstReport {
    pub workers: usize,
    pub requested: usize,
    /// Hashes of every accepted submission.
    pub hashes: Vec<String>,
    pub submit_errors: usize,
    pub confirmed: usize,
    /// Included by the chain with an error message.
    pub failed: usize,
    pub timed_out: usize,
    pub cancelled: usize,
    /// Watches that ended in an RPC error.
    pub watch_errors: usize,
    /// Times the observed block height went backwards while confirming.
    pub height_decreases: u32,
    /// Wall time of the submission phase.
    pub submit_elapsed: Duration,
    /// Wall time of both phases.
    pub elapsed: Duration,
}

impl BurstReport {
    pub fn submitted(&self) -> usize {
        self.hashes.len()
    }

    /// Accepted submissions per second of submission-phase time.
    pub fn submissions_per_sec(&self) -> f64 {
        per_sec(self.submitted(), self.submit_elapsed)
    }

    /// Confirmed transactions per second of total wall time.
    pub fn confirmed_per_sec(&self) -> f64 {
        per_sec(self.confirmed, self.elapsed)
    }
}

fn per_sec(count: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

/// Submit `per_worker` calls to `contract` from each of `workers` tasks, then
/// confirm them all.
///
/// Every worker builds and signs its own transactions. Confirmation starts
/// only after all workers have finished; each hash is then watched on its own
/// task while the block height is sampled for regressions. Individual
/// failures are counted, not propagated.
pub async fn run_burst(
    sender: &TxSender,
    watcher: &ReceiptWatcher,
    cancel: &CancelToken,
    contract: &str,
    call_data: &str,
    workers: usize,
    per_worker: usize,
) -> BurstReport {
    let started = Instant::now();
    let mut report = BurstReport {
        workers,
        requested: workers * per_worker,
        ..BurstReport::default()
    };

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let sender = sender.clone();
            let cancel = cancel.clone();
            let contract = contract.to_string();
            let call_data = call_data.to_string();
            tokio::spawn(async move {
                let mut hashes = Vec::with_capacity(per_worker);
                let mut errors = 0usize;
                for _ in 0..per_worker {
                    if cancel.is_cancelled() {
                        break;
                    }
                    match sender.call_function(&contract, &call_data).await {
                        Ok(hash) => hashes.push(hash),
                        Err(e) => {
                            errors += 1;
                            tracing::warn!(worker, error = %e, "Burst submission failed");
                        }
                    }
                }
                (hashes, errors)
            })
        })
        .collect();

    for handle in handles {
        match handle.await {
            Ok((hashes, errors)) => {
                report.hashes.extend(hashes);
                report.submit_errors += errors;
            }
            Err(e) => {
                tracing::error!(error = %e, "Burst worker aborted");
                report.submit_errors += per_worker;
            }
        }
    }
    report.submit_elapsed = started.elapsed();
    tracing::info!(
        workers,
        submitted = report.submitted(),
        submit_errors = report.submit_errors,
        elapsed_ms = report.submit_elapsed.as_millis() as u64,
        "Burst submitted, confirming"
    );

    let monitor_stop = CancelToken::new();
    let monitor = tokio::spawn(monitor_height(
        sender.client().clone(),
        Duration::from_millis(watcher.config().interval_ms),
        monitor_stop.clone(),
    ));

    let watches: Vec<_> = report
        .hashes
        .iter()
        .map(|hash| {
            let watcher = watcher.clone();
            let cancel = cancel.clone();
            let hash = hash.clone();
            tokio::spawn(async move { watcher.watch(&hash, &cancel).await })
        })
        .collect();

    for watch in watches {
        match watch.await {
            Ok(Ok(ConfirmationOutcome::Confirmed { .. })) => report.confirmed += 1,
            Ok(Ok(ConfirmationOutcome::Failed { .. })) => report.failed += 1,
            Ok(Ok(ConfirmationOutcome::TimedOut { .. })) => report.timed_out += 1,
            Ok(Ok(ConfirmationOutcome::Cancelled { .. })) => report.cancelled += 1,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Burst confirmation failed");
                report.watch_errors += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "Burst watch aborted");
                report.watch_errors += 1;
            }
        }
    }

    monitor_stop.cancel();
    report.height_decreases = monitor.await.unwrap_or(0);
    report.elapsed = started.elapsed();

    tracing::info!(
        workers,
        submitted = report.submitted(),
        confirmed = report.confirmed,
        failed = report.failed,
        timed_out = report.timed_out,
        height_decreases = report.height_decreases,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Burst complete"
    );
    report
}

/// Sample the chain height every `interval` until `stop` fires, plus once
/// on each side; returns how many samples were below their predecessor.
async fn monitor_height(client: NodeClient, interval: Duration, stop: CancelToken) -> u32 {
    let mut last = client.block_number().await.ok();
    let mut decreases = 0u32;

    loop {
        let stopped = tokio::select! {
            _ = tokio::time::sleep(interval) => false,
            _ = stop.cancelled() => true,
        };

        match client.block_number().await {
            Ok(height) => {
                if let Some(previous) = last.filter(|previous| height < *previous) {
                    tracing::warn!(previous, height, "Block height is decreasing");
                    decreases += 1;
                }
                last = Some(height);
            }
            Err(e) => tracing::debug!(error = %e, "Height sample failed"),
        }

        if stopped {
            return decreases;
        }
    }
}
