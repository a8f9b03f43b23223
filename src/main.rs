//! appchain-tx command line.
//!
//! # Architecture Overview
//!
//! ```text
//!   CLI args + config.toml + APPCHAIN_PRIVATE_KEY
//!        │
//!        ▼
//!   ┌──────────┐   ┌────────────┐   ┌──────────┐   ┌────────────────┐
//!   │ TxSender │──▶│ Wallet     │──▶│ wire     │──▶│ NodeClient     │──▶ node
//!   │ (build)  │   │ (sign)     │   │ envelope │   │ (JSON-RPC)     │
//!   └──────────┘   └────────────┘   └──────────┘   └───────┬────────┘
//!                                                          │
//!                                                  ┌───────▼────────┐
//!                                                  │ ReceiptWatcher │
//!                                                  └────────────────┘
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use appchain_tx::blockchain::client::CallRequest;
use appchain_tx::blockchain::sender::run_burst;
use appchain_tx::config::{load_config, AppConfig};
use appchain_tx::lifecycle::signals::cancel_on_ctrl_c;
use appchain_tx::observability::{logging, metrics};
use appchain_tx::{
    CancelToken, ConfirmationOutcome, NodeClient, ReceiptWatcher, Scheme, TxSender, Wallet,
};

#[derive(Parser)]
#[command(name = "appchain-tx")]
#[command(about = "Build, sign, submit and confirm appchain transactions", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the node RPC URL.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override the signing scheme.
    #[arg(long, value_parser = parse_scheme)]
    scheme: Option<Scheme>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current block height
    Height,
    /// Deploy a contract from hex init code
    Deploy {
        #[arg(long)]
        code: String,
        /// Wait for the receipt
        #[arg(long)]
        wait: bool,
    },
    /// Call a contract function
    Send {
        #[arg(long)]
        to: String,
        #[arg(long)]
        data: String,
        #[arg(long)]
        wait: bool,
    },
    /// Wait for the receipt of a submitted transaction
    Receipt { hash: String },
    /// Execute a read-only call
    Call {
        #[arg(long)]
        to: String,
        #[arg(long)]
        data: String,
        #[arg(long)]
        from: Option<String>,
    },
    /// Submit many calls concurrently, confirm them and report throughput
    Burst {
        #[arg(long)]
        to: String,
        #[arg(long)]
        data: String,
        #[arg(long, default_value_t = 1)]
        workers: usize,
        #[arg(long, default_value_t = 10)]
        count: usize,
    },
}

fn parse_scheme(s: &str) -> Result<Scheme, String> {
    match s {
        "ecdsa" => Ok(Scheme::Ecdsa),
        "ed25519" | "ed25519_blake2b" => Ok(Scheme::Ed25519Blake2b),
        other => Err(format!("unknown scheme '{}', expected ecdsa or ed25519", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(url) = cli.rpc_url {
        config.node.rpc_url = url;
    }
    if let Some(scheme) = cli.scheme {
        config.transaction.scheme = scheme;
    }

    logging::init(&config.observability).map_err(|e| e.to_string())?;

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    tracing::info!(
        rpc_url = %config.node.rpc_url,
        scheme = %config.transaction.scheme,
        "appchain-tx v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let client = NodeClient::connect(&config.node)?;
    let cancel = CancelToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match cli.command {
        Commands::Height => {
            println!("{}", client.block_number().await?);
        }
        Commands::Deploy { code, wait } => {
            let sender = TxSender::new(
                client.clone(),
                Wallet::from_env()?,
                config.transaction.clone(),
            );
            let hash = sender.deploy(&code).await?;
            println!("{}", hash);
            if wait {
                let watcher = ReceiptWatcher::new(client, config.confirmation.clone());
                report(watcher.watch(&hash, &cancel).await?)?;
            }
        }
        Commands::Send { to, data, wait } => {
            let sender = TxSender::new(
                client.clone(),
                Wallet::from_env()?,
                config.transaction.clone(),
            );
            let hash = sender.call_function(&to, &data).await?;
            println!("{}", hash);
            if wait {
                let watcher = ReceiptWatcher::new(client, config.confirmation.clone());
                report(watcher.watch(&hash, &cancel).await?)?;
            }
        }
        Commands::Receipt { hash } => {
            let watcher = ReceiptWatcher::new(client, config.confirmation.clone());
            report(watcher.watch(&hash, &cancel).await?)?;
        }
        Commands::Call { to, data, from } => {
            let request = CallRequest { from, to, data };
            println!("{}", client.call(&request, "latest").await?);
        }
        Commands::Burst {
            to,
            data,
            workers,
            count,
        } => {
            let sender = TxSender::new(
                client.clone(),
                Wallet::from_env()?,
                config.transaction.clone(),
            );
            let watcher = ReceiptWatcher::new(client, config.confirmation.clone());
            let result = run_burst(&sender, &watcher, &cancel, &to, &data, workers, count).await;
            println!(
                "requested {}, submitted {}, submit errors {}, {:.2} submissions/s",
                result.requested,
                result.submitted(),
                result.submit_errors,
                result.submissions_per_sec()
            );
            println!(
                "confirmed {}, failed {}, timed out {}, cancelled {}, watch errors {}",
                result.confirmed,
                result.failed,
                result.timed_out,
                result.cancelled,
                result.watch_errors
            );
            println!(
                "{} ms, {:.2} confirmed tx/s",
                result.elapsed.as_millis(),
                result.confirmed_per_sec()
            );
            if result.height_decreases > 0 {
                println!("block height decreased {} times", result.height_decreases);
            }
        }
    }

    Ok(())
}

/// Print a terminal outcome; anything but Confirmed is an error exit.
fn report(outcome: ConfirmationOutcome) -> Result<(), Box<dyn std::error::Error>> {
    match outcome {
        ConfirmationOutcome::Confirmed { receipt, attempts } => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            tracing::debug!(attempts, "Receipt printed");
            Ok(())
        }
        ConfirmationOutcome::Failed {
            message, attempts, ..
        } => Err(format!("transaction failed after {} polls: {}", attempts, message).into()),
        ConfirmationOutcome::TimedOut { attempts } => {
            Err(format!("no receipt after {} polls", attempts).into())
        }
        ConfirmationOutcome::Cancelled { attempts } => {
            Err(format!("cancelled after {} polls", attempts).into())
        }
    }
}
