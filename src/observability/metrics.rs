//! Metrics collection and exposition.
//!
//! # Metrics
//! - `appchain_rpc_requests_total` (counter): RPC calls by method, outcome
//! - `appchain_transactions_submitted_total` (counter): accepted submissions by scheme
//! - `appchain_confirmations_total` (counter): terminal watch outcomes
//! - `appchain_node_health` (gauge): 1=reachable, 0=unreachable

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::blockchain::types::Scheme;

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_rpc_call(method: &str, outcome: &'static str) {
    ::metrics::counter!(
        "appchain_rpc_requests_total",
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_submission(scheme: Scheme) {
    ::metrics::counter!(
        "appchain_transactions_submitted_total",
        "scheme" => scheme.as_str()
    )
    .increment(1);
}

pub fn record_confirmation(outcome: &'static str) {
    ::metrics::counter!("appchain_confirmations_total", "outcome" => outcome).increment(1);
}

pub fn record_node_health(healthy: bool) {
    ::metrics::gauge!("appchain_node_health").set(if healthy { 1.0 } else { 0.0 });
}
