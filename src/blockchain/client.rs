//! JSON-RPC transport and typed node calls.
//!
//! # Responsibilities
//! - Build `{"jsonrpc":"2.0","method","params","id"}` envelopes
//! - Hand out per-session request ids, starting at 1
//! - Separate transport failures from node-reported errors
//! - Wrap the node methods the transaction lifecycle needs
//!
//! Nothing here retries. A failed submission may still have reached the
//! node, so retry policy stays with the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::blockchain::receipt::TransactionReceipt;
use crate::blockchain::types::{TxError, TxResult};
use crate::config::schema::NodeConfig;
use crate::observability::metrics;

pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>, id: u64) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
            id,
        }
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// A JSON-RPC response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    /// `Some(Value::Null)` when the node answered `"result": null`.
    #[serde(default, deserialize_with = "present")]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcErrorObject>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Extract the result for the request with `expected_id`.
    pub fn into_result(self, expected_id: u64) -> TxResult<Value> {
        // A null id is only legal on errors the node could not attribute,
        // such as a request it failed to parse.
        let id_matches = self.id.as_u64() == Some(expected_id)
            || (self.id.is_null() && self.error.is_some());
        if !id_matches {
            return Err(TxError::Transport(format!(
                "response id {} does not match request id {}",
                self.id, expected_id
            )));
        }
        if let Some(error) = self.error {
            return Err(TxError::RemoteProtocol {
                code: error.code,
                message: error.message,
            });
        }
        self.result.ok_or_else(|| {
            TxError::Transport("response carries neither result nor error".to_string())
        })
    }
}

/// Monotonic request id source for one session.
#[derive(Debug)]
pub struct RequestIds {
    next: AtomicU64,
}

impl RequestIds {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next id. Safe to call from concurrent tasks.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for RequestIds {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends one JSON-RPC call and returns its `result`.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> TxResult<Value>;
}

/// JSON-RPC over HTTP POST.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: url::Url,
    ids: RequestIds,
}

impl HttpTransport {
    /// Create a transport for the configured node.
    pub fn new(config: &NodeConfig) -> TxResult<Self> {
        let url: url::Url = config.rpc_url.parse().map_err(|e| {
            TxError::Transport(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rpc_timeout_secs))
            .build()
            .map_err(|e| TxError::Transport(format!("HTTP client setup failed: {}", e)))?;

        tracing::info!(
            rpc_url = %url,
            timeout_secs = config.rpc_timeout_secs,
            "RPC transport initialized"
        );

        Ok(Self {
            client,
            url,
            ids: RequestIds::new(),
        })
    }

    async fn exchange(&self, request: &JsonRpcRequest) -> TxResult<Value> {
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TxError::Transport(format!("request timed out: {}", e))
                } else {
                    TxError::Transport(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| TxError::Transport(format!("reading response failed: {}", e)))?;
        if !status.is_success() {
            return Err(TxError::Transport(format!(
                "node returned HTTP {}: {}",
                status, body
            )));
        }

        let decoded: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| TxError::Transport(format!("malformed JSON response: {}", e)))?;
        decoded.into_result(request.id)
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> TxResult<Value> {
        let request = JsonRpcRequest::new(method, params, self.ids.next_id());
        tracing::debug!(method, id = request.id, "RPC request");

        let result = self.exchange(&request).await;
        match &result {
            Ok(_) => metrics::record_rpc_call(method, "ok"),
            Err(TxError::RemoteProtocol { code, message }) => {
                tracing::warn!(
                    method,
                    id = request.id,
                    code,
                    message = %message,
                    "RPC error response"
                );
                metrics::record_rpc_call(method, "remote_error");
            }
            Err(e) => {
                tracing::warn!(method, id = request.id, error = %e, "RPC transport failure");
                metrics::record_rpc_call(method, "transport_error");
            }
        }
        result
    }
}

/// Result of `sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SendTransactionResult {
    pub hash: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Read-only contract call parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    pub data: String,
}

/// Chain description returned by `getMetaData`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaData {
    pub chain_id: i32,
    pub chain_name: String,
    pub version: i32,
    pub block_interval: u64,
}

/// Parse a `0x`-prefixed hex quantity or a plain JSON number.
pub fn parse_quantity(value: &Value) -> TxResult<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| TxError::Transport(format!("quantity {} is not a u64", n))),
        Value::String(s) => {
            let digits = s
                .strip_prefix("0x")
                .ok_or_else(|| TxError::Transport(format!("quantity '{}' lacks 0x prefix", s)))?;
            u64::from_str_radix(digits, 16)
                .map_err(|e| TxError::Transport(format!("quantity '{}': {}", s, e)))
        }
        other => Err(TxError::Transport(format!("unexpected quantity {}", other))),
    }
}

/// Typed node calls over any [`RpcTransport`].
#[derive(Clone)]
pub struct NodeClient {
    transport: Arc<dyn RpcTransport>,
}

impl NodeClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Connect over HTTP using the node configuration.
    pub fn connect(config: &NodeConfig) -> TxResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config)?)))
    }

    pub fn transport(&self) -> Arc<dyn RpcTransport> {
        self.transport.clone()
    }

    /// Submit a hex envelope; returns the transaction hash.
    pub async fn send_raw_transaction(&self, envelope: &str) -> TxResult<String> {
        let result = self
            .transport
            .call("sendRawTransaction", vec![json!(envelope)])
            .await?;
        let sent: SendTransactionResult = serde_json::from_value(result)
            .map_err(|e| TxError::Transport(format!("malformed send result: {}", e)))?;

        match sent.status.as_deref() {
            None | Some("OK") => Ok(sent.hash),
            Some(status) => Err(TxError::Submission {
                status: status.to_string(),
            }),
        }
    }

    /// Fetch a receipt; `None` while the transaction is not yet included.
    pub async fn get_transaction_receipt(
        &self,
        hash: &str,
    ) -> TxResult<Option<TransactionReceipt>> {
        let result = self
            .transport
            .call("getTransactionReceipt", vec![json!(hash)])
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .map_err(|e| TxError::Transport(format!("malformed receipt: {}", e)))
    }

    /// Current chain height.
    pub async fn block_number(&self) -> TxResult<u64> {
        let result = self.transport.call("blockNumber", Vec::new()).await?;
        parse_quantity(&result)
    }

    /// Validity bound for a new transaction: current height plus `margin`.
    pub async fn valid_until_block(&self, margin: u64) -> TxResult<u64> {
        let height = self.block_number().await?;
        Ok(height.saturating_add(margin))
    }

    /// Execute a read-only contract call; returns hex return data.
    pub async fn call(&self, request: &CallRequest, block: &str) -> TxResult<String> {
        let params = vec![
            serde_json::to_value(request)
                .map_err(|e| TxError::Transport(format!("encoding call request: {}", e)))?,
            json!(block),
        ];
        let result = self.transport.call("call", params).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| TxError::Transport(format!("call returned non-string {}", result)))
    }

    pub async fn get_meta_data(&self, block: &str) -> TxResult<MetaData> {
        let result = self.transport.call("getMetaData", vec![json!(block)]).await?;
        serde_json::from_value(result)
            .map_err(|e| TxError::Transport(format!("malformed metadata: {}", e)))
    }

    pub async fn peer_count(&self) -> TxResult<u64> {
        let result = self.transport.call("peerCount", Vec::new()).await?;
        parse_quantity(&result)
    }

    /// Check if the node is reachable.
    pub async fn is_healthy(&self) -> bool {
        let healthy = self.block_number().await.is_ok();
        metrics::record_node_health(healthy);
        healthy
    }
}

impl std::fmt::Debug for NodeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeClient").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Answers every call with the same result, recording what was asked.
    struct FixedTransport {
        result: Value,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl FixedTransport {
        fn ok(result: Value) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RpcTransport for FixedTransport {
        async fn call(&self, method: &str, params: Vec<Value>) -> TxResult<Value> {
            self.calls.lock().unwrap().push((method.to_string(), params));
            Ok(self.result.clone())
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let request = JsonRpcRequest::new("blockNumber", Vec::new(), 1);
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"jsonrpc":"2.0","method":"blockNumber","params":[],"id":1}"#
        );

        let request = JsonRpcRequest::new(
            "getTransactionReceipt",
            vec![json!("0xb903239f8543d04b5dc1ba6579132b143087c68db1b2168786408fcbce568238")],
            1,
        );
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            "{\"jsonrpc\":\"2.0\",\"method\":\"getTransactionReceipt\",\"params\":[\
             \"0xb903239f8543d04b5dc1ba6579132b143087c68db1b2168786408fcbce568238\"],\"id\":1}"
        );
    }

    #[test]
    fn test_request_ids_monotonic() {
        let ids = RequestIds::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.next_id(), 3);
    }

    #[test]
    fn test_response_classification() {
        let ok: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":4,"result":"0x10"}"#).unwrap();
        assert_eq!(ok.into_result(4).unwrap(), json!("0x10"));

        let null: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":4,"result":null}"#).unwrap();
        assert_eq!(null.into_result(4).unwrap(), Value::Null);

        let err: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":4,"error":{"code":-32006,"message":"InvalidNonce"}}"#,
        )
        .unwrap();
        assert!(matches!(
            err.into_result(4),
            Err(TxError::RemoteProtocol { code: -32006, .. })
        ));

        let wrong_id: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":5,"result":"0x10"}"#).unwrap();
        assert!(wrong_id.into_result(4).unwrap_err().is_transport());

        let empty: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":4}"#).unwrap();
        assert!(empty.into_result(4).unwrap_err().is_transport());
    }

    #[test]
    fn test_error_for_other_request_is_not_ours() {
        let foreign: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":9,"error":{"code":-32602,"message":"Invalid params"}}"#,
        )
        .unwrap();
        assert!(foreign.into_result(4).unwrap_err().is_transport());

        let parse_error: JsonRpcResponse = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_error.into_result(4),
            Err(TxError::RemoteProtocol { code: -32700, .. })
        ));

        let null_result: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"result":"0x1"}"#).unwrap();
        assert!(null_result.into_result(4).unwrap_err().is_transport());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(&json!("0x1b4")).unwrap(), 436);
        assert_eq!(parse_quantity(&json!(12)).unwrap(), 12);
        assert!(parse_quantity(&json!("1b4")).is_err());
        assert!(parse_quantity(&json!(null)).is_err());
    }

    #[tokio::test]
    async fn test_send_raw_transaction() {
        let transport = FixedTransport::ok(json!({"hash": "0xabc", "status": "OK"}));
        let client = NodeClient::new(transport.clone());
        assert_eq!(client.send_raw_transaction("0x0102").await.unwrap(), "0xabc");

        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls[0].0, "sendRawTransaction");
        assert_eq!(calls[0].1, vec![json!("0x0102")]);
    }

    #[tokio::test]
    async fn test_send_rejected_status() {
        let transport = FixedTransport::ok(json!({"hash": "0xabc", "status": "Dup"}));
        let client = NodeClient::new(transport);
        let err = client.send_raw_transaction("0x0102").await.unwrap_err();
        assert!(matches!(err, TxError::Submission { status } if status == "Dup"));
    }

    #[tokio::test]
    async fn test_receipt_null_is_none() {
        let client = NodeClient::new(FixedTransport::ok(Value::Null));
        assert!(client.get_transaction_receipt("0x01").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_valid_until_block_adds_margin() {
        let client = NodeClient::new(FixedTransport::ok(json!("0x3e8")));
        assert_eq!(client.valid_until_block(100).await.unwrap(), 1_100);
    }

    #[tokio::test]
    async fn test_call_params_shape() {
        let transport = FixedTransport::ok(json!(
            "0x0000000000000000000000000000000000000000000000000000000000000014"
        ));
        let client = NodeClient::new(transport.clone());
        let request = CallRequest {
            from: Some("0xa70e8dd61c5d32be8058bb8eb970870f07233155".into()),
            to: "0xb60e8dd61c5d32be8058bb8eb970870f07233155".into(),
            data: "0x0".into(),
        };
        let out = client.call(&request, "latest").await.unwrap();
        assert!(out.ends_with("14"));

        let calls = transport.calls.lock().unwrap();
        assert_eq!(
            serde_json::to_string(&calls[0].1).unwrap(),
            r#"[{"from":"0xa70e8dd61c5d32be8058bb8eb970870f07233155","to":"0xb60e8dd61c5d32be8058bb8eb970870f07233155","data":"0x0"},"latest"]"#
        );
    }

    #[tokio::test]
    async fn test_meta_data() {
        let client = NodeClient::new(FixedTransport::ok(json!({
            "chainId": 1,
            "chainName": "test-chain",
            "version": 1,
            "blockInterval": 3000,
            "operator": "test-operator"
        })));
        let meta = client.get_meta_data("latest").await.unwrap();
        assert_eq!(meta.chain_id, 1);
        assert_eq!(meta.version, 1);
        assert_eq!(meta.block_interval, 3000);
    }
}
