//! JSON-RPC Wallet Provider
//!
//! [`EthProvider`] implements [`WalletProvider`] over standard Ethereum
//! JSON-RPC 2.0 (HTTP). It is the production backend: the same request
//! surface a browser-injected provider exposes, spoken to a wallet-enabled
//! node endpoint.
//!
//! ## Error Mapping
//!
//! | Condition                          | Maps to                        |
//! |------------------------------------|--------------------------------|
//! | connection refused                 | `ProviderError::Unavailable`   |
//! | timeout / transport failure        | `ProviderError::Network`       |
//! | JSON-RPC error code 4001           | `ProviderError::UserRejected`  |
//! | code 3 or "execution reverted"     | `ProviderError::Reverted`      |
//! | any other JSON-RPC error           | `ProviderError::Rpc`           |
//! | malformed / missing result         | `ProviderError::InvalidResponse` |
//!
//! Quantities arrive as 0x-prefixed hex per the JSON-RPC spec and are parsed
//! into integers before they leave this module.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::provider::{CallRequest, ProviderError, TxReceipt, TxRequest, WalletProvider};

/// EIP-1193 error code for a user-rejected request.
const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1474 error code for execution reverted.
const CODE_EXECUTION_REVERTED: i64 = 3;

// ════════════════════════════════════════════════════════════════════════════
// WIRE TYPES
// ════════════════════════════════════════════════════════════════════════════

/// JSON-RPC request envelope.
#[derive(Debug, Serialize)]
struct JsonRpcRequest {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Vec<Value>,
}

/// JSON-RPC response envelope. `result` is `None` both for an explicit
/// `null` (a pending receipt) and for a missing field.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    #[allow(dead_code)]
    id: Option<u64>,
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Receipt shape returned by `eth_getTransactionReceipt`.
#[derive(Debug, Deserialize)]
struct RawReceipt {
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    /// "0x1" success, "0x0" reverted. Missing on pre-Byzantium chains;
    /// treated as success there.
    status: Option<String>,
    #[serde(rename = "blockNumber")]
    block_number: String,
}

// ════════════════════════════════════════════════════════════════════════════
// QUANTITY HELPERS
// ════════════════════════════════════════════════════════════════════════════

/// Parse a 0x-prefixed hex quantity into u128.
fn parse_quantity(s: &str) -> Result<u128, ProviderError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ProviderError::InvalidResponse(format!("quantity without 0x prefix: {:?}", s)))?;
    if digits.is_empty() {
        return Err(ProviderError::InvalidResponse("empty hex quantity".to_string()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad hex quantity {:?}: {}", s, e)))
}

/// Parse a 0x-prefixed hex quantity into u64.
fn parse_quantity_u64(s: &str) -> Result<u64, ProviderError> {
    let value = parse_quantity(s)?;
    u64::try_from(value)
        .map_err(|_| ProviderError::InvalidResponse(format!("quantity {:?} exceeds u64", s)))
}

/// Encode an integer as a minimal 0x-prefixed hex quantity.
fn to_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

/// Decode 0x-prefixed hex bytes (eth_call return data).
fn parse_bytes(s: &str) -> Result<Vec<u8>, ProviderError> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .ok_or_else(|| ProviderError::InvalidResponse(format!("data without 0x prefix: {:?}", s)))?;
    hex::decode(digits)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad hex data: {}", e)))
}

// ════════════════════════════════════════════════════════════════════════════
// PROVIDER
// ════════════════════════════════════════════════════════════════════════════

/// Ethereum JSON-RPC provider over HTTP.
pub struct EthProvider {
    client: reqwest::Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthProvider")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl EthProvider {
    /// Build a provider against `rpc_url` with the given request timeout.
    pub fn new(rpc_url: impl Into<String>, timeout_ms: u64) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            rpc_url: rpc_url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Issue one JSON-RPC call. Returns the `result` value, `None` when the
    /// node answered with `null` (e.g. a receipt that does not exist yet).
    async fn request(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Option<Value>, ProviderError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, "json-rpc request");

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    ProviderError::Unavailable
                } else if e.is_timeout() {
                    ProviderError::Network(format!("{} timed out", method))
                } else {
                    ProviderError::Network(format!("{} failed: {}", method, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Network(format!("HTTP error: {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(format!("failed to read response: {}", e)))?;
        let parsed: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {}", e)))?;

        if let Some(error) = parsed.error {
            return Err(map_rpc_error(error));
        }
        Ok(parsed.result)
    }

    /// As [`Self::request`], but a missing/null result is an error.
    async fn request_required(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<Value, ProviderError> {
        self.request(method, params).await?.ok_or_else(|| {
            ProviderError::InvalidResponse(format!("missing result for {}", method))
        })
    }

    async fn request_accounts_with(
        &self,
        method: &'static str,
    ) -> Result<Vec<String>, ProviderError> {
        let result = self.request_required(method, vec![]).await?;
        serde_json::from_value(result)
            .map_err(|e| ProviderError::InvalidResponse(format!("bad accounts list: {}", e)))
    }

    async fn request_quantity(
        &self,
        method: &'static str,
        params: Vec<Value>,
    ) -> Result<u128, ProviderError> {
        let result = self.request_required(method, params).await?;
        let s = result.as_str().ok_or_else(|| {
            ProviderError::InvalidResponse(format!("non-string quantity for {}", method))
        })?;
        parse_quantity(s)
    }
}

/// Map a JSON-RPC error object onto the provider error taxonomy.
fn map_rpc_error(error: JsonRpcError) -> ProviderError {
    if error.code == CODE_USER_REJECTED {
        return ProviderError::UserRejected;
    }
    if error.code == CODE_EXECUTION_REVERTED
        || error.message.to_ascii_lowercase().contains("revert")
    {
        return ProviderError::Reverted(error.message);
    }
    ProviderError::Rpc {
        code: error.code,
        message: error.message,
    }
}

/// Transaction parameter object for `eth_estimateGas` / `eth_sendTransaction`.
fn tx_params(tx: &TxRequest) -> Value {
    let mut obj = json!({
        "from": tx.from,
        "to": tx.to,
        "value": to_quantity(tx.value_wei),
    });
    if !tx.data.is_empty() {
        obj["data"] = Value::String(format!("0x{}", hex::encode(&tx.data)));
    }
    obj
}

#[async_trait]
impl WalletProvider for EthProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.request_accounts_with("eth_requestAccounts").await
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.request_accounts_with("eth_accounts").await
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let result = self.request_required("eth_chainId", vec![]).await?;
        let s = result
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("non-string chain id".to_string()))?;
        parse_quantity_u64(s)
    }

    async fn get_balance(&self, address: &str) -> Result<u128, ProviderError> {
        self.request_quantity("eth_getBalance", vec![json!(address), json!("latest")])
            .await
    }

    async fn gas_price(&self) -> Result<u128, ProviderError> {
        self.request_quantity("eth_gasPrice", vec![]).await
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ProviderError> {
        let result = self
            .request_required("eth_estimateGas", vec![tx_params(tx)])
            .await?;
        let s = result
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("non-string gas estimate".to_string()))?;
        parse_quantity_u64(s)
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<String, ProviderError> {
        let result = self
            .request_required("eth_sendTransaction", vec![tx_params(tx)])
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::InvalidResponse("non-string tx hash".to_string()))
    }

    async fn call(&self, req: &CallRequest) -> Result<Vec<u8>, ProviderError> {
        let params = vec![
            json!({
                "to": req.to,
                "data": format!("0x{}", hex::encode(&req.data)),
            }),
            json!("latest"),
        ];
        let result = self.request_required("eth_call", params).await?;
        let s = result
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("non-string call result".to_string()))?;
        parse_bytes(s)
    }

    async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<Option<TxReceipt>, ProviderError> {
        let result = self
            .request("eth_getTransactionReceipt", vec![json!(tx_hash)])
            .await?;
        let raw = match result {
            Some(value) => value,
            None => return Ok(None),
        };
        let raw: RawReceipt = serde_json::from_value(raw)
            .map_err(|e| ProviderError::InvalidResponse(format!("bad receipt: {}", e)))?;
        let status = match raw.status.as_deref() {
            Some(s) => parse_quantity_u64(s)? == 1,
            None => true,
        };
        Ok(Some(TxReceipt {
            tx_hash: raw.transaction_hash,
            status,
            block_number: parse_quantity_u64(&raw.block_number)?,
        }))
    }

    async fn block_number(&self) -> Result<u64, ProviderError> {
        let result = self.request_required("eth_blockNumber", vec![]).await?;
        let s = result
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("non-string block number".to_string()))?;
        parse_quantity_u64(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rpc_result(value: Value) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": value }))
    }

    fn rpc_error(code: i64, message: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": code, "message": message },
        }))
    }

    #[test]
    fn test_quantity_parsing() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x2a").unwrap(), 42);
        assert_eq!(
            parse_quantity("0x8ac7230489e80000").unwrap(),
            10_000_000_000_000_000_000
        );
        assert!(parse_quantity("2a").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(42), "0x2a");
    }

    #[tokio::test]
    async fn test_get_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({ "method": "eth_getBalance" })))
            .respond_with(rpc_result(json!("0x8ac7230489e80000")))
            .mount(&server)
            .await;

        let provider = EthProvider::new(server.uri(), 5_000).unwrap();
        let balance = provider.get_balance("0x1111111111111111111111111111111111111111").await;
        assert_eq!(balance.unwrap(), 10_000_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_user_rejection_maps_to_user_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_error(4001, "User rejected the request."))
            .mount(&server)
            .await;

        let provider = EthProvider::new(server.uri(), 5_000).unwrap();
        let result = provider.request_accounts().await;
        assert_eq!(result, Err(ProviderError::UserRejected));
    }

    #[tokio::test]
    async fn test_revert_maps_to_reverted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_error(3, "execution reverted: campaign closed"))
            .mount(&server)
            .await;

        let provider = EthProvider::new(server.uri(), 5_000).unwrap();
        let tx = TxRequest {
            from: "0x11".into(),
            to: "0x22".into(),
            value_wei: 1,
            data: vec![],
        };
        match provider.send_transaction(&tx).await {
            Err(ProviderError::Reverted(msg)) => {
                assert!(msg.contains("campaign closed"));
            }
            other => panic!("expected revert, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(Value::Null))
            .mount(&server)
            .await;

        let provider = EthProvider::new(server.uri(), 5_000).unwrap();
        let receipt = provider.transaction_receipt("0xabc").await.unwrap();
        assert_eq!(receipt, None);
    }

    #[tokio::test]
    async fn test_mined_receipt_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({
                "transactionHash": "0xabc",
                "status": "0x1",
                "blockNumber": "0x10",
            })))
            .mount(&server)
            .await;

        let provider = EthProvider::new(server.uri(), 5_000).unwrap();
        let receipt = provider.transaction_receipt("0xabc").await.unwrap();
        assert_eq!(
            receipt,
            Some(TxReceipt {
                tx_hash: "0xabc".to_string(),
                status: true,
                block_number: 16,
            })
        );
    }

    #[tokio::test]
    async fn test_send_transaction_includes_value_and_data() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "eth_sendTransaction",
                "params": [{
                    "from": "0x1111111111111111111111111111111111111111",
                    "to": "0x2222222222222222222222222222222222222222",
                    "value": "0x6f05b59d3b20000",
                    "data": "0xed88c68e",
                }],
            })))
            .respond_with(rpc_result(json!("0xabc")))
            .mount(&server)
            .await;

        let provider = EthProvider::new(server.uri(), 5_000).unwrap();
        let tx = TxRequest {
            from: "0x1111111111111111111111111111111111111111".into(),
            to: "0x2222222222222222222222222222222222222222".into(),
            value_wei: 500_000_000_000_000_000,
            data: vec![0xed, 0x88, 0xc6, 0x8e],
        };
        assert_eq!(provider.send_transaction(&tx).await.unwrap(), "0xabc");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        // Nothing listens on this port.
        let provider = EthProvider::new("http://127.0.0.1:9", 1_000).unwrap();
        let result = provider.gas_price().await;
        assert_eq!(result, Err(ProviderError::Unavailable));
    }
}
