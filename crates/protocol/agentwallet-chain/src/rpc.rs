//! Solana JSON-RPC implementation of [`ChainGateway`].

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use agentwallet_crypto::{Hash, Pubkey, Signature};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::RpcConfig;
use crate::error::{ChainError, ChainResult};
use crate::retry::RetryPolicy;
use crate::traits::{ChainGateway, SignatureStatus, TokenAccount};

/// SPL Token program, used when listing every token account of an owner.
const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// JSON-RPC client for a Solana node.
///
/// Every call goes through the configured [`RetryPolicy`], so a transient
/// failure is retried with backoff and only the final outcome surfaces.
pub struct RpcGateway {
    client: Client,
    config: RpcConfig,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl RpcGateway {
    /// Create a gateway from configuration.
    pub fn new(config: RpcConfig) -> ChainResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::config(format!("failed to create HTTP client: {}", e)))?;

        info!(
            network = %config.network,
            endpoint = %config.endpoint(),
            "RPC gateway initialized"
        );

        Ok(Self {
            client,
            retry: RetryPolicy::from_config(&config.retry),
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Perform a JSON-RPC call with retries, returning the `result` member.
    pub async fn call(&self, method: &str, params: Value) -> ChainResult<Value> {
        self.retry
            .execute(|| self.call_once(method, params.clone()))
            .await
    }

    async fn call_once(&self, method: &str, params: Value) -> ChainResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "RPC request");

        let response = self
            .client
            .post(self.config.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ChainError::network(format!(
                "{} returned HTTP {}: {}",
                method, status, text
            )));
        }

        let parsed: RpcResponse = response
            .json()
            .await
            .map_err(|e| ChainError::invalid_response(format!("{}: {}", method, e)))?;

        if let Some(err) = parsed.error {
            return Err(ChainError::rpc(err.code, err.message));
        }
        parsed
            .result
            .ok_or_else(|| ChainError::invalid_response(format!("{}: missing result", method)))
    }

    fn commitment(&self) -> Value {
        json!({ "commitment": self.config.commitment })
    }
}

fn map_transport_error(e: reqwest::Error) -> ChainError {
    if e.is_timeout() {
        ChainError::timeout(e.to_string())
    } else {
        ChainError::network(e.to_string())
    }
}

fn parse_pubkey(value: &Value, what: &str) -> ChainResult<Pubkey> {
    value
        .as_str()
        .ok_or_else(|| ChainError::invalid_response(format!("{} is not a string", what)))?
        .parse()
        .map_err(|e| ChainError::invalid_response(format!("bad {}: {}", what, e)))
}

fn parse_signature_status(result: &Value) -> ChainResult<SignatureStatus> {
    let entry = result
        .pointer("/value/0")
        .ok_or_else(|| ChainError::invalid_response("getSignatureStatuses: missing value"))?;
    if entry.is_null() {
        return Ok(SignatureStatus::Pending);
    }
    if let Some(err) = entry.get("err").filter(|e| !e.is_null()) {
        return Ok(SignatureStatus::Failed(err.to_string()));
    }
    match entry.get("confirmationStatus").and_then(Value::as_str) {
        Some("confirmed") | Some("finalized") => Ok(SignatureStatus::Confirmed),
        _ => Ok(SignatureStatus::Pending),
    }
}

fn parse_token_account(entry: &Value) -> ChainResult<TokenAccount> {
    let address = parse_pubkey(&entry["pubkey"], "token account pubkey")?;
    let info = entry
        .pointer("/account/data/parsed/info")
        .ok_or_else(|| ChainError::invalid_response("token account is not jsonParsed"))?;
    let mint = parse_pubkey(&info["mint"], "token mint")?;
    let amount = info
        .pointer("/tokenAmount/amount")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| ChainError::invalid_response("token account amount"))?;
    let decimals = info
        .pointer("/tokenAmount/decimals")
        .and_then(Value::as_u64)
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| ChainError::invalid_response("token account decimals"))?;
    Ok(TokenAccount {
        address,
        mint,
        amount,
        decimals,
    })
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn get_balance(&self, address: &Pubkey) -> ChainResult<u64> {
        let result = self
            .call("getBalance", json!([address.to_string(), self.commitment()]))
            .await?;
        result["value"]
            .as_u64()
            .ok_or_else(|| ChainError::invalid_response("getBalance: value is not a number"))
    }

    async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
        let result = self
            .call("getLatestBlockhash", json!([self.commitment()]))
            .await?;
        result
            .pointer("/value/blockhash")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::invalid_response("getLatestBlockhash: missing blockhash"))?
            .parse()
            .map_err(|e| ChainError::invalid_response(format!("bad blockhash: {}", e)))
    }

    async fn get_account_info(&self, address: &Pubkey) -> ChainResult<Option<Vec<u8>>> {
        let result = self
            .call(
                "getAccountInfo",
                json!([
                    address.to_string(),
                    { "encoding": "base64", "commitment": self.config.commitment }
                ]),
            )
            .await?;
        let value = &result["value"];
        if value.is_null() {
            return Ok(None);
        }
        let encoded = value
            .pointer("/data/0")
            .and_then(Value::as_str)
            .ok_or_else(|| ChainError::invalid_response("getAccountInfo: missing data"))?;
        let data = BASE64
            .decode(encoded)
            .map_err(|e| ChainError::invalid_response(format!("account data: {}", e)))?;
        Ok(Some(data))
    }

    async fn get_token_accounts(
        &self,
        owner: &Pubkey,
        mint: Option<&Pubkey>,
    ) -> ChainResult<Vec<TokenAccount>> {
        let filter = match mint {
            Some(mint) => json!({ "mint": mint.to_string() }),
            None => json!({ "programId": TOKEN_PROGRAM }),
        };
        let result = self
            .call(
                "getTokenAccountsByOwner",
                json!([
                    owner.to_string(),
                    filter,
                    { "encoding": "jsonParsed", "commitment": self.config.commitment }
                ]),
            )
            .await?;
        result["value"]
            .as_array()
            .ok_or_else(|| ChainError::invalid_response("getTokenAccountsByOwner: value"))?
            .iter()
            .map(parse_token_account)
            .collect()
    }

    async fn send_transaction(&self, wire: &[u8]) -> ChainResult<Signature> {
        let encoded = bs58::encode(wire).into_string();
        let result = self
            .call(
                "sendTransaction",
                json!([
                    encoded,
                    { "encoding": "base58", "preflightCommitment": self.config.commitment }
                ]),
            )
            .await?;
        let signature = result
            .as_str()
            .ok_or_else(|| ChainError::invalid_response("sendTransaction: result is not a string"))?
            .parse()
            .map_err(|e| ChainError::invalid_response(format!("bad signature: {}", e)))?;
        debug!(signature = %signature, "Transaction submitted");
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> ChainResult<SignatureStatus> {
        let result = self
            .call(
                "getSignatureStatuses",
                json!([[signature.to_string()], { "searchTransactionHistory": true }]),
            )
            .await?;
        parse_signature_status(&result)
    }
}

impl std::fmt::Debug for RpcGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcGateway")
            .field("endpoint", &self.config.endpoint())
            .field("network", &self.config.network)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve canned HTTP responses in order, one per connection, recording
    /// each request body.
    async fn serve(responses: Vec<(u16, String)>) -> (String, Arc<Mutex<Vec<Value>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&seen);

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let request = read_request(&mut socket).await;
                if let Ok(value) = serde_json::from_slice::<Value>(&request) {
                    recorded.lock().unwrap().push(value);
                }
                let reply = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), seen)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return Vec::new();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = find_header_end(&buf) {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                while buf.len() < end + 4 + length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }
                return buf[end + 4..].to_vec();
            }
        }
    }

    fn find_header_end(buf: &[u8]) -> Option<usize> {
        buf.windows(4).position(|w| w == b"\r\n\r\n")
    }

    fn gateway(url: &str, attempts: u32) -> RpcGateway {
        let mut config = RpcConfig::with_url(url);
        config.retry = RetryConfig {
            max_attempts: attempts,
            base_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
        };
        RpcGateway::new(config).unwrap()
    }

    fn ok(result: Value) -> (u16, String) {
        (200, json!({"jsonrpc": "2.0", "id": 1, "result": result}).to_string())
    }

    #[tokio::test]
    async fn test_get_balance() {
        let (url, seen) = serve(vec![ok(json!({"context": {"slot": 1}, "value": 1_500_000_000u64}))]).await;
        let rpc = gateway(&url, 1);
        let address = Pubkey::new([7; 32]);

        assert_eq!(rpc.get_balance(&address).await.unwrap(), 1_500_000_000);

        let requests = seen.lock().unwrap();
        assert_eq!(requests[0]["method"], "getBalance");
        assert_eq!(requests[0]["params"][0], address.to_string());
        assert_eq!(requests[0]["params"][1]["commitment"], "confirmed");
    }

    #[tokio::test]
    async fn test_retries_rpc_error_then_succeeds() {
        let error = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32005, "message": "node is behind"}});
        let blockhash = Hash([3; 32]);
        let (url, seen) = serve(vec![
            (200, error.to_string()),
            (503, "unavailable".to_string()),
            ok(json!({"value": {"blockhash": blockhash.to_string(), "lastValidBlockHeight": 10}})),
        ])
        .await;
        let rpc = gateway(&url, 4);

        assert_eq!(rpc.get_latest_blockhash().await.unwrap(), blockhash);
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_last_error() {
        let (url, _) = serve(vec![
            (500, "boom".to_string()),
            (500, "boom".to_string()),
        ])
        .await;
        let rpc = gateway(&url, 2);

        let err = rpc.get_balance(&Pubkey::default()).await.unwrap_err();
        match err {
            ChainError::RetryExhausted { attempts, last_error } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*last_error, ChainError::Network(_)));
            }
            other => panic!("expected RetryExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_preflight_failure_not_retried() {
        let error = json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32002, "message": "Transaction simulation failed"}
        });
        let (url, seen) = serve(vec![(200, error.to_string())]).await;
        let rpc = gateway(&url, 4);

        let err = rpc.send_transaction(&[1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ChainError::TransactionFailed(_)));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_send_transaction_encodes_base58() {
        let signature = Signature::from_bytes([9; 64]);
        let (url, seen) = serve(vec![ok(json!(signature.to_string()))]).await;
        let rpc = gateway(&url, 1);

        assert_eq!(rpc.send_transaction(&[0, 1, 2]).await.unwrap(), signature);
        let requests = seen.lock().unwrap();
        assert_eq!(requests[0]["params"][0], bs58::encode([0u8, 1, 2]).into_string());
        assert_eq!(requests[0]["params"][1]["encoding"], "base58");
    }

    #[tokio::test]
    async fn test_account_info_missing_and_present() {
        let (url, _) = serve(vec![
            ok(json!({"value": null})),
            ok(json!({"value": {"data": [BASE64.encode([1u8, 2, 3]), "base64"], "lamports": 1}})),
        ])
        .await;
        let rpc = gateway(&url, 1);
        let address = Pubkey::new([1; 32]);

        assert_eq!(rpc.get_account_info(&address).await.unwrap(), None);
        assert_eq!(rpc.get_account_info(&address).await.unwrap(), Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_token_accounts() {
        let mint = Pubkey::new([5; 32]);
        let account = Pubkey::new([6; 32]);
        let (url, seen) = serve(vec![ok(json!({"value": [{
            "pubkey": account.to_string(),
            "account": {"data": {"parsed": {"info": {
                "mint": mint.to_string(),
                "tokenAmount": {"amount": "2500000", "decimals": 6}
            }}}}
        }]}))])
        .await;
        let rpc = gateway(&url, 1);

        let accounts = rpc
            .get_token_accounts(&Pubkey::new([1; 32]), Some(&mint))
            .await
            .unwrap();
        assert_eq!(
            accounts,
            vec![TokenAccount {
                address: account,
                mint,
                amount: 2_500_000,
                decimals: 6
            }]
        );
        assert_eq!(seen.lock().unwrap()[0]["params"][1]["mint"], mint.to_string());
    }

    #[test]
    fn test_parse_signature_status() {
        assert_eq!(
            parse_signature_status(&json!({"value": [null]})).unwrap(),
            SignatureStatus::Pending
        );
        assert_eq!(
            parse_signature_status(&json!({"value": [{"err": null, "confirmationStatus": "processed"}]}))
                .unwrap(),
            SignatureStatus::Pending
        );
        assert_eq!(
            parse_signature_status(&json!({"value": [{"err": null, "confirmationStatus": "finalized"}]}))
                .unwrap(),
            SignatureStatus::Confirmed
        );
        let failed = parse_signature_status(&json!({"value": [{
            "err": {"InstructionError": [0, {"Custom": 6002}]},
            "confirmationStatus": "confirmed"
        }]}))
        .unwrap();
        match failed {
            SignatureStatus::Failed(reason) => assert!(reason.contains("6002")),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(parse_signature_status(&json!({})).is_err());
    }
}
