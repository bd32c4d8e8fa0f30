//! 以太坊 JSON-RPC 2.0 客户端

use lightcommit_shared::retry::{RetryPolicy, retry_with_policy};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use super::abi::Log;
use crate::error::{ContributionError, Result};

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// `eth_getTransactionReceipt` 的返回
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    /// `0x1` 成功，`0x0` 回滚
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

pub struct JsonRpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
    retry: RetryPolicy,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
            retry: RetryPolicy::default(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 只读调用；只有传输层错误会重试，节点返回的 error 直接上抛
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let params = &params;
        let result: Value = retry_with_policy(
            &self.retry,
            method,
            |e: &ContributionError| matches!(e, ContributionError::Http(_)),
            move || async move { self.send(method, params).await },
        )
        .await?;

        decode(method, result)
    }

    /// 写调用只发送一次
    ///
    /// 响应丢失时交易可能已进入交易池，重发会产生第二笔交易；错误原样上抛，由调用方对账。
    pub async fn call_once<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let result = self.send(method, &params).await?;
        decode(method, result)
    }

    async fn send(&self, method: &str, params: &Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "json-rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContributionError::Http(format!("{method}: http status {status}")));
        }

        let body: RpcResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(ContributionError::Chain(format!(
                "{method}: rpc error {}: {}",
                err.code, err.message
            )));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let raw: String = self.call("eth_chainId", json!([])).await?;
        super::abi::parse_quantity(&raw)
    }

    pub async fn get_code(&self, address: &str) -> Result<String> {
        self.call("eth_getCode", json!([address, "latest"])).await
    }

    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String> {
        self.call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await
    }

    pub async fn send_transaction(&self, from: &str, to: &str, data: &str) -> Result<String> {
        self.call_once(
            "eth_sendTransaction",
            json!([{ "from": from, "to": to, "data": data }]),
        )
        .await
    }

    /// 尚未打包时返回 None
    pub async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>> {
        self.call("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }
}

fn decode<T: DeserializeOwned>(method: &str, result: Value) -> Result<T> {
    serde_json::from_value(result)
        .map_err(|e| ContributionError::Chain(format!("{method}: unexpected result: {e}")))
}
