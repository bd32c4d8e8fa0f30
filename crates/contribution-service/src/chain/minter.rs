//! CommitNFT 铸造
//!
//! 通过节点侧已解锁的 minter 账户发送 `eth_sendTransaction`，然后轮询回执。
//! 交易只发送一次；回执超时的记录保留 tx_hash，之后按 tx_hash 对账。

use async_trait::async_trait;
use lightcommit_shared::config::ChainConfig;
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::abi::{self, Address};
use super::rpc::{JsonRpcClient, TransactionReceipt};
use crate::error::{ContributionError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct MintRequest {
    pub contribution_id: i64,
    pub to: String,
    pub token_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintReceipt {
    pub token_id: String,
    pub tx_hash: String,
    pub block_number: Option<u64>,
}

/// 铸造接口，MintService 与测试依赖此 trait
///
/// 提交与确认分开：tx_hash 先落库，确认阶段出错也不会重发交易。
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait NftMinter: Send + Sync {
    /// 发送 safeMint 交易，返回 tx_hash；不重试
    async fn submit_mint(&self, request: &MintRequest) -> Result<String>;
    /// 轮询回执直到打包或超时（`MintTimeout`）；回滚返回 `MintReverted`
    async fn confirm_mint(&self, tx_hash: &str) -> Result<MintReceipt>;
    /// 单次查询回执，尚未打包时返回 None
    async fn lookup_mint(&self, tx_hash: &str) -> Result<Option<MintReceipt>>;
    async fn chain_id(&self) -> Result<u64>;
}

pub struct RpcNftMinter {
    rpc: JsonRpcClient,
    minter: Address,
    contract: Address,
    receipt_timeout: Duration,
    poll_interval: Duration,
}

impl RpcNftMinter {
    pub fn new(config: &ChainConfig) -> Result<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(config.rpc_url.clone())?,
            minter: abi::parse_address(&config.minter_address)?,
            contract: abi::parse_address(&config.commit_nft_address)?,
            receipt_timeout: Duration::from_secs(config.receipt_timeout_secs),
            poll_interval: Duration::from_millis(config.receipt_poll_interval_ms.max(50)),
        })
    }

    fn interpret(&self, tx_hash: &str, receipt: TransactionReceipt) -> Result<MintReceipt> {
        if !receipt.is_success() {
            warn!(tx_hash = %tx_hash, "mint transaction reverted");
            return Err(ContributionError::MintReverted(tx_hash.to_string()));
        }

        let token_id = abi::minted_token_id(&receipt.logs, &self.contract).ok_or_else(|| {
            ContributionError::Chain(format!("no Transfer event in receipt: {tx_hash}"))
        })?;
        let block_number = receipt
            .block_number
            .as_deref()
            .and_then(|b| abi::parse_quantity(b).ok());

        Ok(MintReceipt {
            token_id,
            tx_hash: tx_hash.to_string(),
            block_number,
        })
    }
}

#[async_trait]
impl NftMinter for RpcNftMinter {
    #[instrument(skip(self, request), fields(contribution_id = request.contribution_id))]
    async fn submit_mint(&self, request: &MintRequest) -> Result<String> {
        let to = abi::parse_address(&request.to)?;
        let calldata = abi::encode_safe_mint(&to, &request.token_uri);

        let tx_hash = self
            .rpc
            .send_transaction(&self.minter.to_hex(), &self.contract.to_hex(), &calldata)
            .await?;
        info!(tx_hash = %tx_hash, "mint transaction submitted");
        Ok(tx_hash)
    }

    async fn confirm_mint(&self, tx_hash: &str) -> Result<MintReceipt> {
        let deadline = Instant::now() + self.receipt_timeout;
        loop {
            if let Some(receipt) = self.lookup_mint(tx_hash).await? {
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(ContributionError::MintTimeout(tx_hash.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn lookup_mint(&self, tx_hash: &str) -> Result<Option<MintReceipt>> {
        match self.rpc.get_transaction_receipt(tx_hash).await? {
            Some(receipt) => self.interpret(tx_hash, receipt).map(Some),
            None => Ok(None),
        }
    }

    async fn chain_id(&self) -> Result<u64> {
        self.rpc.chain_id().await
    }
}
