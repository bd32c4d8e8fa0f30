//! 批量铸造
//!
//! 认领与状态翻转在同一条语句中完成，并发运行不会重复铸造。
//! 批次内逐条处理，单条失败只影响该条。
//!
//! 每条记录在发送交易前重新打时间戳，发送后立即保存 tx_hash。
//! 一旦有了 tx_hash，只有回执能决定结果：回滚记为 failed，打包成功记为 completed，
//! 其余情况（超时、节点不可达）保持 minting，由 [`MintService::reconcile_unconfirmed`] 按回执对账。

use chrono::Utc;
use lightcommit_shared::observability::metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

use crate::chain::{MintReceipt, MintRequest, NftMinter};
use crate::error::{ContributionError, Result};
use crate::models::{ContributionStatus, MintCandidate};
use crate::repository::ContributionRepositoryTrait;

pub const INTERRUPTED_REASON: &str = "mint interrupted";

/// mint_error 列保存的错误信息上限
const MAX_ERROR_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintItemResult {
    pub contribution_id: i64,
    /// minting 表示结果未定，等待对账
    pub status: ContributionStatus,
    pub token_id: Option<String>,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
}

impl MintItemResult {
    fn completed(contribution_id: i64, receipt: MintReceipt) -> Self {
        Self {
            contribution_id,
            status: ContributionStatus::Completed,
            token_id: Some(receipt.token_id),
            tx_hash: Some(receipt.tx_hash),
            error: None,
        }
    }

    fn failed(contribution_id: i64, reason: String) -> Self {
        Self {
            contribution_id,
            status: ContributionStatus::Failed,
            token_id: None,
            tx_hash: None,
            error: Some(reason),
        }
    }

    fn unresolved(contribution_id: i64, tx_hash: Option<&str>, reason: String) -> Self {
        Self {
            contribution_id,
            status: ContributionStatus::Minting,
            token_id: None,
            tx_hash: tx_hash.map(str::to_string),
            error: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintBatchReport {
    /// 对账时为本轮检查的条数
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub unconfirmed: usize,
    pub items: Vec<MintItemResult>,
}

impl MintBatchReport {
    fn push(&mut self, item: MintItemResult) {
        match item.status {
            ContributionStatus::Completed => self.completed += 1,
            ContributionStatus::Failed => self.failed += 1,
            _ => self.unconfirmed += 1,
        }
        self.items.push(item);
    }
}

pub struct MintService {
    contributions: Arc<dyn ContributionRepositoryTrait>,
    minter: Arc<dyn NftMinter>,
    base_token_uri: String,
    max_batch_size: i64,
}

impl MintService {
    pub fn new(
        contributions: Arc<dyn ContributionRepositoryTrait>,
        minter: Arc<dyn NftMinter>,
        base_token_uri: &str,
        max_batch_size: i64,
    ) -> Self {
        Self {
            contributions,
            minter,
            base_token_uri: base_token_uri.trim().trim_end_matches('/').to_string(),
            max_batch_size: max_batch_size.max(1),
        }
    }

    pub fn token_uri(&self, contribution_id: i64) -> String {
        format!("{}/{}", self.base_token_uri, contribution_id)
    }

    pub fn clamp_limit(&self, limit: i64) -> i64 {
        limit.clamp(1, self.max_batch_size)
    }

    #[instrument(skip(self))]
    pub async fn run_batch(&self, limit: i64) -> Result<MintBatchReport> {
        let candidates = self
            .contributions
            .claim_mint_batch(self.clamp_limit(limit))
            .await?;

        let mut report = MintBatchReport {
            claimed: candidates.len(),
            ..Default::default()
        };
        if candidates.is_empty() {
            return Ok(report);
        }
        info!(claimed = candidates.len(), "开始批量铸造");

        for candidate in &candidates {
            let item = self.mint_one(candidate).await;
            report.push(item);
        }

        info!(
            claimed = report.claimed,
            completed = report.completed,
            failed = report.failed,
            unconfirmed = report.unconfirmed,
            "批量铸造结束"
        );
        Ok(report)
    }

    async fn mint_one(&self, candidate: &MintCandidate) -> MintItemResult {
        let id = candidate.id;
        match self.contributions.begin_mint(id).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(contribution_id = id, "记录已被回收或已提交，跳过");
                return MintItemResult::unresolved(id, None, "no longer claimable".to_string());
            }
            Err(e) => {
                error!(contribution_id = id, error = %e, "刷新铸造时间失败，跳过");
                let reason = truncate(&e.to_string(), MAX_ERROR_LEN);
                return MintItemResult::unresolved(id, None, reason);
            }
        }

        let request = MintRequest {
            contribution_id: id,
            to: candidate.wallet_address.clone(),
            token_uri: self.token_uri(id),
        };

        let started = Instant::now();
        let tx_hash = match self.minter.submit_mint(&request).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                let item = self.submission_failed(id, e).await;
                let elapsed = started.elapsed().as_secs_f64();
                metrics::record_mint_attempt(outcome_label(item.status), elapsed);
                return item;
            }
        };

        match self.contributions.record_mint_submission(id, &tx_hash).await {
            Ok(true) => {}
            Ok(false) => warn!(
                contribution_id = id,
                tx_hash = %tx_hash,
                "保存 tx_hash 时记录已不在 minting 状态"
            ),
            Err(e) => error!(
                contribution_id = id,
                tx_hash = %tx_hash,
                error = %e,
                "保存 tx_hash 失败"
            ),
        }

        let outcome = self.minter.confirm_mint(&tx_hash).await;
        let item = self.settle(id, &tx_hash, outcome).await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_mint_attempt(outcome_label(item.status), elapsed);
        item
    }

    /// 传输层错误时响应可能丢失、交易可能已发出，不能标记失败
    async fn submission_failed(&self, id: i64, err: ContributionError) -> MintItemResult {
        let reason = truncate(&err.to_string(), MAX_ERROR_LEN);
        if matches!(err, ContributionError::Http(_)) {
            error!(contribution_id = id, error = %reason, "铸造交易提交结果未知，保持 minting");
            return MintItemResult::unresolved(id, None, reason);
        }

        warn!(contribution_id = id, error = %reason, "铸造交易被拒绝");
        self.mark_failed(id, &reason).await;
        MintItemResult::failed(id, reason)
    }

    /// 按回执结果落库；批次与对账共用
    async fn settle(&self, id: i64, tx_hash: &str, outcome: Result<MintReceipt>) -> MintItemResult {
        match outcome {
            Ok(receipt) => {
                match self
                    .contributions
                    .mark_minted(id, &receipt.token_id, &receipt.tx_hash)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => warn!(
                        contribution_id = id,
                        tx_hash = %receipt.tx_hash,
                        "记录已是 completed"
                    ),
                    // 链上已成功，不能再标记失败；保留 minting 与 tx_hash，对账时重写
                    Err(e) => error!(
                        contribution_id = id,
                        tx_hash = %receipt.tx_hash,
                        error = %e,
                        "保存铸造结果失败"
                    ),
                }
                info!(
                    contribution_id = id,
                    token_id = %receipt.token_id,
                    tx_hash = %receipt.tx_hash,
                    "铸造完成"
                );
                MintItemResult::completed(id, receipt)
            }
            Err(e @ ContributionError::MintReverted(_)) => {
                let reason = truncate(&e.to_string(), MAX_ERROR_LEN);
                warn!(contribution_id = id, error = %reason, "铸造失败");
                self.mark_failed(id, &reason).await;
                MintItemResult::failed(id, reason)
            }
            Err(e) => {
                let reason = truncate(&e.to_string(), MAX_ERROR_LEN);
                warn!(
                    contribution_id = id,
                    tx_hash = %tx_hash,
                    error = %reason,
                    "铸造结果未确认，等待对账"
                );
                MintItemResult::unresolved(id, Some(tx_hash), reason)
            }
        }
    }

    async fn mark_failed(&self, id: i64, reason: &str) {
        if let Err(e) = self.contributions.mark_mint_failed(id, reason).await {
            error!(contribution_id = id, error = %e, "保存失败状态出错");
        }
    }

    /// 进程崩溃后遗留的、尚未提交交易的 minting 记录置为 failed，用户可手动重试
    pub async fn recover_stale(&self, stale_after: Duration) -> Result<u64> {
        let recovered = self
            .contributions
            .recover_stale_minting(cutoff(stale_after), INTERRUPTED_REASON)
            .await?;
        if recovered > 0 {
            warn!(recovered, "回收中断的铸造记录");
        }
        Ok(recovered)
    }

    /// 按 tx_hash 查询回执，结束已提交但未确认的铸造；尚未打包的保持不变
    #[instrument(skip(self))]
    pub async fn reconcile_unconfirmed(
        &self,
        stale_after: Duration,
        limit: i64,
    ) -> Result<MintBatchReport> {
        let rows = self
            .contributions
            .list_unconfirmed_mints(cutoff(stale_after), self.clamp_limit(limit))
            .await?;

        let mut report = MintBatchReport {
            claimed: rows.len(),
            ..Default::default()
        };
        for row in rows {
            let Some(tx_hash) = row.tx_hash else {
                continue;
            };
            let item = match self.minter.lookup_mint(&tx_hash).await {
                Ok(Some(receipt)) => self.settle(row.id, &tx_hash, Ok(receipt)).await,
                Ok(None) => MintItemResult::unresolved(
                    row.id,
                    Some(&tx_hash),
                    "receipt not available".to_string(),
                ),
                Err(e) => self.settle(row.id, &tx_hash, Err(e)).await,
            };
            report.push(item);
        }

        if report.completed + report.failed > 0 {
            info!(
                checked = report.claimed,
                completed = report.completed,
                failed = report.failed,
                "对账完成"
            );
        }
        Ok(report)
    }
}

fn cutoff(stale_after: Duration) -> chrono::DateTime<Utc> {
    let stale_after = chrono::Duration::from_std(stale_after).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_sub_signed(stale_after)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC)
}

fn outcome_label(status: ContributionStatus) -> &'static str {
    match status {
        ContributionStatus::Completed => "completed",
        ContributionStatus::Failed => "failed",
        _ => "unconfirmed",
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    if message.chars().count() <= max_chars {
        message.to_string()
    } else {
        message.chars().take(max_chars).collect()
    }
}
