//! 贡献记录实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{ContributionKind, ContributionStatus, Eligibility};

/// 一次可评分、可铸造的开发者贡献（commit 或 PR）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub id: i64,
    pub user_id: i64,
    pub repository_id: i64,
    pub kind: ContributionKind,
    /// commit sha 或 `pr#<number>`
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
    pub additions: i32,
    pub deletions: i32,
    pub changed_files: i32,
    pub score: i32,
    pub score_breakdown: serde_json::Value,
    pub eligibility: Eligibility,
    pub ineligible_reason: Option<String>,
    pub status: ContributionStatus,
    /// uint256 十进制字符串
    pub token_id: Option<String>,
    pub tx_hash: Option<String>,
    pub mint_error: Option<String>,
    pub mint_attempts: i32,
    pub mint_started_at: Option<DateTime<Utc>>,
    pub minted_at: Option<DateTime<Utc>>,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contribution {
    pub fn is_eligible(&self) -> bool {
        self.eligibility == Eligibility::Eligible
    }

    /// 元数据只对已进入铸造流程的贡献开放
    pub fn has_token_metadata(&self) -> bool {
        matches!(
            self.status,
            ContributionStatus::Minting | ContributionStatus::Completed
        )
    }
}

/// 新贡献写入记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewContribution {
    pub user_id: i64,
    pub repository_id: i64,
    pub kind: ContributionKind,
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
    pub additions: i32,
    pub deletions: i32,
    pub changed_files: i32,
    pub score: i32,
    pub score_breakdown: serde_json::Value,
    pub eligibility: Eligibility,
    pub ineligible_reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// 已被本批次认领的待铸造贡献（附带持有人钱包）
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MintCandidate {
    pub id: i64,
    pub user_id: i64,
    pub repository_id: i64,
    pub kind: ContributionKind,
    pub external_id: String,
    pub score: i32,
    pub wallet_address: String,
}

/// 列表筛选条件
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ContributionFilter {
    pub status: Option<ContributionStatus>,
    pub eligibility: Option<Eligibility>,
}

/// 仪表盘统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContributionStats {
    pub total: i64,
    pub eligible: i64,
    pub pending: i64,
    pub minting: i64,
    pub completed: i64,
    pub failed: i64,
    pub total_score: i64,
    pub average_score: f64,
}
