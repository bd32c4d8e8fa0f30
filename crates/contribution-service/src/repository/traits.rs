//! 仓储 Trait 定义
//!
//! 服务层依赖这些抽象，测试中以 mockall 生成的 Mock 替换

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    Contribution, ContributionFilter, ContributionStats, GithubProfile, MintCandidate,
    NewContribution, NewRepository, Repository, User,
};

/// 用户仓储接口
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;
    /// 大小写不敏感
    async fn find_by_login(&self, login: &str) -> Result<Option<User>>;
    async fn find_by_github_id(&self, github_id: i64) -> Result<Option<User>>;
    /// 以 github_id 为键；改名后旧 login 被其他账号占用时，释放对方的旧 login
    async fn upsert_github_user(
        &self,
        profile: &GithubProfile,
        access_token_encrypted: &str,
    ) -> Result<User>;
    async fn set_wallet(&self, id: i64, wallet_address: &str) -> Result<Option<User>>;
}

/// 仓库仓储接口
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait RepoRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Repository>>;
    async fn find_by_github_id(&self, github_id: i64) -> Result<Option<Repository>>;
    /// 以 github_id 为键写入，并把追踪人设为 user_id
    async fn upsert_tracked(&self, repo: &NewRepository, user_id: i64) -> Result<Repository>;
    async fn set_tracking(&self, id: i64, enabled: bool) -> Result<()>;
    async fn list_tracked_by_user(&self, user_id: i64) -> Result<Vec<Repository>>;
}

/// 贡献仓储接口
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait ContributionRepositoryTrait: Send + Sync {
    /// 按 (repository_id, kind, external_id) 去重，已存在时返回 None
    async fn insert_if_absent(&self, contribution: &NewContribution)
    -> Result<Option<Contribution>>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Contribution>>;
    async fn find_for_user(&self, user_id: i64, id: i64) -> Result<Option<Contribution>>;
    async fn list_for_user(
        &self,
        user_id: i64,
        filter: ContributionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Contribution>>;
    async fn count_for_user(&self, user_id: i64, filter: ContributionFilter) -> Result<i64>;
    async fn stats_for_user(&self, user_id: i64) -> Result<ContributionStats>;

    /// 原子认领一批待铸造贡献（pending -> minting）
    async fn claim_mint_batch(&self, limit: i64) -> Result<Vec<MintCandidate>>;
    /// 发送交易前刷新 mint_started_at；记录已不在 minting 或已有 tx_hash 时返回 false
    async fn begin_mint(&self, id: i64) -> Result<bool>;
    /// 交易发送后立即保存 tx_hash
    async fn record_mint_submission(&self, id: i64, tx_hash: &str) -> Result<bool>;
    /// 链上确认后写入结果，completed 记录不会被覆盖
    async fn mark_minted(&self, id: i64, token_id: &str, tx_hash: &str) -> Result<bool>;
    /// minting -> failed 并清空 tx_hash，只用于确定未铸造的情况
    async fn mark_mint_failed(&self, id: i64, reason: &str) -> Result<bool>;
    /// 没有 tx_hash 且开始时间早于 cutoff 的 minting 记录置为 failed，返回条数
    async fn recover_stale_minting(&self, cutoff: DateTime<Utc>, reason: &str) -> Result<u64>;
    /// 已有 tx_hash、开始时间早于 cutoff 的 minting 记录，等待回执对账
    async fn list_unconfirmed_mints(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Contribution>>;
    /// failed -> pending，受 max_attempts 限制；有 tx_hash 的记录拒绝
    async fn requeue_failed(
        &self,
        user_id: i64,
        id: i64,
        max_attempts: i32,
    ) -> Result<Option<Contribution>>;
}
