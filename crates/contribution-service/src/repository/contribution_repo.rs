//! 贡献仓储
//!
//! 铸造相关的状态变更都带 `status` 条件，避免并发批次互相覆盖。
//! 已记录 tx_hash 的 minting 记录只能通过回执对账结束，回收与重试都不会碰它。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::traits::ContributionRepositoryTrait;
use crate::error::Result;
use crate::models::{
    Contribution, ContributionFilter, ContributionStats, MintCandidate, NewContribution,
};

const CONTRIBUTION_COLUMNS: &str = r#"
    id, user_id, repository_id, kind, external_id, title, url,
    additions, deletions, changed_files, score, score_breakdown,
    eligibility, ineligible_reason, status, token_id, tx_hash, mint_error,
    mint_attempts, mint_started_at, minted_at, occurred_at, created_at, updated_at
"#;

pub struct ContributionRepository {
    pool: PgPool,
}

impl ContributionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 写入新贡献；唯一键冲突（重复投递）时返回 None
    pub async fn insert_if_absent(
        &self,
        contribution: &NewContribution,
    ) -> Result<Option<Contribution>> {
        let sql = format!(
            r#"
            INSERT INTO contributions
                (user_id, repository_id, kind, external_id, title, url,
                 additions, deletions, changed_files, score, score_breakdown,
                 eligibility, ineligible_reason, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (repository_id, kind, external_id) DO NOTHING
            RETURNING {CONTRIBUTION_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, Contribution>(&sql)
            .bind(contribution.user_id)
            .bind(contribution.repository_id)
            .bind(contribution.kind)
            .bind(&contribution.external_id)
            .bind(&contribution.title)
            .bind(&contribution.url)
            .bind(contribution.additions)
            .bind(contribution.deletions)
            .bind(contribution.changed_files)
            .bind(contribution.score)
            .bind(&contribution.score_breakdown)
            .bind(contribution.eligibility)
            .bind(&contribution.ineligible_reason)
            .bind(contribution.occurred_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(inserted)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Contribution>> {
        let sql = format!("SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE id = $1");
        let contribution = sqlx::query_as::<_, Contribution>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contribution)
    }

    pub async fn find_for_user(&self, user_id: i64, id: i64) -> Result<Option<Contribution>> {
        let sql = format!(
            "SELECT {CONTRIBUTION_COLUMNS} FROM contributions WHERE id = $1 AND user_id = $2"
        );
        let contribution = sqlx::query_as::<_, Contribution>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contribution)
    }

    pub async fn list_for_user(
        &self,
        user_id: i64,
        filter: ContributionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Contribution>> {
        let sql = format!(
            r#"
            SELECT {CONTRIBUTION_COLUMNS} FROM contributions
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::varchar IS NULL OR eligibility = $3)
            ORDER BY occurred_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#
        );

        let contributions = sqlx::query_as::<_, Contribution>(&sql)
            .bind(user_id)
            .bind(filter.status)
            .bind(filter.eligibility)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(contributions)
    }

    pub async fn count_for_user(&self, user_id: i64, filter: ContributionFilter) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM contributions
            WHERE user_id = $1
              AND ($2::varchar IS NULL OR status = $2)
              AND ($3::varchar IS NULL OR eligibility = $3)
            "#,
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.eligibility)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn stats_for_user(&self, user_id: i64) -> Result<ContributionStats> {
        let stats = sqlx::query_as::<_, ContributionStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE eligibility = 'eligible') AS eligible,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                COUNT(*) FILTER (WHERE status = 'minting') AS minting,
                COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                COALESCE(SUM(score), 0)::BIGINT AS total_score,
                COALESCE(AVG(score), 0)::FLOAT8 AS average_score
            FROM contributions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// 认领一批待铸造贡献
    ///
    /// 选取与状态翻转在同一条语句中完成；`SKIP LOCKED` 保证并发批次拿到不相交的集合。
    /// 钱包未绑定的贡献保持 pending，等待用户绑定后再铸造。
    pub async fn claim_mint_batch(&self, limit: i64) -> Result<Vec<MintCandidate>> {
        let mut candidates = sqlx::query_as::<_, MintCandidate>(
            r#"
            WITH candidates AS (
                SELECT c.id
                FROM contributions c
                JOIN users u ON u.id = c.user_id
                WHERE c.status = 'pending'
                  AND c.eligibility = 'eligible'
                  AND c.tx_hash IS NULL
                  AND u.wallet_address IS NOT NULL
                ORDER BY c.created_at ASC, c.id ASC
                LIMIT $1
                FOR UPDATE OF c SKIP LOCKED
            )
            UPDATE contributions c
            SET status = 'minting',
                mint_attempts = c.mint_attempts + 1,
                mint_started_at = NOW(),
                mint_error = NULL,
                updated_at = NOW()
            FROM candidates, users u
            WHERE c.id = candidates.id AND u.id = c.user_id
            RETURNING c.id, c.user_id, c.repository_id, c.kind, c.external_id, c.score,
                      u.wallet_address
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        // RETURNING 不保证顺序，按 id（即创建顺序）处理
        candidates.sort_by_key(|c| c.id);
        Ok(candidates)
    }

    /// 发送交易前刷新 mint_started_at
    ///
    /// 批次认领时间对排在后面的条目可能已过期；返回 false 表示记录已被回收或已提交过，跳过。
    pub async fn begin_mint(&self, id: i64) -> Result<bool> {
        let started: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE contributions
            SET mint_started_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'minting' AND tx_hash IS NULL
            RETURNING id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(started.is_some())
    }

    pub async fn record_mint_submission(&self, id: i64, tx_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contributions
            SET tx_hash = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'minting' AND tx_hash IS NULL
            "#,
        )
        .bind(id)
        .bind(tx_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 链上已确认的结果优先于本地状态，只有 completed 不会被覆盖
    pub async fn mark_minted(&self, id: i64, token_id: &str, tx_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contributions
            SET status = 'completed', token_id = $2, tx_hash = $3, mint_error = NULL,
                minted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status <> 'completed'
            "#,
        )
        .bind(id)
        .bind(token_id)
        .bind(tx_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 仅用于确定没有铸造的情况（提交被拒或交易回滚），同时清掉 tx_hash 以允许重试
    pub async fn mark_mint_failed(&self, id: i64, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE contributions
            SET status = 'failed', mint_error = $2, tx_hash = NULL, updated_at = NOW()
            WHERE id = $1 AND status = 'minting'
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn recover_stale_minting(&self, cutoff: DateTime<Utc>, reason: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE contributions
            SET status = 'failed', mint_error = $2, updated_at = NOW()
            WHERE status = 'minting' AND tx_hash IS NULL AND mint_started_at < $1
            "#,
        )
        .bind(cutoff)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// 已提交交易但尚未确认的 minting 记录，按开始时间排序
    pub async fn list_unconfirmed_mints(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Contribution>> {
        let sql = format!(
            r#"
            SELECT {CONTRIBUTION_COLUMNS} FROM contributions
            WHERE status = 'minting' AND tx_hash IS NOT NULL AND mint_started_at < $1
            ORDER BY mint_started_at ASC, id ASC
            LIMIT $2
            "#
        );

        let contributions = sqlx::query_as::<_, Contribution>(&sql)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(contributions)
    }

    pub async fn requeue_failed(
        &self,
        user_id: i64,
        id: i64,
        max_attempts: i32,
    ) -> Result<Option<Contribution>> {
        let sql = format!(
            r#"
            UPDATE contributions
            SET status = 'pending', mint_error = NULL, mint_started_at = NULL, updated_at = NOW()
            WHERE id = $1 AND user_id = $2 AND status = 'failed' AND mint_attempts < $3
              AND tx_hash IS NULL
            RETURNING {CONTRIBUTION_COLUMNS}
            "#
        );

        let contribution = sqlx::query_as::<_, Contribution>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(max_attempts)
            .fetch_optional(&self.pool)
            .await?;

        Ok(contribution)
    }
}

#[async_trait]
impl ContributionRepositoryTrait for ContributionRepository {
    async fn insert_if_absent(
        &self,
        contribution: &NewContribution,
    ) -> Result<Option<Contribution>> {
        self.insert_if_absent(contribution).await
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Contribution>> {
        self.find_by_id(id).await
    }

    async fn find_for_user(&self, user_id: i64, id: i64) -> Result<Option<Contribution>> {
        self.find_for_user(user_id, id).await
    }

    async fn list_for_user(
        &self,
        user_id: i64,
        filter: ContributionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Contribution>> {
        self.list_for_user(user_id, filter, limit, offset).await
    }

    async fn count_for_user(&self, user_id: i64, filter: ContributionFilter) -> Result<i64> {
        self.count_for_user(user_id, filter).await
    }

    async fn stats_for_user(&self, user_id: i64) -> Result<ContributionStats> {
        self.stats_for_user(user_id).await
    }

    async fn claim_mint_batch(&self, limit: i64) -> Result<Vec<MintCandidate>> {
        self.claim_mint_batch(limit).await
    }

    async fn begin_mint(&self, id: i64) -> Result<bool> {
        self.begin_mint(id).await
    }

    async fn record_mint_submission(&self, id: i64, tx_hash: &str) -> Result<bool> {
        self.record_mint_submission(id, tx_hash).await
    }

    async fn mark_minted(&self, id: i64, token_id: &str, tx_hash: &str) -> Result<bool> {
        self.mark_minted(id, token_id, tx_hash).await
    }

    async fn mark_mint_failed(&self, id: i64, reason: &str) -> Result<bool> {
        self.mark_mint_failed(id, reason).await
    }

    async fn recover_stale_minting(&self, cutoff: DateTime<Utc>, reason: &str) -> Result<u64> {
        self.recover_stale_minting(cutoff, reason).await
    }

    async fn list_unconfirmed_mints(
        &self,
        cutoff: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Contribution>> {
        self.list_unconfirmed_mints(cutoff, limit).await
    }

    async fn requeue_failed(
        &self,
        user_id: i64,
        id: i64,
        max_attempts: i32,
    ) -> Result<Option<Contribution>> {
        self.requeue_failed(user_id, id, max_attempts).await
    }
}
