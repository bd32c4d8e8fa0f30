//! 追踪仓库仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::RepoRepositoryTrait;
use crate::error::Result;
use crate::models::{NewRepository, Repository};

const REPO_COLUMNS: &str = r#"
    id, github_id, owner, name, full_name, is_private, default_branch, html_url,
    tracked_by, tracking_enabled, created_at, updated_at
"#;

pub struct RepoRepository {
    pool: PgPool,
}

impl RepoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Repository>> {
        let sql = format!("SELECT {REPO_COLUMNS} FROM repositories WHERE id = $1");
        let repo = sqlx::query_as::<_, Repository>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(repo)
    }

    pub async fn find_by_github_id(&self, github_id: i64) -> Result<Option<Repository>> {
        let sql = format!("SELECT {REPO_COLUMNS} FROM repositories WHERE github_id = $1");
        let repo = sqlx::query_as::<_, Repository>(&sql)
            .bind(github_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(repo)
    }

    /// 写入或刷新仓库信息，重新开启追踪并记录追踪人
    pub async fn upsert_tracked(&self, repo: &NewRepository, user_id: i64) -> Result<Repository> {
        let sql = format!(
            r#"
            INSERT INTO repositories
                (github_id, owner, name, full_name, is_private, default_branch, html_url,
                 tracked_by, tracking_enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            ON CONFLICT (github_id) DO UPDATE SET
                owner = EXCLUDED.owner,
                name = EXCLUDED.name,
                full_name = EXCLUDED.full_name,
                is_private = EXCLUDED.is_private,
                default_branch = EXCLUDED.default_branch,
                html_url = EXCLUDED.html_url,
                tracked_by = EXCLUDED.tracked_by,
                tracking_enabled = TRUE,
                updated_at = NOW()
            RETURNING {REPO_COLUMNS}
            "#
        );

        let tracked = sqlx::query_as::<_, Repository>(&sql)
            .bind(repo.github_id)
            .bind(&repo.owner)
            .bind(&repo.name)
            .bind(&repo.full_name)
            .bind(repo.is_private)
            .bind(&repo.default_branch)
            .bind(&repo.html_url)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(tracked)
    }

    pub async fn set_tracking(&self, id: i64, enabled: bool) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE repositories SET tracking_enabled = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(enabled)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_tracked_by_user(&self, user_id: i64) -> Result<Vec<Repository>> {
        let sql = format!(
            r#"
            SELECT {REPO_COLUMNS} FROM repositories
            WHERE tracked_by = $1 AND tracking_enabled
            ORDER BY full_name ASC
            "#
        );
        let repos = sqlx::query_as::<_, Repository>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(repos)
    }
}

#[async_trait]
impl RepoRepositoryTrait for RepoRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Repository>> {
        self.find_by_id(id).await
    }

    async fn find_by_github_id(&self, github_id: i64) -> Result<Option<Repository>> {
        self.find_by_github_id(github_id).await
    }

    async fn upsert_tracked(&self, repo: &NewRepository, user_id: i64) -> Result<Repository> {
        self.upsert_tracked(repo, user_id).await
    }

    async fn set_tracking(&self, id: i64, enabled: bool) -> Result<()> {
        self.set_tracking(id, enabled).await
    }

    async fn list_tracked_by_user(&self, user_id: i64) -> Result<Vec<Repository>> {
        self.list_tracked_by_user(user_id).await
    }
}
