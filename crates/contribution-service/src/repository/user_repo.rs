//! 用户仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::UserRepositoryTrait;
use crate::error::Result;
use crate::models::{GithubProfile, User};

const USER_COLUMNS: &str = r#"
    id, github_id, login, name, email, avatar_url, wallet_address,
    access_token_encrypted, created_at, updated_at
"#;

pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(login) = LOWER($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_github_id(&self, github_id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE github_id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(github_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// 按 github_id 写入；已存在时刷新资料与 token，保留钱包地址
    ///
    /// GitHub 允许改名后由他人注册旧名。login 唯一，所以同一事务中先把占用该 login 的
    /// 其他账号改成 `login#github_id`（`#` 不是合法的 GitHub 用户名字符），对方下次登录时会恢复。
    pub async fn upsert_github_user(
        &self,
        profile: &GithubProfile,
        access_token_encrypted: &str,
    ) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (github_id, login, name, email, avatar_url, access_token_encrypted)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (github_id) DO UPDATE SET
                login = EXCLUDED.login,
                name = EXCLUDED.name,
                email = COALESCE(EXCLUDED.email, users.email),
                avatar_url = EXCLUDED.avatar_url,
                access_token_encrypted = EXCLUDED.access_token_encrypted,
                updated_at = NOW()
            RETURNING {USER_COLUMNS}
            "#
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET login = login || '#' || github_id::text, updated_at = NOW()
            WHERE LOWER(login) = LOWER($2) AND github_id <> $1
            "#,
        )
        .bind(profile.github_id)
        .bind(&profile.login)
        .execute(&mut *tx)
        .await?;

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(profile.github_id)
            .bind(&profile.login)
            .bind(&profile.name)
            .bind(&profile.email)
            .bind(&profile.avatar_url)
            .bind(access_token_encrypted)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    pub async fn set_wallet(&self, id: i64, wallet_address: &str) -> Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users SET wallet_address = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(wallet_address)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_by_id(id).await
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        self.find_by_login(login).await
    }

    async fn find_by_github_id(&self, github_id: i64) -> Result<Option<User>> {
        self.find_by_github_id(github_id).await
    }

    async fn upsert_github_user(
        &self,
        profile: &GithubProfile,
        access_token_encrypted: &str,
    ) -> Result<User> {
        self.upsert_github_user(profile, access_token_encrypted)
            .await
    }

    async fn set_wallet(&self, id: i64, wallet_address: &str) -> Result<Option<User>> {
        self.set_wallet(id, wallet_address).await
    }
}
