//! 用户服务：OAuth 登录落库、钱包绑定、token 解密

use lightcommit_shared::crypto::FieldEncryptor;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{ContributionError, Result};
use crate::github::GitHubUser;
use crate::models::{GithubProfile, User, normalize_wallet_address};
use crate::repository::UserRepositoryTrait;

impl From<GitHubUser> for GithubProfile {
    fn from(user: GitHubUser) -> Self {
        Self {
            github_id: user.id,
            login: user.login,
            name: user.name,
            email: user.email,
            avatar_url: user.avatar_url,
        }
    }
}

pub struct UserService {
    users: Arc<dyn UserRepositoryTrait>,
    encryptor: FieldEncryptor,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepositoryTrait>, encryptor: FieldEncryptor) -> Self {
        Self { users, encryptor }
    }

    /// 加密 token 后按 github_id upsert
    #[instrument(skip(self, profile, access_token), fields(login = %profile.login))]
    pub async fn sign_in_with_github(
        &self,
        profile: &GithubProfile,
        access_token: &str,
    ) -> Result<User> {
        let encrypted = self.encryptor.encrypt(access_token)?;
        let user = self.users.upsert_github_user(profile, &encrypted).await?;
        info!(user_id = user.id, "GitHub 用户登录");
        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(ContributionError::UserNotFound(id))
    }

    pub async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        self.users.find_by_login(login).await
    }

    pub async fn find_by_github_id(&self, github_id: i64) -> Result<Option<User>> {
        self.users.find_by_github_id(github_id).await
    }

    pub async fn set_wallet(&self, id: i64, raw_address: &str) -> Result<User> {
        let address = normalize_wallet_address(raw_address)?;
        let user = self
            .users
            .set_wallet(id, &address)
            .await?
            .ok_or(ContributionError::UserNotFound(id))?;
        info!(user_id = id, wallet = %address, "钱包地址已绑定");
        Ok(user)
    }

    /// 解密存储的 GitHub token；未保存 token 时需要重新登录
    pub fn access_token(&self, user: &User) -> Result<String> {
        let encrypted = user.access_token_encrypted.as_deref().ok_or_else(|| {
            ContributionError::Unauthorized("GitHub 授权已失效，请重新登录".to_string())
        })?;
        Ok(self.encryptor.decrypt(encrypted)?)
    }
}
