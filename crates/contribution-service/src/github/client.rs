//! GitHub REST / OAuth 客户端

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lightcommit_shared::config::GithubConfig;
use lightcommit_shared::retry::{RetryPolicy, retry_with_policy};
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{ContributionError, Result};

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubUser {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubOwner {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: GitHubOwner,
    #[serde(default)]
    pub private: bool,
    pub html_url: String,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    pub additions: i32,
    pub deletions: i32,
    pub changed_files: i32,
    pub parents: usize,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    stats: CommitResponseStats,
    #[serde(default)]
    files: Vec<serde_json::Value>,
    #[serde(default)]
    parents: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct CommitResponseStats {
    #[serde(default)]
    additions: i32,
    #[serde(default)]
    deletions: i32,
}

/// GitHub API 抽象，服务层与测试依赖此 trait
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// OAuth code 换取 access token
    async fn exchange_code(&self, code: &str) -> Result<String>;
    /// 资料中无公开邮箱时回退到 /user/emails 的主邮箱
    async fn get_authenticated_user(&self, token: &str) -> Result<GitHubUser>;
    async fn list_user_repos(&self, token: &str, page: u32, per_page: u32)
    -> Result<Vec<GitHubRepo>>;
    async fn get_repo(&self, token: &str, full_name: &str) -> Result<GitHubRepo>;
    async fn get_commit_stats(&self, token: &str, full_name: &str, sha: &str)
    -> Result<CommitStats>;
}

/// 构建 OAuth 授权跳转地址
pub fn authorize_url(config: &GithubConfig, state: &str) -> Result<String> {
    let base = format!(
        "{}/login/oauth/authorize",
        config.oauth_base_url.trim_end_matches('/')
    );
    let scope = config.scopes.join(" ");
    let url = Url::parse_with_params(
        &base,
        &[
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
            ("allow_signup", "true"),
        ],
    )
    .map_err(|e| ContributionError::Internal(format!("invalid oauth url: {e}")))?;

    Ok(url.into())
}

pub struct GitHubClient {
    http: Client,
    config: GithubConfig,
    retry: RetryPolicy,
}

impl GitHubClient {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// 带重试的 GET，只重试 5xx/429 与传输层错误
    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.api_url(path);
        let url = url.as_str();
        retry_with_policy(
            &self.retry,
            "github.get",
            ContributionError::is_retryable,
            move || async move {
                let response = self
                    .authorized(self.http.get(url), token)
                    .query(query)
                    .send()
                    .await?;
                read_json(response).await
            },
        )
        .await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ContributionError::GitHub {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

/// 优先取 GitHub 错误体中的 message 字段
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        })
}

fn primary_verified_email(entries: Vec<EmailEntry>) -> Option<String> {
    entries
        .into_iter()
        .find(|e| e.primary && e.verified)
        .map(|e| e.email)
}

#[async_trait]
impl GitHubApi for GitHubClient {
    #[instrument(skip(self, code))]
    async fn exchange_code(&self, code: &str) -> Result<String> {
        let url = format!(
            "{}/login/oauth/access_token",
            self.config.oauth_base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(&serde_json::json!({
                "client_id": self.config.client_id,
                "client_secret": self.config.client_secret,
                "code": code,
                "redirect_uri": self.config.redirect_uri,
            }))
            .send()
            .await?;

        // 授权码无效时 GitHub 仍返回 200，错误放在 body 中
        let token: TokenResponse = read_json(response).await?;
        match (token.access_token, token.error) {
            (Some(access_token), None) if !access_token.is_empty() => Ok(access_token),
            (_, error) => Err(ContributionError::Unauthorized(
                token
                    .error_description
                    .or(error)
                    .unwrap_or_else(|| "oauth token exchange failed".to_string()),
            )),
        }
    }

    #[instrument(skip(self, token))]
    async fn get_authenticated_user(&self, token: &str) -> Result<GitHubUser> {
        let mut user: GitHubUser = self.get_json(token, "/user", &[]).await?;

        if user.email.is_none() {
            // 需要 user:email scope，失败时不影响登录
            match self
                .get_json::<Vec<EmailEntry>>(token, "/user/emails", &[])
                .await
            {
                Ok(entries) => user.email = primary_verified_email(entries),
                Err(e) => debug!(error = %e, "无法获取 GitHub 主邮箱"),
            }
        }

        Ok(user)
    }

    #[instrument(skip(self, token))]
    async fn list_user_repos(
        &self,
        token: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRepo>> {
        self.get_json(
            token,
            "/user/repos",
            &[
                ("sort", "updated".to_string()),
                ("affiliation", "owner,collaborator,organization_member".to_string()),
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self, token))]
    async fn get_repo(&self, token: &str, full_name: &str) -> Result<GitHubRepo> {
        self.get_json(token, &format!("/repos/{full_name}"), &[])
            .await
    }

    #[instrument(skip(self, token))]
    async fn get_commit_stats(&self, token: &str, full_name: &str, sha: &str) -> Result<CommitStats> {
        let commit: CommitResponse = self
            .get_json(token, &format!("/repos/{full_name}/commits/{sha}"), &[])
            .await?;

        Ok(CommitStats {
            additions: commit.stats.additions,
            deletions: commit.stats.deletions,
            changed_files: commit.files.len() as i32,
            parents: commit.parents.len(),
        })
    }
}
