//! 仓库追踪服务

use lightcommit_shared::cache::{Cache, CacheKey};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::error::{ContributionError, Result};
use crate::github::{GitHubApi, GitHubRepo};
use crate::models::{NewRepository, Repository, User};
use crate::repository::RepoRepositoryTrait;

use super::UserService;

const REPOS_CACHE_TTL: Duration = Duration::from_secs(60);

/// GitHub 仓库 + 本地追踪状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubRepoView {
    #[serde(flatten)]
    pub repo: GitHubRepo,
    pub tracked: bool,
    /// 已追踪时对应的本地仓库 id
    pub repository_id: Option<i64>,
}

pub struct RepositoryService {
    repos: Arc<dyn RepoRepositoryTrait>,
    github: Arc<dyn GitHubApi>,
    users: Arc<UserService>,
    cache: Option<Cache>,
}

impl RepositoryService {
    pub fn new(
        repos: Arc<dyn RepoRepositoryTrait>,
        github: Arc<dyn GitHubApi>,
        users: Arc<UserService>,
    ) -> Self {
        Self {
            repos,
            github,
            users,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Cache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 缓存只保存 GitHub 原始列表，tracked 标记每次从数据库计算
    async fn fetch_github_repos(
        &self,
        user: &User,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRepo>> {
        let key = CacheKey::github_repos(user.id, page, per_page);

        if let Some(cache) = &self.cache {
            match cache.get::<Vec<GitHubRepo>>(&key).await {
                Ok(Some(repos)) => return Ok(repos),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "读取仓库列表缓存失败"),
            }
        }

        let token = self.users.access_token(user)?;
        let repos = self.github.list_user_repos(&token, page, per_page).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &repos, REPOS_CACHE_TTL).await {
                warn!(error = %e, "写入仓库列表缓存失败");
            }
        }
        Ok(repos)
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn list_github_repos(
        &self,
        user: &User,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GitHubRepoView>> {
        let repos = self.fetch_github_repos(user, page, per_page).await?;
        let tracked: HashMap<i64, i64> = self
            .repos
            .list_tracked_by_user(user.id)
            .await?
            .into_iter()
            .map(|r| (r.github_id, r.id))
            .collect();

        Ok(repos
            .into_iter()
            .map(|repo| {
                let repository_id = tracked.get(&repo.id).copied();
                GitHubRepoView {
                    repo,
                    tracked: repository_id.is_some(),
                    repository_id,
                }
            })
            .collect())
    }

    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn track(&self, user: &User, full_name: &str) -> Result<Repository> {
        let full_name = validate_full_name(full_name)?;
        let token = self.users.access_token(user)?;

        let repo = match self.github.get_repo(&token, full_name).await {
            Ok(repo) => repo,
            Err(ContributionError::GitHub { status: 404, .. }) => {
                return Err(ContributionError::RepositoryNotFound(full_name.to_string()));
            }
            Err(e) => return Err(e),
        };

        let new_repo = NewRepository {
            github_id: repo.id,
            owner: repo.owner.login,
            name: repo.name,
            full_name: repo.full_name,
            is_private: repo.private,
            default_branch: repo.default_branch,
            html_url: repo.html_url,
        };
        let tracked = self.repos.upsert_tracked(&new_repo, user.id).await?;
        info!(repository_id = tracked.id, full_name = %tracked.full_name, "开始追踪仓库");
        Ok(tracked)
    }

    /// 只有追踪人可以取消追踪，其他情况一律视为不存在
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn untrack(&self, user: &User, id: i64) -> Result<()> {
        let repo = self
            .repos
            .find_by_id(id)
            .await?
            .filter(|r| r.is_tracked() && r.tracked_by == Some(user.id))
            .ok_or_else(|| ContributionError::RepositoryNotFound(id.to_string()))?;

        self.repos.set_tracking(repo.id, false).await?;
        info!(repository_id = repo.id, "已取消追踪仓库");
        Ok(())
    }

    pub async fn list_tracked(&self, user: &User) -> Result<Vec<Repository>> {
        self.repos.list_tracked_by_user(user.id).await
    }
}

fn validate_full_name(full_name: &str) -> Result<&str> {
    let full_name = full_name.trim();
    let valid = full_name
        .split_once('/')
        .is_some_and(|(owner, name)| !owner.is_empty() && !name.is_empty() && !name.contains('/'));
    if valid {
        Ok(full_name)
    } else {
        Err(ContributionError::Validation(format!(
            "仓库名应为 owner/name 格式: {full_name}"
        )))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::github::{GitHubOwner, MockGitHubApi};
    use crate::repository::{MockRepoRepositoryTrait, MockUserRepositoryTrait};
    use crate::service::user::tests::test_user;
    use chrono::Utc;
    use lightcommit_shared::crypto::FieldEncryptor;
    use mockall::predicate::*;

    pub(crate) fn github_repo(id: i64, full_name: &str) -> GitHubRepo {
        let (owner, name) = full_name.split_once('/').unwrap();
        GitHubRepo {
            id,
            name: name.to_string(),
            full_name: full_name.to_string(),
            owner: GitHubOwner {
                login: owner.to_string(),
            },
            private: false,
            html_url: format!("https://github.com/{full_name}"),
            description: None,
            default_branch: Some("main".to_string()),
            language: Some("Rust".to_string()),
            stargazers_count: 3,
            updated_at: None,
        }
    }

    pub(crate) fn tracked_repo(id: i64, github_id: i64, tracked_by: Option<i64>) -> Repository {
        Repository {
            id,
            github_id,
            owner: "octocat".to_string(),
            name: "hello-world".to_string(),
            full_name: "octocat/hello-world".to_string(),
            is_private: false,
            default_branch: Some("main".to_string()),
            html_url: "https://github.com/octocat/hello-world".to_string(),
            tracked_by,
            tracking_enabled: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn user_service() -> Arc<UserService> {
        Arc::new(UserService::new(
            Arc::new(MockUserRepositoryTrait::new()),
            FieldEncryptor::passthrough(),
        ))
    }

    #[tokio::test]
    async fn test_list_github_repos_marks_tracked() {
        let mut github = MockGitHubApi::new();
        github
            .expect_list_user_repos()
            .with(eq("gho_plain"), eq(1), eq(30))
            .times(1)
            .returning(|_, _, _| {
                Ok(vec![
                    github_repo(1296269, "octocat/hello-world"),
                    github_repo(7, "octocat/spoon-knife"),
                ])
            });

        let mut repos = MockRepoRepositoryTrait::new();
        repos
            .expect_list_tracked_by_user()
            .with(eq(1))
            .returning(|_| Ok(vec![tracked_repo(10, 1296269, Some(1))]));

        let service = RepositoryService::new(Arc::new(repos), Arc::new(github), user_service());
        let views = service
            .list_github_repos(&test_user(1, "octocat"), 1, 30)
            .await
            .unwrap();

        assert_eq!(views.len(), 2);
        assert!(views[0].tracked);
        assert_eq!(views[0].repository_id, Some(10));
        assert!(!views[1].tracked);
    }

    #[tokio::test]
    async fn test_track_maps_github_404() {
        let mut github = MockGitHubApi::new();
        github.expect_get_repo().returning(|_, _| {
            Err(ContributionError::GitHub {
                status: 404,
                message: "Not Found".into(),
            })
        });

        let service = RepositoryService::new(
            Arc::new(MockRepoRepositoryTrait::new()),
            Arc::new(github),
            user_service(),
        );
        let err = service
            .track(&test_user(1, "octocat"), "octocat/missing")
            .await
            .unwrap_err();
        assert!(matches!(err, ContributionError::RepositoryNotFound(name) if name == "octocat/missing"));
    }

    #[tokio::test]
    async fn test_track_upserts_repository() {
        let mut github = MockGitHubApi::new();
        github
            .expect_get_repo()
            .with(eq("gho_plain"), eq("octocat/hello-world"))
            .returning(|_, name| Ok(github_repo(1296269, name)));

        let mut repos = MockRepoRepositoryTrait::new();
        repos
            .expect_upsert_tracked()
            .withf(|repo, user_id| repo.github_id == 1296269 && repo.owner == "octocat" && *user_id == 1)
            .times(1)
            .returning(|repo, user_id| Ok(tracked_repo(10, repo.github_id, Some(user_id))));

        let service = RepositoryService::new(Arc::new(repos), Arc::new(github), user_service());
        let repo = service
            .track(&test_user(1, "octocat"), " octocat/hello-world ")
            .await
            .unwrap();
        assert!(repo.is_tracked());
    }

    #[tokio::test]
    async fn test_track_rejects_bad_name() {
        let service = RepositoryService::new(
            Arc::new(MockRepoRepositoryTrait::new()),
            Arc::new(MockGitHubApi::new()),
            user_service(),
        );
        for name in ["hello-world", "/hello", "octocat/", "a/b/c"] {
            let err = service.track(&test_user(1, "octocat"), name).await.unwrap_err();
            assert!(matches!(err, ContributionError::Validation(_)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_untrack_requires_tracker() {
        let mut repos = MockRepoRepositoryTrait::new();
        repos
            .expect_find_by_id()
            .with(eq(10))
            .returning(|id| Ok(Some(tracked_repo(id, 1296269, Some(2)))));
        repos.expect_set_tracking().never();

        let service = RepositoryService::new(
            Arc::new(repos),
            Arc::new(MockGitHubApi::new()),
            user_service(),
        );
        let err = service.untrack(&test_user(1, "octocat"), 10).await.unwrap_err();
        assert!(matches!(err, ContributionError::RepositoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_untrack_disables_tracking() {
        let mut repos = MockRepoRepositoryTrait::new();
        repos
            .expect_find_by_id()
            .returning(|id| Ok(Some(tracked_repo(id, 1296269, Some(1)))));
        repos
            .expect_set_tracking()
            .with(eq(10), eq(false))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = RepositoryService::new(
            Arc::new(repos),
            Arc::new(MockGitHubApi::new()),
            user_service(),
        );
        service.untrack(&test_user(1, "octocat"), 10).await.unwrap();
    }
}
