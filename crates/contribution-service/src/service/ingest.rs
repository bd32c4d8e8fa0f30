//! Webhook 事件入库
//!
//! push 中每个 commit、closed 状态的 PR 各记录为一条贡献，
//! 以 (repository_id, kind, external_id) 去重，重复投递是幂等的。

use lightcommit_shared::observability::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::github::{CommitStats, GitHubApi, PullRequestEvent, PushCommit, PushEvent, WebhookEvent};
use crate::models::{ContributionKind, NewContribution, Repository, User};
use crate::repository::{ContributionRepositoryTrait, RepoRepositoryTrait};
use crate::scoring::{ContributionFacts, ScoreResult, Scorer};

use super::UserService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    RepositoryNotTracked,
    AuthorNotRegistered,
    Duplicate,
    NotDistinct,
    PullRequestNotClosed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub external_id: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedItem {
    pub contribution_id: i64,
    pub external_id: String,
    pub score: i32,
    pub eligible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub event: String,
    pub recorded: Vec<RecordedItem>,
    pub skipped: Vec<SkippedItem>,
}

impl IngestReport {
    fn new(event: &str) -> Self {
        Self {
            event: event.to_string(),
            ..Default::default()
        }
    }

    fn skip(&mut self, external_id: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedItem {
            external_id: external_id.into(),
            reason,
        });
    }
}

pub struct IngestService {
    repos: Arc<dyn RepoRepositoryTrait>,
    contributions: Arc<dyn ContributionRepositoryTrait>,
    github: Arc<dyn GitHubApi>,
    users: Arc<UserService>,
    scorer: Scorer,
}

impl IngestService {
    pub fn new(
        repos: Arc<dyn RepoRepositoryTrait>,
        contributions: Arc<dyn ContributionRepositoryTrait>,
        github: Arc<dyn GitHubApi>,
        users: Arc<UserService>,
        scorer: Scorer,
    ) -> Self {
        Self {
            repos,
            contributions,
            github,
            users,
            scorer,
        }
    }

    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn handle(&self, event: &WebhookEvent) -> Result<IngestReport> {
        let mut report = IngestReport::new(event.name());
        match event {
            WebhookEvent::Ping { zen, hook_id } => {
                info!(?hook_id, zen = zen.as_deref().unwrap_or(""), "收到 webhook ping");
            }
            WebhookEvent::Push(push) => self.handle_push(push, &mut report).await?,
            WebhookEvent::PullRequest(pr) => self.handle_pull_request(pr, &mut report).await?,
            WebhookEvent::Unsupported(name) => {
                debug!(event = %name, "忽略不支持的事件");
            }
        }
        Ok(report)
    }

    async fn tracked_repository(&self, github_id: i64) -> Result<Option<Repository>> {
        Ok(self
            .repos
            .find_by_github_id(github_id)
            .await?
            .filter(Repository::is_tracked))
    }

    /// 追踪人的 token；取不到时返回 None，由调用方降级
    async fn tracker_token(&self, repo: &Repository) -> Option<String> {
        let tracker_id = repo.tracked_by?;
        let token = match self.users.get(tracker_id).await {
            Ok(tracker) => self.users.access_token(&tracker),
            Err(e) => Err(e),
        };
        match token {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(repository_id = repo.id, error = %e, "无法获取追踪人 token");
                None
            }
        }
    }

    /// push 负载只带 username，只能按 login 匹配
    async fn author_by_login(&self, login: Option<&str>) -> Result<Option<User>> {
        match login.map(str::trim).filter(|l| !l.is_empty()) {
            Some(login) => self.users.find_by_login(login).await,
            None => Ok(None),
        }
    }

    async fn handle_push(&self, push: &PushEvent, report: &mut IngestReport) -> Result<()> {
        let Some(repo) = self.tracked_repository(push.repository.id).await? else {
            for commit in &push.commits {
                report.skip(&commit.id, SkipReason::RepositoryNotTracked);
            }
            return Ok(());
        };

        let token = self.tracker_token(&repo).await;

        for commit in &push.commits {
            if !commit.distinct {
                report.skip(&commit.id, SkipReason::NotDistinct);
                continue;
            }
            let Some(author) = self.author_by_login(commit.author.username.as_deref()).await?
            else {
                report.skip(&commit.id, SkipReason::AuthorNotRegistered);
                continue;
            };

            let stats = self.commit_stats(&repo, token.as_deref(), commit).await;
            let result = self.scorer.score(&ContributionFacts {
                kind: ContributionKind::Commit,
                message: &commit.message,
                author_login: &author.login,
                additions: stats.additions,
                deletions: stats.deletions,
                changed_files: stats.changed_files,
                parent_count: stats.parents,
                merged: false,
            });

            let contribution = NewContribution {
                user_id: author.id,
                repository_id: repo.id,
                kind: ContributionKind::Commit,
                external_id: commit.id.clone(),
                title: commit.title().to_string(),
                url: Some(commit.url.clone()),
                additions: stats.additions,
                deletions: stats.deletions,
                changed_files: stats.changed_files,
                score: result.score,
                score_breakdown: serde_json::to_value(result.breakdown)?,
                eligibility: result.eligibility,
                ineligible_reason: result.ineligible_reason.map(|r| r.as_str().to_string()),
                occurred_at: commit.timestamp,
            };
            self.record(contribution, &result, report).await?;
        }
        Ok(())
    }

    /// 拉取失败时用负载中的文件列表兜底，行数记 0
    async fn commit_stats(
        &self,
        repo: &Repository,
        token: Option<&str>,
        commit: &PushCommit,
    ) -> CommitStats {
        let fallback = CommitStats {
            additions: 0,
            deletions: 0,
            changed_files: i32::try_from(commit.touched_files()).unwrap_or(i32::MAX),
            parents: 1,
        };
        let Some(token) = token else {
            return fallback;
        };

        match self
            .github
            .get_commit_stats(token, &repo.full_name, &commit.id)
            .await
        {
            Ok(stats) => stats,
            Err(e) => {
                warn!(sha = %commit.id, error = %e, "拉取提交统计失败，使用负载数据");
                fallback
            }
        }
    }

    async fn handle_pull_request(
        &self,
        event: &PullRequestEvent,
        report: &mut IngestReport,
    ) -> Result<()> {
        let pr = &event.pull_request;
        let external_id = format!("pr#{}", pr.number);

        if event.action != "closed" {
            report.skip(external_id, SkipReason::PullRequestNotClosed);
            return Ok(());
        }
        let Some(repo) = self.tracked_repository(event.repository.id).await? else {
            report.skip(external_id, SkipReason::RepositoryNotTracked);
            return Ok(());
        };
        // 按 GitHub 数字 id 匹配，login 可能已改名或被他人复用
        let Some(author) = self.users.find_by_github_id(pr.user.id).await? else {
            report.skip(external_id, SkipReason::AuthorNotRegistered);
            return Ok(());
        };

        let result = self.scorer.score(&ContributionFacts {
            kind: ContributionKind::PullRequest,
            message: &pr.title,
            author_login: &author.login,
            additions: pr.additions,
            deletions: pr.deletions,
            changed_files: pr.changed_files,
            parent_count: 0,
            merged: pr.merged,
        });

        let contribution = NewContribution {
            user_id: author.id,
            repository_id: repo.id,
            kind: ContributionKind::PullRequest,
            external_id,
            title: pr.title.trim().to_string(),
            url: Some(pr.html_url.clone()),
            additions: pr.additions,
            deletions: pr.deletions,
            changed_files: pr.changed_files,
            score: result.score,
            score_breakdown: serde_json::to_value(result.breakdown)?,
            eligibility: result.eligibility,
            ineligible_reason: result.ineligible_reason.map(|r| r.as_str().to_string()),
            occurred_at: pr.occurred_at(),
        };
        self.record(contribution, &result, report).await
    }

    async fn record(
        &self,
        contribution: NewContribution,
        result: &ScoreResult,
        report: &mut IngestReport,
    ) -> Result<()> {
        match self.contributions.insert_if_absent(&contribution).await? {
            Some(saved) => {
                metrics::record_contribution_recorded(
                    saved.kind.as_str(),
                    saved.eligibility.as_str(),
                );
                info!(
                    contribution_id = saved.id,
                    external_id = %saved.external_id,
                    score = result.score,
                    eligibility = %saved.eligibility,
                    "贡献已记录"
                );
                let eligible = saved.is_eligible();
                report.recorded.push(RecordedItem {
                    contribution_id: saved.id,
                    external_id: saved.external_id,
                    score: saved.score,
                    eligible,
                });
            }
            None => report.skip(contribution.external_id, SkipReason::Duplicate),
        }
        Ok(())
    }
}
