//! GitHub webhook 事件负载
//!
//! 只反序列化用得到的字段，其余字段忽略。

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{ContributionError, Result};

/// login 可变且可被他人复用，识别用户以 id 为准
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookAccount {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookRepository {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub owner: WebhookAccount,
    #[serde(default)]
    pub private: bool,
    pub html_url: String,
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    /// 未关联 GitHub 账号的提交没有 username
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushCommit {
    pub id: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    /// 同一提交已在其他分支推送过时为 false
    #[serde(default = "default_true")]
    pub distinct: bool,
    pub author: CommitAuthor,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
}

impl PushCommit {
    /// 负载中的文件列表去重后的数量，拉取统计失败时作为兜底
    pub fn touched_files(&self) -> usize {
        let mut files: Vec<&str> = self
            .added
            .iter()
            .chain(&self.removed)
            .chain(&self.modified)
            .map(String::as_str)
            .collect();
        files.sort_unstable();
        files.dedup();
        files.len()
    }

    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or("").trim()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub repository: WebhookRepository,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: i64,
    pub title: String,
    pub html_url: String,
    pub user: WebhookAccount,
    #[serde(default)]
    pub merged: bool,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub additions: i32,
    #[serde(default)]
    pub deletions: i32,
    #[serde(default)]
    pub changed_files: i32,
}

impl PullRequest {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.merged_at.or(self.closed_at).unwrap_or(self.updated_at)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: String,
    pub number: i64,
    pub pull_request: PullRequest,
    pub repository: WebhookRepository,
}

#[derive(Debug, Clone, Deserialize)]
struct PingPayload {
    zen: Option<String>,
    hook_id: Option<i64>,
}

/// 已解析的 webhook 事件
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Ping {
        zen: Option<String>,
        hook_id: Option<i64>,
    },
    Push(PushEvent),
    PullRequest(Box<PullRequestEvent>),
    Unsupported(String),
}

impl WebhookEvent {
    /// 按 `x-github-event` 头分派解析
    pub fn parse(event_name: &str, body: &[u8]) -> Result<Self> {
        let event = match event_name {
            "ping" => {
                let ping: PingPayload = from_slice(body)?;
                Self::Ping {
                    zen: ping.zen,
                    hook_id: ping.hook_id,
                }
            }
            "push" => Self::Push(from_slice(body)?),
            "pull_request" => Self::PullRequest(Box::new(from_slice(body)?)),
            other => Self::Unsupported(other.to_string()),
        };
        Ok(event)
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Ping { .. } => "ping",
            Self::Push(_) => "push",
            Self::PullRequest(_) => "pull_request",
            Self::Unsupported(name) => name,
        }
    }
}

fn from_slice<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| ContributionError::MalformedPayload(e.to_string()))
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    pub fn repository() -> Value {
        json!({
            "id": 1296269,
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "owner": { "id": 583231, "login": "octocat" },
            "private": false,
            "html_url": "https://github.com/octocat/hello-world",
            "default_branch": "main"
        })
    }

    pub fn push_payload(commits: Vec<Value>) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "ref": "refs/heads/main",
            "repository": repository(),
            "commits": commits,
        }))
        .unwrap()
    }

    pub fn commit(sha: &str, message: &str, username: Option<&str>) -> Value {
        json!({
            "id": sha,
            "message": message,
            "timestamp": "2025-03-01T10:00:00+08:00",
            "url": format!("https://github.com/octocat/hello-world/commit/{sha}"),
            "distinct": true,
            "author": { "name": "Mona", "email": "mona@example.com", "username": username },
            "added": ["src/new.rs"],
            "removed": [],
            "modified": ["src/lib.rs", "src/new.rs"]
        })
    }

    /// PR 作者的 GitHub id，与 `test_user(1, ..)` 一致
    pub const PR_AUTHOR_GITHUB_ID: i64 = 100;

    pub fn pull_request_payload(action: &str, merged: bool) -> Vec<u8> {
        let merged_at: Option<&str> = merged.then_some("2025-03-02T12:00:00Z");
        serde_json::to_vec(&json!({
            "action": action,
            "number": 42,
            "pull_request": {
                "number": 42,
                "title": "Add wallet linking endpoint",
                "html_url": "https://github.com/octocat/hello-world/pull/42",
                "user": { "id": PR_AUTHOR_GITHUB_ID, "login": "octocat" },
                "merged": merged,
                "merged_at": merged_at,
                "closed_at": "2025-03-02T12:00:00Z",
                "updated_at": "2025-03-02T12:00:00Z",
                "additions": 150,
                "deletions": 30,
                "changed_files": 6
            },
            "repository": repository(),
        }))
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_parse_ping() {
        let body = br#"{"zen":"Keep it logically awesome.","hook_id":7}"#;
        match WebhookEvent::parse("ping", body).unwrap() {
            WebhookEvent::Ping { zen, hook_id } => {
                assert_eq!(zen.as_deref(), Some("Keep it logically awesome."));
                assert_eq!(hook_id, Some(7));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_parse_push() {
        let body = push_payload(vec![commit("abc123", "Add feature\n\nDetails", Some("octocat"))]);
        let WebhookEvent::Push(push) = WebhookEvent::parse("push", &body).unwrap() else {
            panic!("expected push");
        };

        assert_eq!(push.repository.full_name, "octocat/hello-world");
        assert_eq!(push.commits.len(), 1);

        let commit = &push.commits[0];
        assert_eq!(commit.title(), "Add feature");
        assert_eq!(commit.author.username.as_deref(), Some("octocat"));
        assert_eq!(commit.touched_files(), 2);
        assert_eq!(commit.timestamp.to_rfc3339(), "2025-03-01T02:00:00+00:00");
    }

    #[test]
    fn test_parse_pull_request() {
        let body = pull_request_payload("closed", true);
        let WebhookEvent::PullRequest(event) = WebhookEvent::parse("pull_request", &body).unwrap()
        else {
            panic!("expected pull_request");
        };

        assert_eq!(event.action, "closed");
        assert_eq!(event.pull_request.user.id, PR_AUTHOR_GITHUB_ID);
        assert!(event.pull_request.merged);
        assert_eq!(event.pull_request.changed_files, 6);
        assert_eq!(
            event.pull_request.occurred_at().to_rfc3339(),
            "2025-03-02T12:00:00+00:00"
        );
    }

    #[test]
    fn test_unsupported_and_malformed() {
        assert!(matches!(
            WebhookEvent::parse("issues", b"{}").unwrap(),
            WebhookEvent::Unsupported(name) if name == "issues"
        ));
        assert!(matches!(
            WebhookEvent::parse("push", b"not json"),
            Err(ContributionError::MalformedPayload(_))
        ));
        assert!(matches!(
            WebhookEvent::parse("push", br#"{"ref":"refs/heads/main"}"#),
            Err(ContributionError::MalformedPayload(_))
        ));
    }
}
