//! 被追踪的 GitHub 仓库

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: i64,
    pub github_id: i64,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub is_private: bool,
    pub default_branch: Option<String>,
    pub html_url: String,
    /// 开启追踪的用户，其 token 用于拉取提交统计
    pub tracked_by: Option<i64>,
    pub tracking_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    pub fn is_tracked(&self) -> bool {
        self.tracking_enabled && self.tracked_by.is_some()
    }
}

/// upsert 追踪仓库时的写入记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewRepository {
    pub github_id: i64,
    pub owner: String,
    pub name: String,
    pub full_name: String,
    pub is_private: bool,
    pub default_branch: Option<String>,
    pub html_url: String,
}
