//! 贡献查询、重试铸造与 NFT 元数据

use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{ContributionError, Result};
use crate::models::{Contribution, ContributionFilter, ContributionStats, ContributionStatus};
use crate::repository::{ContributionRepositoryTrait, RepoRepositoryTrait};

use super::Page;

/// ERC-721 元数据
#[derive(Debug, Clone, Serialize)]
pub struct NftMetadata {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    pub attributes: Vec<Value>,
}

pub struct ContributionService {
    contributions: Arc<dyn ContributionRepositoryTrait>,
    repos: Arc<dyn RepoRepositoryTrait>,
    nft_name: String,
}

impl ContributionService {
    pub fn new(
        contributions: Arc<dyn ContributionRepositoryTrait>,
        repos: Arc<dyn RepoRepositoryTrait>,
        nft_name: impl Into<String>,
    ) -> Self {
        Self {
            contributions,
            repos,
            nft_name: nft_name.into(),
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        filter: ContributionFilter,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Contribution>> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let offset = i64::from(page - 1) * i64::from(per_page);

        let items = self
            .contributions
            .list_for_user(user_id, filter, i64::from(per_page), offset)
            .await?;
        let total = self.contributions.count_for_user(user_id, filter).await?;

        Ok(Page {
            items,
            page,
            per_page,
            total,
        })
    }

    /// 其他用户的贡献同样返回不存在
    pub async fn get(&self, user_id: i64, id: i64) -> Result<Contribution> {
        self.contributions
            .find_for_user(user_id, id)
            .await?
            .ok_or(ContributionError::ContributionNotFound(id))
    }

    pub async fn stats(&self, user_id: i64) -> Result<ContributionStats> {
        self.contributions.stats_for_user(user_id).await
    }

    /// failed -> pending，尝试次数耗尽时拒绝
    ///
    /// 留有 tx_hash 的记录交易可能已上链，重试会重复铸造，同样拒绝。
    #[instrument(skip(self))]
    pub async fn retry_mint(&self, user_id: i64, id: i64, max_attempts: i32) -> Result<Contribution> {
        let current = self.get(user_id, id).await?;
        if current.status != ContributionStatus::Failed
            || current.mint_attempts >= max_attempts
            || current.tx_hash.is_some()
        {
            return Err(ContributionError::InvalidStatusTransition {
                id,
                status: current.status,
            });
        }

        // 并发修改时以数据库结果为准
        let requeued = self
            .contributions
            .requeue_failed(user_id, id, max_attempts)
            .await?
            .ok_or(ContributionError::InvalidStatusTransition {
                id,
                status: current.status,
            })?;
        info!(contribution_id = id, attempts = requeued.mint_attempts, "重新排队铸造");
        Ok(requeued)
    }

    pub async fn metadata(&self, id: i64) -> Result<NftMetadata> {
        let contribution = self
            .contributions
            .find_by_id(id)
            .await?
            .filter(Contribution::has_token_metadata)
            .ok_or(ContributionError::ContributionNotFound(id))?;

        let repository = self
            .repos
            .find_by_id(contribution.repository_id)
            .await?
            .map(|r| r.full_name)
            .unwrap_or_else(|| format!("repository#{}", contribution.repository_id));

        let short_id: String = contribution.external_id.chars().take(12).collect();

        Ok(NftMetadata {
            name: format!("{} #{}", self.nft_name, contribution.id),
            description: format!(
                "{} {} to {}: {}",
                contribution.kind, short_id, repository, contribution.title
            ),
            external_url: contribution.url.clone(),
            attributes: vec![
                json!({ "trait_type": "Repository", "value": repository }),
                json!({ "trait_type": "Kind", "value": contribution.kind.as_str() }),
                json!({ "trait_type": "Score", "value": contribution.score, "display_type": "number" }),
                json!({ "trait_type": "Additions", "value": contribution.additions, "display_type": "number" }),
                json!({ "trait_type": "Deletions", "value": contribution.deletions, "display_type": "number" }),
                json!({ "trait_type": "Changed Files", "value": contribution.changed_files, "display_type": "number" }),
                json!({ "trait_type": "Contributed At", "value": contribution.occurred_at.timestamp(), "display_type": "date" }),
            ],
        })
    }
}
