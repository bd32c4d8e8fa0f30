//! 服务层
//!
//! 协调仓储、GitHub 与链上客户端实现业务逻辑。
//!
//! ## 模块结构
//!
//! - `user`: OAuth 登录与钱包绑定
//! - `repository`: 仓库追踪
//! - `ingest`: webhook 事件入库与评分
//! - `contribution`: 贡献查询、重试与 NFT 元数据
//! - `mint`: 批量铸造与中断回收

pub mod contribution;
pub mod ingest;
pub mod mint;
pub mod repository;
pub mod user;

use serde::Serialize;

pub use contribution::{ContributionService, NftMetadata};
pub use ingest::{IngestReport, IngestService, RecordedItem, SkipReason, SkippedItem};
pub use mint::{INTERRUPTED_REASON, MintBatchReport, MintItemResult, MintService};
pub use repository::{GitHubRepoView, RepositoryService};
pub use user::UserService;

/// 分页结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        if self.per_page == 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        (self.total + per_page - 1) / per_page
    }

    pub fn has_more(&self) -> bool {
        i64::from(self.page) < self.total_pages()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page: u32, per_page: u32, total: i64) -> Page<()> {
        Page {
            items: vec![],
            page,
            per_page,
            total,
        }
    }

    #[test]
    fn test_page_math() {
        assert_eq!(page(1, 20, 0).total_pages(), 0);
        assert_eq!(page(1, 20, 20).total_pages(), 1);
        assert_eq!(page(1, 20, 21).total_pages(), 2);
        assert!(page(1, 20, 21).has_more());
        assert!(!page(2, 20, 21).has_more());
    }
}
