//! 请求 DTO

use contribution::models::{ContributionFilter, ContributionStatus, Eligibility};
use serde::Deserialize;
use validator::Validate;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

fn page_or_default(page: Option<u32>) -> u32 {
    page.unwrap_or(1).max(1)
}

fn per_page_or_default(per_page: Option<u32>) -> u32 {
    per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        page_or_default(self.page)
    }

    pub fn per_page(&self) -> u32 {
        per_page_or_default(self.per_page)
    }
}

/// 贡献列表查询，query string 不支持 flatten 数值字段，分页字段单独声明
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionQuery {
    pub status: Option<ContributionStatus>,
    pub eligibility: Option<Eligibility>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ContributionQuery {
    pub fn filter(&self) -> ContributionFilter {
        ContributionFilter {
            status: self.status,
            eligibility: self.eligibility,
        }
    }

    pub fn page(&self) -> u32 {
        page_or_default(self.page)
    }

    pub fn per_page(&self) -> u32 {
        per_page_or_default(self.per_page)
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWalletRequest {
    #[validate(length(min = 1, max = 64, message = "钱包地址不能为空"))]
    pub wallet_address: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackRepositoryRequest {
    #[validate(length(min = 3, max = 200, message = "仓库名应为 owner/name"))]
    pub full_name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MintReadyRequest {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthStartQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
