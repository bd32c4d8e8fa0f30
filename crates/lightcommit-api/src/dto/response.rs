//! 响应信封 `{ data, pagination? }`

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<i64>,
    pub has_more: bool,
}

impl Pagination {
    pub fn from_page<T>(page: &contribution::Page<T>) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            total: Some(page.total),
            total_pages: Some(page.total_pages()),
            has_more: page.has_more(),
        }
    }

    /// 总数未知时，满页即认为还有下一页
    pub fn open_ended(page: u32, per_page: u32, returned: usize) -> Self {
        Self {
            page,
            per_page,
            total: None,
            total_pages: None,
            has_more: returned >= per_page as usize,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    pub fn paged(data: T, pagination: Pagination) -> Self {
        Self {
            data,
            pagination: Some(pagination),
        }
    }
}
