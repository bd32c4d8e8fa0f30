//! 贡献查询、重试与定时铸造

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, header::AUTHORIZATION},
};
use contribution::models::{Contribution, ContributionStats};
use contribution::service::MintBatchReport;
use tracing::info;

use crate::dto::{ApiResponse, ContributionQuery, MintReadyRequest, Pagination};
use crate::error::{ApiError, Result};
use crate::middleware::{CurrentUser, verify_cron_secret};
use crate::state::AppState;

/// GET /api/contributions
pub async fn list(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<ContributionQuery>,
) -> Result<Json<ApiResponse<Vec<Contribution>>>> {
    let page = state
        .contributions
        .list(current.id, query.filter(), query.page(), query.per_page())
        .await?;

    let pagination = Pagination::from_page(&page);
    Ok(Json(ApiResponse::paged(page.items, pagination)))
}

/// GET /api/contributions/stats
pub async fn stats(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ContributionStats>>> {
    let stats = state.contributions.stats(current.id).await?;
    Ok(Json(ApiResponse::new(stats)))
}

/// GET /api/contributions/{id}
pub async fn get(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Contribution>>> {
    let contribution = state.contributions.get(current.id, id).await?;
    Ok(Json(ApiResponse::new(contribution)))
}

/// POST /api/contributions/{id}/retry
pub async fn retry(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Contribution>>> {
    let contribution = state
        .contributions
        .retry_mint(current.id, id, state.config.mint.max_attempts)
        .await?;
    Ok(Json(ApiResponse::new(contribution)))
}

/// POST /api/contributions/mint-ready
///
/// 外部定时器以 `Bearer <mint.cron_secret>` 调用，请求体可省略
pub async fn mint_ready(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<MintBatchReport>>> {
    let mint = state
        .mint
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("未启用链上铸造".to_string()))?;

    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);
    verify_cron_secret(state.config.mint.cron_secret(), provided)?;

    let req: MintReadyRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MintReadyRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::Validation(e.to_string()))?
    };

    let limit = req.limit.unwrap_or(state.config.mint.batch_size);
    let report = mint.run_batch(limit).await?;
    info!(
        claimed = report.claimed,
        completed = report.completed,
        failed = report.failed,
        unconfirmed = report.unconfirmed,
        "mint-ready 执行完成"
    );
    Ok(Json(ApiResponse::new(report)))
}
