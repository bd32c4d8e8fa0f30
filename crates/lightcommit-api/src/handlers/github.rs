//! GitHub webhook 与仓库追踪

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use contribution::github::{
    DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, WebhookEvent, verify_signature,
};
use contribution::models::Repository;
use contribution::service::{GitHubRepoView, IngestReport};
use lightcommit_shared::observability::metrics;
use tracing::{info, warn};
use validator::Validate;

use crate::dto::{ApiResponse, PageQuery, Pagination, TrackRepositoryRequest};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// POST /api/github/webhook
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<IngestReport>>)> {
    let event_name = header(&headers, EVENT_HEADER).unwrap_or("unknown").to_string();
    let result = handle_webhook(&state, &headers, &body).await;

    match &result {
        Ok(_) => metrics::record_webhook_event(&event_name, "accepted"),
        Err(e) => {
            warn!(
                event = %event_name,
                delivery = header(&headers, DELIVERY_HEADER).unwrap_or(""),
                code = e.error_code(),
                "webhook 被拒绝"
            );
            metrics::record_webhook_event(&event_name, "rejected");
        }
    }

    result.map(|report| (StatusCode::ACCEPTED, Json(ApiResponse::new(report))))
}

async fn handle_webhook(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Result<IngestReport> {
    let secret = state
        .config
        .github
        .webhook_secret()
        .ok_or_else(|| ApiError::Unavailable("未配置 webhook 密钥".to_string()))?;

    verify_signature(secret, body, header(headers, SIGNATURE_HEADER))?;

    let event_name = header(headers, EVENT_HEADER).ok_or(ApiError::MissingEventHeader)?;
    let event = WebhookEvent::parse(event_name, body)?;
    let report = state.ingest.handle(&event).await?;

    info!(
        event = %report.event,
        delivery = header(headers, DELIVERY_HEADER).unwrap_or(""),
        recorded = report.recorded.len(),
        skipped = report.skipped.len(),
        "webhook 已处理"
    );
    Ok(report)
}

/// GET /api/github/repos
pub async fn list_repos(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<GitHubRepoView>>>> {
    let (page, per_page) = (query.page(), query.per_page());
    let user = state.users.get(current.id).await?;
    let repos = state
        .repositories
        .list_github_repos(&user, page, per_page)
        .await?;

    let pagination = Pagination::open_ended(page, per_page, repos.len());
    Ok(Json(ApiResponse::paged(repos, pagination)))
}

/// GET /api/github/repos/tracked
pub async fn list_tracked(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<Repository>>>> {
    let user = state.users.get(current.id).await?;
    let repos = state.repositories.list_tracked(&user).await?;
    Ok(Json(ApiResponse::new(repos)))
}

/// POST /api/github/repos/track
pub async fn track(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<TrackRepositoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Repository>>)> {
    req.validate()?;
    let user = state.users.get(current.id).await?;
    let repo = state.repositories.track(&user, &req.full_name).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new(repo))))
}

/// DELETE /api/github/repos/{id}/track
pub async fn untrack(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let user = state.users.get(current.id).await?;
    state.repositories.untrack(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
