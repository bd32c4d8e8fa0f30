//! 会话认证中间件
//!
//! 依次从 `Authorization: Bearer` 与会话 cookie 读取 token，
//! 校验通过后把 [`CurrentUser`] 注入请求扩展

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::ApiError;
use crate::state::AppState;

/// 已认证用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub login: String,
}

pub(crate) fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match bearer_token(&request) {
        Some(token) => Some(token.to_string()),
        None => CookieJar::from_headers(request.headers())
            .get(state.jwt.cookie_name())
            .map(|c| c.value().to_string()),
    };

    let Some(token) = token else {
        return ApiError::Unauthorized("请先登录".to_string()).into_response();
    };

    let current = state
        .jwt
        .verify_token(&token)
        .and_then(|claims| {
            Ok(CurrentUser {
                id: claims.user_id()?,
                login: claims.login,
            })
        });

    match current {
        Ok(current) => {
            request.extensions_mut().insert(current);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}
