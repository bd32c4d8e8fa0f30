//! GitHub OAuth 登录、登出与当前用户

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use contribution::github::authorize_url;
use contribution::models::{GithubProfile, User};
use tracing::{info, warn};

use crate::auth::{clear_session_cookie, generate_state, sanitize_redirect, session_cookie};
use crate::dto::{ApiResponse, AuthStartQuery, OAuthCallbackQuery};
use crate::error::{ApiError, Result};
use crate::middleware::CurrentUser;
use crate::state::AppState;

/// 302 跳转
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

fn login_error(state: &AppState, code: &str) -> Response {
    let base = state.config.frontend_url.trim_end_matches('/');
    found(&format!("{base}/login?error={code}"))
}

/// GET /api/auth/github
pub async fn github_login(
    State(state): State<AppState>,
    Query(query): Query<AuthStartQuery>,
) -> Result<Response> {
    if !state.config.github.oauth_configured() {
        return Err(ApiError::Unavailable("未配置 GitHub OAuth".to_string()));
    }

    let oauth_state = generate_state();
    let redirect = sanitize_redirect(query.redirect.as_deref());
    state.oauth_states.save(&oauth_state, &redirect).await?;

    let url = authorize_url(&state.config.github, &oauth_state)?;
    Ok(found(&url))
}

/// GET /api/auth/github/callback
///
/// 任何失败都跳回前端登录页并附带错误码
pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<OAuthCallbackQuery>,
) -> Response {
    if let Some(error) = query.error.as_deref() {
        warn!(error, "GitHub 授权被拒绝");
        return login_error(&state, "access_denied");
    }
    let (Some(code), Some(oauth_state)) = (query.code.as_deref(), query.state.as_deref()) else {
        return login_error(&state, "missing_code");
    };

    let redirect = match state.oauth_states.consume(oauth_state).await {
        Ok(Some(redirect)) => redirect,
        Ok(None) => return login_error(&state, "invalid_state"),
        Err(e) => {
            warn!(error = %e, "读取 OAuth state 失败");
            return login_error(&state, "state_unavailable");
        }
    };

    let user = match complete_sign_in(&state, code).await {
        Ok(user) => user,
        Err((reason, e)) => {
            warn!(error = %e, reason, "GitHub 登录失败");
            return login_error(&state, reason);
        }
    };

    let token = match state.jwt.generate_token(user.id, &user.login) {
        Ok((token, _)) => token,
        Err(e) => {
            warn!(error = %e, "会话生成失败");
            return login_error(&state, "session_failed");
        }
    };

    info!(user_id = user.id, login = %user.login, "用户登录成功");
    let base = state.config.frontend_url.trim_end_matches('/');
    let jar = jar.add(session_cookie(&state.jwt, token));
    (jar, found(&format!("{base}{redirect}"))).into_response()
}

async fn complete_sign_in(
    state: &AppState,
    code: &str,
) -> std::result::Result<User, (&'static str, contribution::ContributionError)> {
    let access_token = state
        .github
        .exchange_code(code)
        .await
        .map_err(|e| ("oauth_exchange_failed", e))?;
    let github_user = state
        .github
        .get_authenticated_user(&access_token)
        .await
        .map_err(|e| ("github_user_failed", e))?;

    state
        .users
        .sign_in_with_github(&GithubProfile::from(github_user), &access_token)
        .await
        .map_err(|e| ("sign_in_failed", e))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
    (
        jar.add(clear_session_cookie(&state.jwt)),
        StatusCode::NO_CONTENT,
    )
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<User>>> {
    let user = state.users.get(current.id).await?;
    Ok(Json(ApiResponse::new(user)))
}
