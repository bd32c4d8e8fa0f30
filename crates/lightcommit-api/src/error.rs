//! API 错误类型定义
//!
//! 所有 handler 的错误在此统一映射为 HTTP 状态码与错误信封

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use contribution::ContributionError;
use serde_json::json;

const INTERNAL_MESSAGE: &str = "服务内部错误，请稍后重试";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error("缺少 x-github-event 请求头")]
    MissingEventHeader,

    #[error("服务不可用: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Domain(#[from] ContributionError),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) | Self::MissingEventHeader => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Domain(err) => domain_status(err),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingEventHeader => "MISSING_EVENT_HEADER",
            Self::Unavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Domain(err) => err.error_code(),
        }
    }
}

fn domain_status(err: &ContributionError) -> StatusCode {
    use ContributionError as E;

    match err {
        E::UserNotFound(_) | E::RepositoryNotFound(_) | E::ContributionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        E::InvalidStatusTransition { .. } | E::RepositoryNotTracked(_) => StatusCode::CONFLICT,
        E::InvalidWalletAddress(_) | E::Validation(_) | E::MalformedPayload(_) => {
            StatusCode::BAD_REQUEST
        }
        E::MissingSignature | E::InvalidSignature | E::Unauthorized(_) => {
            StatusCode::UNAUTHORIZED
        }
        // GitHub 的 401 表示存储的 token 已被撤销
        E::GitHub { status: 401, .. } => StatusCode::UNAUTHORIZED,
        E::GitHub { .. }
        | E::Http(_)
        | E::Chain(_)
        | E::MintTimeout(_)
        | E::MintReverted(_) => StatusCode::BAD_GATEWAY,
        E::Crypto(_) | E::Database(_) | E::Serialization(_) | E::Infra(_) | E::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 5xx 只返回通用提示，详细信息仅记录日志
        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!(error = %self, code = self.error_code(), "请求处理失败");
            if status == StatusCode::BAD_GATEWAY {
                "上游服务暂不可用，请稍后重试".to_string()
            } else {
                INTERNAL_MESSAGE.to_string()
            }
        } else {
            tracing::debug!(error = %self, "请求被拒绝");
            self.to_string()
        };

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": message,
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
