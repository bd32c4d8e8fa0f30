//! 贡献服务错误类型
//!
//! 业务错误与系统错误分开归类，API 层据此映射 HTTP 状态码。

use lightcommit_shared::crypto::CryptoError;
use lightcommit_shared::error::InfraError;
use thiserror::Error;

use crate::models::ContributionStatus;

#[derive(Debug, Error)]
pub enum ContributionError {
    // === 资源不存在 ===
    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    #[error("仓库不存在: {0}")]
    RepositoryNotFound(String),

    #[error("贡献记录不存在: {0}")]
    ContributionNotFound(i64),

    // === 状态/参数错误 ===
    #[error("仓库未被追踪: {0}")]
    RepositoryNotTracked(String),

    #[error("贡献状态不允许此操作: id={id}, status={status}")]
    InvalidStatusTransition { id: i64, status: ContributionStatus },

    #[error("钱包地址格式无效: {0}")]
    InvalidWalletAddress(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === Webhook ===
    #[error("缺少 webhook 签名")]
    MissingSignature,

    #[error("webhook 签名校验失败")]
    InvalidSignature,

    #[error("webhook 负载格式错误: {0}")]
    MalformedPayload(String),

    #[error("未授权: {0}")]
    Unauthorized(String),

    // === 外部服务 ===
    #[error("GitHub API 错误: status={status}, {message}")]
    GitHub { status: u16, message: String },

    #[error("HTTP 请求失败: {0}")]
    Http(String),

    #[error("链上调用失败: {0}")]
    Chain(String),

    #[error("等待交易回执超时: tx={0}")]
    MintTimeout(String),

    /// 交易已打包但执行回滚，链上没有铸造
    #[error("铸造交易回滚: tx={0}")]
    MintReverted(String),

    // === 系统错误 ===
    #[error("加解密失败: {0}")]
    Crypto(#[from] CryptoError),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Infra(#[from] InfraError),

    #[error("内部错误: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ContributionError>;

impl ContributionError {
    /// 瞬时故障，可退避重试
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Database(_) => true,
            Self::GitHub { status, .. } => *status >= 500 || *status == 429,
            Self::Infra(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// 上游（GitHub / 链节点）故障
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::GitHub { .. }
                | Self::Http(_)
                | Self::Chain(_)
                | Self::MintTimeout(_)
                | Self::MintReverted(_)
        )
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RepositoryNotFound(_) => "REPOSITORY_NOT_FOUND",
            Self::ContributionNotFound(_) => "CONTRIBUTION_NOT_FOUND",
            Self::RepositoryNotTracked(_) => "REPOSITORY_NOT_TRACKED",
            Self::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            Self::InvalidWalletAddress(_) => "INVALID_WALLET_ADDRESS",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MalformedPayload(_) => "MALFORMED_PAYLOAD",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::GitHub { .. } => "GITHUB_ERROR",
            Self::Http(_) => "UPSTREAM_UNAVAILABLE",
            Self::Chain(_) => "CHAIN_ERROR",
            Self::MintTimeout(_) => "MINT_TIMEOUT",
            Self::MintReverted(_) => "MINT_REVERTED",
            Self::Crypto(_) => "CRYPTO_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Infra(_) => "INFRA_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<reqwest::Error> for ContributionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}
