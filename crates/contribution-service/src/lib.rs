//! 贡献服务
//!
//! 把 GitHub 活动（commit、PR）记录为可评分的贡献，并为合格贡献铸造 CommitNFT。
//!
//! ## 核心功能
//!
//! - **Webhook 入库**：校验签名、解析 push / pull_request 事件并去重写入
//! - **评分**：按变更规模、文件数、提交信息计算分数并判定铸造资格
//! - **批量铸造**：原子认领待铸造记录，逐条调用合约 `safeMint`
//! - **部署检查**：核对链 ID、合约代码与 CommitNFT 所有权
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `scoring`: 评分与资格判定
//! - `repository`: 数据库仓储层
//! - `github`: GitHub OAuth / REST / webhook
//! - `chain`: JSON-RPC 与 CommitNFT 铸造
//! - `service`: 业务服务层

pub mod chain;
pub mod error;
pub mod github;
pub mod models;
pub mod repository;
pub mod scoring;
pub mod service;

pub use chain::{DeploymentInspector, DeploymentReport, NftMinter, RpcNftMinter};
pub use error::{ContributionError, Result};
pub use github::{GitHubApi, GitHubClient, WebhookEvent};
pub use models::*;
pub use repository::{ContributionRepository, RepoRepository, UserRepository};
pub use scoring::{ScoreResult, Scorer};
pub use service::{
    ContributionService, IngestReport, IngestService, MintBatchReport, MintService, Page,
    RepositoryService, UserService,
};
