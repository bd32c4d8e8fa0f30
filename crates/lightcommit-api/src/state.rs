//! 应用状态定义

use contribution::{
    ContributionService, GitHubApi, IngestService, MintService, RepositoryService, UserService,
};
use lightcommit_shared::config::AppConfig;
use std::sync::Arc;

use crate::auth::{JwtManager, OAuthStateStore};
use crate::handlers::health::DependencyCheck;

/// Axum 共享状态，服务均以 Arc 共享
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: JwtManager,
    pub oauth_states: Arc<dyn OAuthStateStore>,
    pub github: Arc<dyn GitHubApi>,
    pub users: Arc<UserService>,
    pub repositories: Arc<RepositoryService>,
    pub ingest: Arc<IngestService>,
    pub contributions: Arc<ContributionService>,
    /// 未启用链上铸造时为 None
    pub mint: Option<Arc<MintService>>,
    /// /ready 检查的依赖
    pub dependencies: Vec<Arc<dyn DependencyCheck>>,
}
