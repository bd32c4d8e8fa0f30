//! LightCommit HTTP 服务
//!
//! GitHub OAuth 登录、webhook 接收、贡献仪表盘与 NFT 元数据接口。
//!
//! ## 模块结构
//!
//! - `auth`: 会话 JWT 与 OAuth state
//! - `middleware`: 会话认证、cron 密钥、安全头
//! - `handlers`: 各路由处理器
//! - `routes`: 路由与 CORS
//! - `worker`: 后台铸造 Worker

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod worker;

pub use error::{ApiError, Result};
pub use state::AppState;

#[cfg(test)]
mod routes_tests;
