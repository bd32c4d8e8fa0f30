//! 共享库
//!
//! 包含 LightCommit 各服务共用的配置、错误处理、数据库连接、缓存、字段加密、
//! 重试与可观测性等基础设施代码。

pub mod cache;
pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
