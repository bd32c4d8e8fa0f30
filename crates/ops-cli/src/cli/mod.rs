//! CLI 模块
//!
//! # 使用示例
//!
//! ```bash
//! # 检查数据库连接与表结构
//! lightcommit-ops db-check
//! lightcommit-ops check-tables
//!
//! # 对本地 payload 签名并投递
//! lightcommit-ops sign-webhook -e push -f push.json --url http://localhost:8080/api/github/webhook
//!
//! # 手动触发一批铸造
//! lightcommit-ops mint-once --limit 5
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::CommandRunner;
