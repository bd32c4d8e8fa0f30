//! CLI 命令定义

use clap::{Parser, Subcommand};

/// LightCommit 运维命令行工具
///
/// 配置读取方式与 API 服务一致（config/*.toml 与 LIGHTCOMMIT__* 环境变量）。
#[derive(Parser, Debug)]
#[command(name = "lightcommit-ops")]
#[command(version, about = "LightCommit 运维工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 连接数据库并输出服务端版本
    DbCheck,

    /// 检查核心表是否存在，缺失时以非零状态退出
    CheckTables,

    /// 执行内嵌的数据库迁移
    Migrate,

    /// 对 payload 文件计算 webhook 签名，可选直接投递
    SignWebhook {
        /// GitHub 事件名（push、pull_request、ping）
        #[arg(short, long)]
        event: String,

        /// payload JSON 文件路径
        #[arg(short, long)]
        file: String,

        /// 签名密钥，缺省取 github.webhook_secret
        #[arg(short, long)]
        secret: Option<String>,

        /// 投递地址，例如 http://localhost:8080/api/github/webhook
        #[arg(short, long)]
        url: Option<String>,
    },

    /// 执行一批链上铸造
    MintOnce {
        /// 本批数量，缺省取 mint.batch_size
        #[arg(long)]
        limit: Option<i64>,
    },

    /// 检查链与合约部署状态
    ChainInfo,
}
