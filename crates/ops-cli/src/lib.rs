//! LightCommit 运维工具
//!
//! 数据库检查、迁移、webhook 签名调试与单次铸造。

pub mod cli;
