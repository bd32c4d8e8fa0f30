//! HTTP 处理器

pub mod auth;
pub mod contributions;
pub mod github;
pub mod health;
pub mod nft;
pub mod users;
