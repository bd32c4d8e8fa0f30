//! Redis 缓存管理模块
//!
//! 提供 Redis 连接管理和常用缓存操作封装。

use crate::config::RedisConfig;
use crate::error::{InfraError, Result};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use serde::{Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{info, instrument};

/// Redis 缓存客户端
///
/// `Client::open` 只解析地址，不建立连接；连接在首次操作时按需获取。
#[derive(Clone)]
pub struct Cache {
    client: Client,
}

impl Cache {
    /// 创建 Redis 客户端
    pub fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        info!("Redis client created");
        Ok(Self { client })
    }

    /// 获取连接
    async fn get_conn(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(InfraError::from)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.get_conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(InfraError::from)
    }

    /// 获取值
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = conn.get(key).await?;
        value.map(|v| decode(&v)).transpose()
    }

    /// 设置值
    #[instrument(skip(self, value))]
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let mut conn = self.get_conn().await?;
        let serialized = encode(value)?;
        let _: () = conn.set_ex(key, serialized, ttl.as_secs()).await?;
        Ok(())
    }

    /// 读取并删除（GETDEL），用于一次性令牌
    #[instrument(skip(self))]
    pub async fn take<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.get_conn().await?;
        let value: Option<String> = redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        value.map(|v| decode(&v)).transpose()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| InfraError::Internal(format!("Cache serialization error: {}", e)))
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| InfraError::Internal(format!("Cache deserialization error: {}", e)))
}

/// 缓存键生成器
pub struct CacheKey;

impl CacheKey {
    /// OAuth state -> 登录完成后的跳转路径
    pub fn oauth_state(state: &str) -> String {
        format!("oauth:state:{}", state)
    }

    /// 用户 GitHub 仓库列表（按分页缓存，仅缓存 GitHub 原始数据）
    pub fn github_repos(user_id: i64, page: u32, per_page: u32) -> String {
        format!("github:repos:{}:{}:{}", user_id, page, per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_generation() {
        assert_eq!(CacheKey::oauth_state("abc"), "oauth:state:abc");
        assert_eq!(CacheKey::github_repos(7, 2, 30), "github:repos:7:2:30");
    }

    #[test]
    fn test_client_creation_is_lazy() {
        // 无可用 Redis 时也能创建客户端
        let cache = Cache::new(&RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
        });
        assert!(cache.is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result: Result<i64> = decode("not-json");
        assert!(matches!(result, Err(InfraError::Internal(_))));
    }
}
