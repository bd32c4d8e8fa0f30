//! OAuth state
//!
//! 每次登录生成 32 字节随机 state，存入 Redis 10 分钟，回调时一次性取出

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use lightcommit_shared::cache::{Cache, CacheKey};
use rand::RngCore;
use std::time::Duration;

use crate::error::ApiError;

pub const STATE_TTL: Duration = Duration::from_secs(600);
pub const DEFAULT_REDIRECT: &str = "/dashboard";

/// state -> 登录后跳转路径
#[async_trait]
pub trait OAuthStateStore: Send + Sync {
    async fn save(&self, state: &str, redirect: &str) -> Result<(), ApiError>;
    /// 取出即删除，重放返回 None
    async fn consume(&self, state: &str) -> Result<Option<String>, ApiError>;
}

pub struct RedisStateStore {
    cache: Cache,
}

impl RedisStateStore {
    pub fn new(cache: Cache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl OAuthStateStore for RedisStateStore {
    async fn save(&self, state: &str, redirect: &str) -> Result<(), ApiError> {
        self.cache
            .set(&CacheKey::oauth_state(state), &redirect, STATE_TTL)
            .await
            .map_err(|e| ApiError::Unavailable(format!("无法保存登录状态: {e}")))
    }

    async fn consume(&self, state: &str) -> Result<Option<String>, ApiError> {
        self.cache
            .take::<String>(&CacheKey::oauth_state(state))
            .await
            .map_err(|e| ApiError::Unavailable(format!("无法读取登录状态: {e}")))
    }
}

pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 只接受站内相对路径，防止开放重定向
pub fn sanitize_redirect(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.contains("://") =>
        {
            path.to_string()
        }
        _ => DEFAULT_REDIRECT.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// 测试用内存实现
    #[derive(Default)]
    pub(crate) struct MemoryStateStore {
        states: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl OAuthStateStore for MemoryStateStore {
        async fn save(&self, state: &str, redirect: &str) -> Result<(), ApiError> {
            self.states
                .lock()
                .await
                .insert(state.to_string(), redirect.to_string());
            Ok(())
        }

        async fn consume(&self, state: &str) -> Result<Option<String>, ApiError> {
            Ok(self.states.lock().await.remove(state))
        }
    }

    #[test]
    fn test_state_is_random_and_url_safe() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        // 32 字节 -> 43 个 base64url 字符
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_sanitize_redirect() {
        assert_eq!(sanitize_redirect(Some("/contributions?page=2")), "/contributions?page=2");
        assert_eq!(sanitize_redirect(None), DEFAULT_REDIRECT);
        assert_eq!(sanitize_redirect(Some("//evil.com")), DEFAULT_REDIRECT);
        assert_eq!(sanitize_redirect(Some("https://evil.com")), DEFAULT_REDIRECT);
        assert_eq!(sanitize_redirect(Some("/\\evil.com")), DEFAULT_REDIRECT);
        assert_eq!(sanitize_redirect(Some("dashboard")), DEFAULT_REDIRECT);
    }

    #[tokio::test]
    async fn test_memory_store_is_single_use() {
        let store = MemoryStateStore::default();
        store.save("s1", "/dashboard").await.unwrap();
        assert_eq!(store.consume("s1").await.unwrap().as_deref(), Some("/dashboard"));
        assert_eq!(store.consume("s1").await.unwrap(), None);
    }
}
