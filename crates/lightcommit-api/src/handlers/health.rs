//! 存活与就绪探针

use async_trait::async_trait;
use axum::{Json, extract::State, http::StatusCode};
use contribution::NftMinter;
use lightcommit_shared::{cache::Cache, database::Database};
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::state::AppState;

/// 就绪探针检查的外部依赖
#[async_trait]
pub trait DependencyCheck: Send + Sync {
    fn name(&self) -> &'static str;
    async fn is_ready(&self) -> bool;
}

pub struct DatabaseCheck(pub Database);

#[async_trait]
impl DependencyCheck for DatabaseCheck {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn is_ready(&self) -> bool {
        self.0.health_check().await.is_ok()
    }
}

pub struct RedisCheck(pub Cache);

#[async_trait]
impl DependencyCheck for RedisCheck {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn is_ready(&self) -> bool {
        self.0.health_check().await.is_ok()
    }
}

/// 链节点可达且链 ID 与配置一致
pub struct ChainCheck {
    pub minter: Arc<dyn NftMinter>,
    pub expected_chain_id: Option<u64>,
}

#[async_trait]
impl DependencyCheck for ChainCheck {
    fn name(&self) -> &'static str {
        "chain"
    }

    async fn is_ready(&self) -> bool {
        match self.minter.chain_id().await {
            Ok(id) => self.expected_chain_id.is_none_or(|expected| expected == id),
            Err(_) => false,
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
    }))
}

/// GET /ready
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let mut checks = Map::new();
    let mut all_ok = true;

    for dependency in &state.dependencies {
        let ok = dependency.is_ready().await;
        all_ok &= ok;
        checks.insert(
            dependency.name().to_string(),
            Value::from(if ok { "ok" } else { "fail" }),
        );
    }

    let (status, label) = if all_ok {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": state.config.service_name,
            "checks": checks,
        })),
    )
}
