//! Prometheus 指标
//!
//! 基于 metrics crate 记录，由 metrics-exporter-prometheus 在独立端口暴露 `/metrics`。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// 指标服务器句柄
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 安装 Prometheus recorder 并启动指标 HTTP 服务
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    describe_metrics();
    metrics::counter!("service_starts_total", "service" => config.service_name.clone())
        .increment(1);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn describe_metrics() {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    metrics::describe_counter!(
        "webhook_events_total",
        "GitHub webhook deliveries by event and outcome"
    );
    metrics::describe_counter!(
        "contributions_recorded_total",
        "Contributions recorded by kind and eligibility"
    );
    metrics::describe_counter!("mint_attempts_total", "NFT mint attempts by outcome");
    metrics::describe_histogram!("mint_duration_seconds", "NFT mint duration in seconds");
    metrics::describe_gauge!(
        "worker_last_run_timestamp",
        "Unix timestamp of the last background worker run"
    );
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    }))
}

pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录 webhook 处理结果（accepted / rejected / ignored）
#[inline]
pub fn record_webhook_event(event: &str, outcome: &str) {
    metrics::counter!(
        "webhook_events_total",
        "event" => event.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

#[inline]
pub fn record_contribution_recorded(kind: &str, eligibility: &str) {
    metrics::counter!(
        "contributions_recorded_total",
        "kind" => kind.to_string(),
        "eligibility" => eligibility.to_string()
    )
    .increment(1);
}

/// 记录一次铸造尝试（completed / failed）
#[inline]
pub fn record_mint_attempt(outcome: &str, duration_secs: f64) {
    metrics::counter!("mint_attempts_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("mint_duration_seconds").record(duration_secs);
}

#[inline]
pub fn set_worker_last_run(worker: &str) {
    metrics::gauge!("worker_last_run_timestamp", "worker" => worker.to_string())
        .set(chrono::Utc::now().timestamp() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_do_not_panic() {
        // 未安装 recorder 时为空操作
        record_http_request("GET", "/api/contributions", 200, 0.1);
        record_webhook_event("push", "accepted");
        record_contribution_recorded("commit", "eligible");
        record_mint_attempt("completed", 1.2);
        set_worker_last_run("mint");
    }
}
