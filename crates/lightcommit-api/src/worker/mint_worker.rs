//! 铸造 Worker
//!
//! 每轮先回收未提交交易的中断记录，再按回执对账已提交的记录，最后执行一个铸造批次。
//! 认领使用 `FOR UPDATE SKIP LOCKED`，多实例同时运行也不会重复铸造。

use contribution::MintService;
use lightcommit_shared::observability::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

pub struct MintWorker {
    service: Arc<MintService>,
    poll_interval: Duration,
    stale_after: Duration,
    batch_size: i64,
}

impl MintWorker {
    pub fn new(
        service: Arc<MintService>,
        poll_interval: Duration,
        stale_after: Duration,
        batch_size: i64,
    ) -> Self {
        Self {
            service,
            poll_interval,
            stale_after,
            batch_size,
        }
    }

    /// 单轮：回收 + 对账 + 一个批次
    pub async fn tick(&self) {
        if let Err(e) = self.service.recover_stale(self.stale_after).await {
            error!(error = %e, "回收中断铸造记录失败");
        }

        if let Err(e) = self
            .service
            .reconcile_unconfirmed(self.stale_after, self.batch_size)
            .await
        {
            error!(error = %e, "铸造对账失败");
        }

        match self.service.run_batch(self.batch_size).await {
            Ok(report) if report.claimed > 0 => info!(
                claimed = report.claimed,
                completed = report.completed,
                failed = report.failed,
                unconfirmed = report.unconfirmed,
                "铸造批次完成"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "铸造批次失败"),
        }

        metrics::set_worker_last_run("mint_worker");
    }

    /// 主循环，shutdown 变为 true 时退出
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval = ?self.poll_interval,
            batch_size = self.batch_size,
            "MintWorker 已启动"
        );

        loop {
            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("MintWorker 已停止");
    }
}
