//! 命令执行器

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use contribution::{
    ContributionRepository, DeploymentInspector, MintService, RpcNftMinter,
    github::{DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, sign_payload},
};
use lightcommit_shared::{config::AppConfig, database::Database};
use tracing::{info, warn};

/// 核心业务表
pub const REQUIRED_TABLES: [&str; 3] = ["users", "repositories", "contributions"];

pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    async fn database(&self) -> Result<Database> {
        Database::connect(&self.config.database)
            .await
            .context("连接数据库失败")
    }

    pub async fn db_check(&self) -> Result<()> {
        let db = self.database().await?;
        let version = db.server_version().await?;
        println!("数据库连接正常，PostgreSQL {version}");
        db.close().await;
        Ok(())
    }

    /// 返回全部表是否存在
    pub async fn check_tables(&self) -> Result<bool> {
        let db = self.database().await?;
        let missing = db.missing_tables(&REQUIRED_TABLES).await?;
        db.close().await;

        for table in REQUIRED_TABLES {
            let mark = if missing.iter().any(|m| m == table) { "缺失" } else { "存在" };
            println!("{table:<16} {mark}");
        }
        if !missing.is_empty() {
            warn!(missing = ?missing, "缺少数据表，请先执行 migrate");
        }
        Ok(missing.is_empty())
    }

    pub async fn migrate(&self) -> Result<()> {
        let db = self.database().await?;
        db.run_migrations().await?;
        db.close().await;
        println!("迁移已完成");
        Ok(())
    }

    pub async fn sign_webhook(
        &self,
        event: &str,
        file: &str,
        secret: Option<String>,
        url: Option<String>,
    ) -> Result<()> {
        let Some(secret) = secret.or_else(|| self.config.github.webhook_secret().map(String::from))
        else {
            bail!("未提供 --secret 且未配置 github.webhook_secret");
        };

        let body = tokio::fs::read(file)
            .await
            .with_context(|| format!("读取 payload 失败: {file}"))?;
        serde_json::from_slice::<serde_json::Value>(&body).context("payload 不是合法 JSON")?;

        let signature = sign_payload(&secret, &body);
        println!("{SIGNATURE_HEADER}: {signature}");

        let Some(url) = url else {
            return Ok(());
        };

        let delivery = uuid::Uuid::new_v4().to_string();
        info!(%url, event, %delivery, "投递 webhook");
        let response = reqwest::Client::new()
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, "GitHub-Hookshot/lightcommit-ops")
            .header(EVENT_HEADER, event)
            .header(DELIVERY_HEADER, delivery)
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .context("投递 webhook 失败")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        println!("HTTP {status}");
        println!("{text}");
        if !status.is_success() {
            bail!("webhook 被拒绝: {status}");
        }
        Ok(())
    }

    pub async fn mint_once(&self, limit: Option<i64>) -> Result<()> {
        if !self.config.chain.enabled {
            bail!("chain.enabled = false，无法铸造");
        }
        let db = self.database().await?;
        let minter = Arc::new(RpcNftMinter::new(&self.config.chain).context("链配置无效")?);
        let service = MintService::new(
            Arc::new(ContributionRepository::new(db.pool().clone())),
            minter,
            &self.config.chain.base_token_uri,
            self.config.mint.max_batch_size,
        );

        let report = service
            .run_batch(limit.unwrap_or(self.config.mint.batch_size))
            .await;
        db.close().await;

        let report = report?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    /// 返回部署是否健康
    pub async fn chain_info(&self) -> Result<bool> {
        let inspector = DeploymentInspector::new(self.config.chain.clone()).context("链配置无效")?;
        let report = inspector.report().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);

        if !report.chain_id_matches() {
            warn!(
                chain_id = report.chain_id,
                expected = ?report.expected_chain_id,
                "chain_id 与配置不一致"
            );
        }
        if !report.owner_matches() {
            warn!(
                owner = ?report.commit_nft_owner,
                expected = %report.expected_owner,
                "CommitNFT owner 与 minter_address 不一致"
            );
        }
        Ok(report.is_healthy())
    }
}
