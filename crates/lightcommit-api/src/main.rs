//! LightCommit API 服务入口

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use contribution::{
    ContributionRepository, ContributionService, GitHubApi, GitHubClient, IngestService,
    MintService, NftMinter, RepoRepository, RepositoryService, RpcNftMinter, Scorer,
    UserRepository, UserService,
};
use lightcommit_api::{
    auth::{JwtManager, RedisStateStore},
    handlers::health::{ChainCheck, DatabaseCheck, DependencyCheck, RedisCheck},
    routes,
    state::AppState,
    worker::MintWorker,
};
use lightcommit_shared::{
    cache::Cache,
    config::{AppConfig, SessionConfig},
    crypto::FieldEncryptor,
    database::Database,
    observability,
};
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("lightcommit-api").context("加载配置失败")?;

    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting lightcommit-api on {}", config.server_addr());

    if config.session.jwt_secret == SessionConfig::default().jwt_secret {
        if config.is_production() {
            bail!("生产环境必须配置 session.jwt_secret");
        }
        warn!("使用默认会话密钥，请在部署前配置 session.jwt_secret");
    }

    let encryptor = FieldEncryptor::from_optional_hex(config.security.encryption_key.as_deref())
        .context("security.encryption_key 无效")?;
    if !encryptor.is_enabled() {
        if config.is_production() {
            bail!("生产环境必须配置 security.encryption_key");
        }
        warn!("未配置 encryption_key，GitHub token 将以明文保存");
    }
    if config.github.webhook_secret().is_none() {
        warn!("未配置 github.webhook_secret，webhook 接口将返回 503");
    }

    // 基础设施
    let db = Database::connect(&config.database).await?;
    let cache = Cache::new(&config.redis)?;
    let pool = db.pool().clone();

    // 仓储 -> 服务
    let user_repo = Arc::new(UserRepository::new(pool.clone()));
    let repo_repo = Arc::new(RepoRepository::new(pool.clone()));
    let contribution_repo = Arc::new(ContributionRepository::new(pool));
    let github: Arc<dyn GitHubApi> = Arc::new(GitHubClient::new(config.github.clone())?);

    let users = Arc::new(UserService::new(user_repo, encryptor));
    let repositories = Arc::new(
        RepositoryService::new(repo_repo.clone(), github.clone(), users.clone())
            .with_cache(cache.clone()),
    );
    let ingest = Arc::new(IngestService::new(
        repo_repo.clone(),
        contribution_repo.clone(),
        github.clone(),
        users.clone(),
        Scorer::new(config.scoring.eligibility_threshold),
    ));
    let contributions = Arc::new(ContributionService::new(
        contribution_repo.clone(),
        repo_repo,
        config.chain.nft_name.clone(),
    ));

    let mut dependencies: Vec<Arc<dyn DependencyCheck>> = vec![
        Arc::new(DatabaseCheck(db.clone())),
        Arc::new(RedisCheck(cache.clone())),
    ];

    let mint = if config.chain.enabled {
        let minter: Arc<dyn NftMinter> =
            Arc::new(RpcNftMinter::new(&config.chain).context("链配置无效")?);
        dependencies.push(Arc::new(ChainCheck {
            minter: minter.clone(),
            expected_chain_id: config.chain.chain_id,
        }));
        info!(rpc_url = %config.chain.rpc_url, "链上铸造已启用");
        Some(Arc::new(MintService::new(
            contribution_repo,
            minter,
            &config.chain.base_token_uri,
            config.mint.max_batch_size,
        )))
    } else {
        info!("链上铸造未启用");
        None
    };

    // 铸造 Worker
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = match (&mint, config.mint.worker_enabled) {
        (Some(service), true) => {
            let worker = MintWorker::new(
                service.clone(),
                Duration::from_secs(config.mint.poll_interval_secs.max(1)),
                Duration::from_secs(config.mint.stale_after_secs),
                config.mint.batch_size,
            );
            Some(tokio::spawn(async move { worker.run(shutdown_rx).await }))
        }
        (None, true) => {
            warn!("mint.worker_enabled 已开启但链上铸造未启用，Worker 不会启动");
            None
        }
        _ => None,
    };

    let cors = routes::cors_layer(&config.security);
    let addr = config.server_addr();
    let config = Arc::new(config);

    let state = AppState {
        jwt: JwtManager::new(config.session.clone()),
        oauth_states: Arc::new(RedisStateStore::new(cache)),
        config,
        github,
        users,
        repositories,
        ingest,
        contributions,
        mint,
        dependencies,
    };

    let app = routes::app(state).layer(cors);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "MintWorker 异常退出");
        }
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// 监听 SIGTERM 与 Ctrl+C
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
