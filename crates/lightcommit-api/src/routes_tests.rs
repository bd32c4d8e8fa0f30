//! 路由级测试：mockall 替换仓储、GitHub 与铸造客户端，oneshot 驱动完整 Router

use crate::auth::JwtManager;
use crate::auth::oauth::tests::MemoryStateStore;
use crate::handlers::health::DependencyCheck;
use crate::routes;
use crate::state::AppState;
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use contribution::chain::{MintReceipt, MockNftMinter};
use contribution::github::{MockGitHubApi, sign_payload};
use contribution::models::{
    Contribution, ContributionKind, ContributionStats, ContributionStatus, Eligibility,
    MintCandidate, User,
};
use contribution::repository::{
    MockContributionRepositoryTrait, MockRepoRepositoryTrait, MockUserRepositoryTrait,
};
use contribution::{
    ContributionService, IngestService, MintService, RepositoryService, Scorer, UserService,
};
use lightcommit_shared::config::AppConfig;
use lightcommit_shared::crypto::FieldEncryptor;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const WEBHOOK_SECRET: &str = "webhook-secret";
const CRON_SECRET: &str = "cron-secret";

#[derive(Default)]
struct Mocks {
    users: MockUserRepositoryTrait,
    repos: MockRepoRepositoryTrait,
    contributions: MockContributionRepositoryTrait,
    github: MockGitHubApi,
    minter: Option<MockNftMinter>,
    dependencies: Vec<Arc<dyn DependencyCheck>>,
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.frontend_url = "http://localhost:3000".to_string();
    config.github.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    config.github.client_id = "client-id".to_string();
    config.github.client_secret = "client-secret".to_string();
    config.mint.cron_secret = Some(CRON_SECRET.to_string());
    config
}

fn build_state(mocks: Mocks, config: AppConfig) -> AppState {
    let repos: Arc<MockRepoRepositoryTrait> = Arc::new(mocks.repos);
    let contributions: Arc<MockContributionRepositoryTrait> = Arc::new(mocks.contributions);
    let github: Arc<MockGitHubApi> = Arc::new(mocks.github);

    let users = Arc::new(UserService::new(
        Arc::new(mocks.users),
        FieldEncryptor::passthrough(),
    ));
    let mint = mocks.minter.map(|minter| {
        Arc::new(MintService::new(
            contributions.clone(),
            Arc::new(minter),
            &config.chain.base_token_uri,
            config.mint.max_batch_size,
        ))
    });

    AppState {
        jwt: JwtManager::new(config.session.clone()),
        oauth_states: Arc::new(MemoryStateStore::default()),
        github: github.clone(),
        repositories: Arc::new(RepositoryService::new(
            repos.clone(),
            github.clone(),
            users.clone(),
        )),
        ingest: Arc::new(IngestService::new(
            repos.clone(),
            contributions.clone(),
            github,
            users.clone(),
            Scorer::default(),
        )),
        contributions: Arc::new(ContributionService::new(
            contributions,
            repos,
            config.chain.nft_name.clone(),
        )),
        users,
        mint,
        dependencies: mocks.dependencies,
        config: Arc::new(config),
    }
}

fn app(mocks: Mocks) -> Router {
    routes::app(build_state(mocks, test_config()))
}

fn user(id: i64, login: &str) -> User {
    User {
        id,
        github_id: id * 100,
        login: login.to_string(),
        name: None,
        email: None,
        avatar_url: None,
        wallet_address: None,
        access_token_encrypted: Some("gho_token".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn contribution(id: i64, status: ContributionStatus) -> Contribution {
    Contribution {
        id,
        user_id: 1,
        repository_id: 10,
        kind: ContributionKind::Commit,
        external_id: "9fceb02d0ae598e95dc970b74767f19372d61af8".to_string(),
        title: "Implement wallet binding endpoint".to_string(),
        url: None,
        additions: 80,
        deletions: 20,
        changed_files: 4,
        score: 29,
        score_breakdown: json!({}),
        eligibility: Eligibility::Eligible,
        ineligible_reason: None,
        status,
        token_id: None,
        tx_hash: None,
        mint_error: None,
        mint_attempts: 1,
        mint_started_at: None,
        minted_at: None,
        occurred_at: Utc::now(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn session_token(user_id: i64, login: &str) -> String {
    let jwt = JwtManager::new(test_config().session);
    jwt.generate_token(user_id, login).unwrap().0
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", session_token(1, "octocat")))
}

fn webhook_request(event: Option<&str>, body: &[u8], signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/github/webhook")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958");
    if let Some(event) = event {
        builder = builder.header("x-github-event", event);
    }
    if let Some(signature) = signature {
        builder = builder.header("x-hub-signature-256", signature);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

struct StaticCheck(&'static str, bool);

#[async_trait]
impl DependencyCheck for StaticCheck {
    fn name(&self) -> &'static str {
        self.0
    }

    async fn is_ready(&self) -> bool {
        self.1
    }
}

// ---------- 探针 ----------

#[tokio::test]
async fn test_health_has_security_headers() {
    let response = app(Mocks::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_ready_reports_degraded_dependency() {
    let mocks = Mocks {
        dependencies: vec![
            Arc::new(StaticCheck("database", true)),
            Arc::new(StaticCheck("redis", false)),
        ],
        ..Default::default()
    };
    let response = app(mocks)
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["checks"]["database"], "ok");
    assert_eq!(json["checks"]["redis"], "fail");
}

// ---------- 会话 ----------

#[tokio::test]
async fn test_protected_route_requires_session() {
    let response = app(Mocks::default())
        .oneshot(
            Request::builder()
                .uri("/api/contributions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_invalid_bearer_token_is_rejected() {
    let response = app(Mocks::default())
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_accepts_session_cookie() {
    let mut mocks = Mocks::default();
    mocks
        .users
        .expect_find_by_id()
        .returning(|id| Ok(Some(user(id, "octocat"))));

    let response = app(mocks)
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(
                    header::COOKIE,
                    format!("lightcommit_session={}", session_token(1, "octocat")),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["login"], "octocat");
    assert!(json["data"].get("accessTokenEncrypted").is_none());
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let response = app(Mocks::default())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("lightcommit_session="));
}

// ---------- OAuth ----------

#[tokio::test]
async fn test_github_login_redirects_with_state() {
    let response = app(Mocks::default())
        .oneshot(
            Request::builder()
                .uri("/api/auth/github?redirect=//evil.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(location.contains("client_id=client-id"));
    assert!(location.contains("state="));
}

#[tokio::test]
async fn test_github_login_requires_oauth_config() {
    let mut config = test_config();
    config.github.client_secret = String::new();
    let response = routes::app(build_state(Mocks::default(), config))
        .oneshot(
            Request::builder()
                .uri("/api/auth/github")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_callback_with_unknown_state_redirects_to_login() {
    let response = app(Mocks::default())
        .oneshot(
            Request::builder()
                .uri("/api/auth/github/callback?code=abc&state=forged")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/login?error=invalid_state"
    );
}

#[tokio::test]
async fn test_callback_signs_in_and_sets_cookie() {
    let mut mocks = Mocks::default();
    mocks
        .github
        .expect_exchange_code()
        .withf(|code| code == "abc")
        .returning(|_| Ok("gho_new".to_string()));
    mocks.github.expect_get_authenticated_user().returning(|_| {
        Ok(contribution::github::GitHubUser {
            id: 100,
            login: "octocat".to_string(),
            name: None,
            email: None,
            avatar_url: None,
        })
    });
    mocks
        .users
        .expect_upsert_github_user()
        .withf(|profile, token| profile.github_id == 100 && token == "gho_new")
        .returning(|_, _| Ok(user(1, "octocat")));

    let state = build_state(mocks, test_config());
    state
        .oauth_states
        .save("known-state", "/contributions")
        .await
        .unwrap();

    let response = routes::app(state)
        .oneshot(
            Request::builder()
                .uri("/api/auth/github/callback?code=abc&state=known-state")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://localhost:3000/contributions"
    );
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("lightcommit_session="));
    assert!(cookie.contains("HttpOnly"));
}

// ---------- webhook ----------

#[tokio::test]
async fn test_webhook_without_secret_is_unavailable() {
    let mut config = test_config();
    config.github.webhook_secret = None;
    let body = br#"{"zen":"hi"}"#;

    let response = routes::app(build_state(Mocks::default(), config))
        .oneshot(webhook_request(Some("ping"), body, Some(sign_payload("x", body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let body = br#"{"zen":"hi"}"#;

    let response = app(Mocks::default())
        .oneshot(webhook_request(
            Some("ping"),
            body,
            Some(sign_payload("wrong-secret", body)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_SIGNATURE");

    let response = app(Mocks::default())
        .oneshot(webhook_request(Some("ping"), body, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_requires_event_header() {
    let body = br#"{"zen":"hi"}"#;
    let response = app(Mocks::default())
        .oneshot(webhook_request(None, body, Some(sign_payload(WEBHOOK_SECRET, body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_rejects_malformed_payload() {
    let body = br#"{"ref": 1}"#;
    let response = app(Mocks::default())
        .oneshot(webhook_request(
            Some("push"),
            body,
            Some(sign_payload(WEBHOOK_SECRET, body)),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "MALFORMED_PAYLOAD");
}

#[tokio::test]
async fn test_webhook_ping_is_accepted() {
    let body = br#"{"zen":"Speak like a human.","hook_id":1}"#;
    let response = app(Mocks::default())
        .oneshot(webhook_request(
            Some("ping"),
            body,
            Some(sign_payload(WEBHOOK_SECRET, body)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["event"], "ping");
    assert_eq!(json["data"]["recorded"], json!([]));
}

#[tokio::test]
async fn test_webhook_push_to_untracked_repository() {
    let mut mocks = Mocks::default();
    mocks.repos.expect_find_by_github_id().returning(|_| Ok(None));

    let body = serde_json::to_vec(&json!({
        "ref": "refs/heads/main",
        "repository": {
            "id": 1296269,
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "owner": { "id": 583231, "login": "octocat" },
            "html_url": "https://github.com/octocat/hello-world"
        },
        "commits": [{
            "id": "abc",
            "message": "Add feature",
            "timestamp": "2025-03-01T10:00:00Z",
            "url": "https://github.com/octocat/hello-world/commit/abc",
            "author": { "name": "Mona", "username": "octocat" }
        }]
    }))
    .unwrap();

    let response = app(mocks)
        .oneshot(webhook_request(
            Some("push"),
            &body,
            Some(sign_payload(WEBHOOK_SECRET, &body)),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["skipped"][0]["reason"], "repository_not_tracked");
    assert_eq!(json["data"]["skipped"][0]["externalId"], "abc");
}

// ---------- 贡献 ----------

#[tokio::test]
async fn test_list_contributions_with_filter() {
    let mut mocks = Mocks::default();
    mocks
        .contributions
        .expect_list_for_user()
        .withf(|user_id, filter, limit, offset| {
            *user_id == 1
                && filter.status == Some(ContributionStatus::Completed)
                && filter.eligibility.is_none()
                && *limit == 10
                && *offset == 10
        })
        .returning(|_, _, _, _| Ok(vec![contribution(3, ContributionStatus::Completed)]));
    mocks
        .contributions
        .expect_count_for_user()
        .returning(|_, _| Ok(11));

    let response = app(mocks)
        .oneshot(
            authed("GET", "/api/contributions?status=completed&page=2&perPage=10")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["id"], 3);
    assert_eq!(json["pagination"]["total"], 11);
    assert_eq!(json["pagination"]["totalPages"], 2);
    assert_eq!(json["pagination"]["hasMore"], false);
}

#[tokio::test]
async fn test_contribution_stats() {
    let mut mocks = Mocks::default();
    mocks.contributions.expect_stats_for_user().returning(|_| {
        Ok(ContributionStats {
            total: 4,
            eligible: 3,
            completed: 2,
            total_score: 100,
            average_score: 25.0,
            ..Default::default()
        })
    });

    let response = app(mocks)
        .oneshot(authed("GET", "/api/contributions/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["totalScore"], 100);
    assert_eq!(json["data"]["averageScore"], 25.0);
}

#[tokio::test]
async fn test_get_missing_contribution() {
    let mut mocks = Mocks::default();
    mocks
        .contributions
        .expect_find_for_user()
        .returning(|_, _| Ok(None));

    let response = app(mocks)
        .oneshot(authed("GET", "/api/contributions/99").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_retry_completed_contribution_conflicts() {
    let mut mocks = Mocks::default();
    mocks
        .contributions
        .expect_find_for_user()
        .returning(|_, id| Ok(Some(contribution(id, ContributionStatus::Completed))));

    let response = app(mocks)
        .oneshot(authed("POST", "/api/contributions/5/retry").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "INVALID_STATUS_TRANSITION"
    );
}

#[tokio::test]
async fn test_update_wallet_rejects_invalid_address() {
    let response = app(Mocks::default())
        .oneshot(
            authed("PUT", "/api/users/me/wallet")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"walletAddress":"0x1234"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "INVALID_WALLET_ADDRESS"
    );
}

// ---------- 铸造 ----------

fn mint_request(secret: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/contributions/mint-ready")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(secret) = secret {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {secret}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_mint_ready_unavailable_without_chain() {
    let response = app(Mocks::default())
        .oneshot(mint_request(Some(CRON_SECRET), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_mint_ready_rejects_bad_secret() {
    let mocks = Mocks {
        minter: Some(MockNftMinter::new()),
        ..Default::default()
    };
    let response = app(mocks)
        .oneshot(mint_request(Some("guess"), ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_mint_ready_runs_batch() {
    let mut minter = MockNftMinter::new();
    minter
        .expect_submit_mint()
        .times(1)
        .returning(|req| Ok(format!("0x{:064x}", req.contribution_id)));
    minter.expect_confirm_mint().returning(|tx_hash| {
        Ok(MintReceipt {
            token_id: "1".to_string(),
            tx_hash: tx_hash.to_string(),
            block_number: Some(5),
        })
    });

    let mut mocks = Mocks {
        minter: Some(minter),
        ..Default::default()
    };
    mocks
        .contributions
        .expect_claim_mint_batch()
        .withf(|limit| *limit == 2)
        .returning(|_| {
            Ok(vec![MintCandidate {
                id: 7,
                user_id: 1,
                repository_id: 10,
                kind: ContributionKind::Commit,
                external_id: "abc".to_string(),
                score: 40,
                wallet_address: "0xabcdef0123456789abcdef0123456789abcdef01".to_string(),
            }])
        });
    mocks
        .contributions
        .expect_begin_mint()
        .returning(|_| Ok(true));
    mocks
        .contributions
        .expect_record_mint_submission()
        .returning(|_, _| Ok(true));
    mocks
        .contributions
        .expect_mark_minted()
        .returning(|_, _, _| Ok(true));

    let response = app(mocks)
        .oneshot(mint_request(Some(CRON_SECRET), r#"{"limit":2}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["claimed"], 1);
    assert_eq!(json["data"]["completed"], 1);
    assert_eq!(json["data"]["items"][0]["status"], "completed");
}

// ---------- NFT 元数据 ----------

#[tokio::test]
async fn test_metadata_hidden_for_pending() {
    let mut mocks = Mocks::default();
    mocks
        .contributions
        .expect_find_by_id()
        .returning(|id| Ok(Some(contribution(id, ContributionStatus::Pending))));

    let response = app(mocks)
        .oneshot(
            Request::builder()
                .uri("/api/nft/metadata/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metadata_for_minted_contribution() {
    let mut mocks = Mocks::default();
    mocks
        .contributions
        .expect_find_by_id()
        .returning(|id| Ok(Some(contribution(id, ContributionStatus::Completed))));
    mocks.repos.expect_find_by_id().returning(|_| Ok(None));

    let response = app(mocks)
        .oneshot(
            Request::builder()
                .uri("/api/nft/metadata/7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["name"], "LightCommit #7");
    assert!(json.get("data").is_none());
}
