//! GitHub 集成：OAuth / REST 客户端、webhook 签名与事件解析

pub mod client;
pub mod events;
pub mod webhook;

pub use client::{
    CommitStats, GitHubApi, GitHubClient, GitHubOwner, GitHubRepo, GitHubUser, authorize_url,
};
pub use events::{PullRequestEvent, PushCommit, PushEvent, WebhookEvent, WebhookRepository};
pub use webhook::{
    DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, sign_payload, verify_signature,
};

#[cfg(any(test, feature = "mocks"))]
pub use client::MockGitHubApi;
