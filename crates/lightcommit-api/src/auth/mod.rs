//! 会话与 OAuth 支持

pub mod oauth;
pub mod session;

pub use oauth::{OAuthStateStore, RedisStateStore, generate_state, sanitize_redirect};
pub use session::{Claims, JwtManager, clear_session_cookie, session_cookie};
