//! 会话 JWT
//!
//! HS256 签名，通过 `lightcommit_session` cookie 或 Bearer 头携带

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use lightcommit_shared::config::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// JWT 载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    pub login: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("无效的会话".to_string()))
    }
}

#[derive(Clone)]
pub struct JwtManager {
    config: SessionConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: SessionConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.config.cookie_name
    }

    /// 生成会话 token，返回 (token, 过期时间戳)
    pub fn generate_token(&self, user_id: i64, login: &str) -> Result<(String, i64), ApiError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: user_id.to_string(),
            login: login.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT 生成失败: {e}")))?;
        Ok((token, exp.timestamp()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("会话已过期".to_string())
                }
                _ => ApiError::Unauthorized("无效的会话".to_string()),
            }
        })?;
        Ok(data.claims)
    }

    pub fn secure_cookie(&self) -> bool {
        self.config.secure_cookie
    }
}

/// 写入会话 cookie
pub fn session_cookie(jwt: &JwtManager, token: String) -> Cookie<'static> {
    Cookie::build((jwt.cookie_name().to_string(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(jwt.secure_cookie())
        .build()
}

/// 过期的会话 cookie，path 需与写入时一致
///
/// 直接 `add` 到响应，请求未携带 cookie 时也会下发
pub fn clear_session_cookie(jwt: &JwtManager) -> Cookie<'static> {
    let mut cookie = Cookie::build((jwt.cookie_name().to_string(), ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(jwt.secure_cookie())
        .build();
    cookie.make_removal();
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(SessionConfig::default())
    }

    #[test]
    fn test_generate_and_verify() {
        let jwt = manager();
        let (token, exp) = jwt.generate_token(42, "octocat").unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.login, "octocat");
        assert_eq!(claims.exp, exp);
        assert_eq!(claims.iss, "lightcommit");
    }

    #[test]
    fn test_rejects_foreign_token() {
        let other = JwtManager::new(SessionConfig {
            jwt_secret: "another-secret".to_string(),
            ..Default::default()
        });
        let (token, _) = other.generate_token(1, "mallory").unwrap();

        assert!(matches!(
            manager().verify_token(&token),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_rejects_expired_token() {
        let jwt = JwtManager::new(SessionConfig {
            expires_in_secs: -3600,
            ..Default::default()
        });
        let (token, _) = jwt.generate_token(1, "octocat").unwrap();
        assert!(jwt.verify_token(&token).is_err());
    }

    #[test]
    fn test_session_cookie_flags() {
        let jwt = manager();
        let cookie = session_cookie(&jwt, "abc".to_string());
        assert_eq!(cookie.name(), "lightcommit_session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_session_cookie(&manager());
        assert_eq!(cookie.value(), "");
        assert!(cookie.max_age().is_some());
        assert_eq!(cookie.path(), Some("/"));
    }
}
