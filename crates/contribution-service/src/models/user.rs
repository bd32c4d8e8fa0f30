//! 用户实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ContributionError, Result};

/// GitHub 登录用户
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub github_id: i64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub wallet_address: Option<String>,
    /// 加密后的 GitHub access token，不对外输出
    #[serde(skip)]
    pub access_token_encrypted: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_wallet(&self) -> bool {
        self.wallet_address.is_some()
    }
}

/// OAuth 登录后写入的用户资料
#[derive(Debug, Clone, PartialEq)]
pub struct GithubProfile {
    pub github_id: i64,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// 校验并规范化以太坊地址：`0x` + 40 位 hex，统一小写存储
pub fn normalize_wallet_address(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ContributionError::InvalidWalletAddress(raw.to_string()))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ContributionError::InvalidWalletAddress(raw.to_string()));
    }

    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_is_lowercased() {
        let addr = normalize_wallet_address(" 0xAbCdEf0123456789abcdef0123456789ABCDEF01 ").unwrap();
        assert_eq!(addr, "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_invalid_wallets_rejected() {
        for raw in [
            "",
            "abcdef0123456789abcdef0123456789abcdef01",
            "0x123",
            "0xzzcdef0123456789abcdef0123456789abcdef01",
            "0xabcdef0123456789abcdef0123456789abcdef0102",
        ] {
            assert!(
                matches!(
                    normalize_wallet_address(raw),
                    Err(ContributionError::InvalidWalletAddress(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_token_is_not_serialized() {
        let user = User {
            id: 1,
            github_id: 42,
            login: "octocat".into(),
            name: None,
            email: None,
            avatar_url: None,
            wallet_address: None,
            access_token_encrypted: Some("secret".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("accessTokenEncrypted").is_none());
        assert_eq!(json["githubId"], 42);
    }
}
