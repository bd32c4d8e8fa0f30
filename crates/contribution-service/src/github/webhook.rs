//! Webhook 签名校验
//!
//! GitHub 以共享密钥对原始请求体做 HMAC-SHA256，放在 `x-hub-signature-256` 头中。

use ring::hmac;

use crate::error::{ContributionError, Result};

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

const SIGNATURE_PREFIX: &str = "sha256=";

/// 校验签名头，比较在 ring 内部以常量时间完成
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<()> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(ContributionError::MissingSignature)?;

    let hex_digest = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(ContributionError::InvalidSignature)?;
    if hex_digest.len() != 64 {
        return Err(ContributionError::InvalidSignature);
    }
    let expected = hex::decode(hex_digest).map_err(|_| ContributionError::InvalidSignature)?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, body, &expected).map_err(|_| ContributionError::InvalidSignature)
}

/// 生成签名头的值，`sha256=<hex>`
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(tag.as_ref()))
}
