//! 字段级数据加密模块
//!
//! 基于 AES-256-GCM 加密落库的敏感字段（GitHub access token）。
//!
//! - 每次加密生成独立的 12 字节随机 nonce，相同明文产生不同密文
//! - 未配置密钥时为 passthrough 模式，便于本地开发
//! - 输出格式: `base64(nonce[12] || ciphertext || tag[16])`

use aes_gcm::{Aes256Gcm, AeadCore, KeyInit, aead::Aead};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;

/// 加密模块错误类型
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("加密失败: {0}")]
    EncryptionFailed(String),

    #[error("解密失败: {0}")]
    DecryptionFailed(String),

    #[error("无效的密钥: {0}")]
    InvalidKey(String),

    #[error("无效的密文格式: {0}")]
    InvalidCiphertext(String),
}

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;

/// 字段级加密器
#[derive(Clone)]
pub struct FieldEncryptor {
    /// None 表示 passthrough 模式
    cipher: Option<Aes256Gcm>,
}

impl FieldEncryptor {
    /// 从 32 字节密钥创建加密器
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKey(format!(
                "预期 {KEY_SIZE} 字节, 实际 {} 字节",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self {
            cipher: Some(cipher),
        })
    }

    /// 创建 passthrough 模式的加密器（不执行加密）
    pub fn passthrough() -> Self {
        Self { cipher: None }
    }

    /// 从 64 字符的 hex 密钥创建加密器
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("hex 解码失败: {e}")))?;
        Self::new(&bytes)
    }

    /// 根据可选配置创建：有密钥则加密，否则 passthrough
    pub fn from_optional_hex(hex_key: Option<&str>) -> Result<Self, CryptoError> {
        match hex_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::from_hex(key),
            None => Ok(Self::passthrough()),
        }
    }

    /// 是否处于加密模式（非 passthrough）
    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    /// 加密字符串
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let Some(ref cipher) = self.cipher else {
            return Ok(plaintext.to_string());
        };

        let nonce = Aes256Gcm::generate_nonce(&mut aes_gcm::aead::OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(&combined))
    }

    /// 解密 `encrypt()` 产生的密文
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CryptoError> {
        let Some(ref cipher) = self.cipher else {
            return Ok(ciphertext.to_string());
        };

        let combined = BASE64
            .decode(ciphertext)
            .map_err(|e| CryptoError::InvalidCiphertext(format!("base64 解码失败: {e}")))?;

        if combined.len() < NONCE_SIZE {
            return Err(CryptoError::InvalidCiphertext(format!(
                "密文过短: 至少需要 {NONCE_SIZE} 字节 nonce，实际 {} 字节",
                combined.len()
            )));
        }

        let (nonce_bytes, ciphertext_bytes) = combined.split_at(NONCE_SIZE);
        let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext_bytes)
            .map_err(|_| CryptoError::DecryptionFailed("密文损坏或密钥不匹配".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("解密结果非 UTF-8: {e}")))
    }
}
