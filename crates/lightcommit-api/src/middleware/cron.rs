//! 定时触发接口的共享密钥校验
//!
//! 双方先做 SHA-256 再比较，比较耗时与密钥内容无关

use sha2::{Digest, Sha256};

use crate::error::ApiError;

pub fn verify_cron_secret(expected: Option<&str>, provided: Option<&str>) -> Result<(), ApiError> {
    let expected =
        expected.ok_or_else(|| ApiError::Unavailable("未配置 mint.cron_secret".to_string()))?;
    let provided = provided.ok_or_else(|| ApiError::Unauthorized("缺少 cron 密钥".to_string()))?;

    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(provided.as_bytes());
    let diff = a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y));

    if diff == 0 {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("cron 密钥错误".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cron_secret() {
        assert!(verify_cron_secret(Some("s3cret"), Some("s3cret")).is_ok());
        assert!(matches!(
            verify_cron_secret(Some("s3cret"), Some("guess")),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            verify_cron_secret(Some("s3cret"), None),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(matches!(
            verify_cron_secret(None, Some("s3cret")),
            Err(ApiError::Unavailable(_))
        ));
    }
}
