//! JWT Token处理模块

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 校验通过后挂到请求上的身份信息（token 的完整 payload）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub Map<String, Value>);

impl Identity {
    /// `sub` 声明
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// 签发 token 失败
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token 有效期过长: {0} 秒")]
    TtlOutOfRange(u64),

    #[error("token 签名失败: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// JWT Token服务，只接受 HS256
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService").finish_non_exhaustive()
    }
}

impl JwtService {
    /// 创建新的JWT服务
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // exp 存在时必须未过期；不强制要求 exp / aud
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// 签发 token，主要用于本地调试和测试
    pub fn generate_token(
        &self,
        subject: &str,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(secs))
            .ok_or(TokenError::TtlOutOfRange(ttl.as_secs()))?;

        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from(subject));
        claims.insert("iat".to_string(), Value::from(now));
        claims.insert("exp".to_string(), Value::from(exp));

        Ok(self.sign(&Identity(claims))?)
    }

    /// 对任意 payload 签名
    pub fn sign(&self, claims: &Identity) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }

    /// 验证JWT Token：签名、算法与过期时间
    pub fn verify_token(&self, token: &str) -> Result<Identity, jsonwebtoken::errors::Error> {
        decode::<Identity>(token, &self.decoding_key, &self.validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;
    use serde_json::json;

    const SECRET: &str = "test-secret-for-unit-tests-0123456789";

    fn identity(value: Value) -> Identity {
        match value {
            Value::Object(map) => Identity(map),
            _ => panic!("payload 必须是对象"),
        }
    }

    #[test]
    fn test_generate_and_verify() {
        let service = JwtService::new(SECRET);
        let token = service.generate_token("user-1", Duration::from_secs(3600)).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.subject(), Some("user-1"));
        assert!(claims.claim("exp").is_some());
    }

    #[test]
    fn test_payload_without_exp_is_accepted() {
        let service = JwtService::new(SECRET);
        let token = service
            .sign(&identity(json!({ "sub": "42", "role": "admin" })))
            .unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.claim("role"), Some(&json!("admin")));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::new(SECRET);
        let past = Utc::now().timestamp() - 10;
        let token = service
            .sign(&identity(json!({ "sub": "1", "exp": past })))
            .unwrap();

        let err = service.verify_token(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtService::new(SECRET)
            .generate_token("1", Duration::from_secs(60))
            .unwrap();
        let other = JwtService::new("another-secret-another-secret-xx");
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_algorithm_rejected() {
        let token = encode(
            &Header::new(Algorithm::HS512),
            &json!({ "sub": "1" }),
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = JwtService::new(SECRET).verify_token(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidAlgorithm));
    }

    #[test]
    fn test_oversized_ttl_is_an_error() {
        let service = JwtService::new(SECRET);

        let err = service.generate_token("1", Duration::from_secs(u64::MAX)).unwrap_err();
        assert!(matches!(err, TokenError::TtlOutOfRange(secs) if secs == u64::MAX));

        // 能转成 i64 但加上当前时间会溢出
        let err = service
            .generate_token("1", Duration::from_secs(i64::MAX as u64))
            .unwrap_err();
        assert!(matches!(err, TokenError::TtlOutOfRange(_)));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let service = JwtService::new(SECRET);
        assert!(service.verify_token("invalid.token.here").is_err());
        assert!(service.verify_token("").is_err());
    }

    #[test]
    fn test_audience_not_enforced() {
        let service = JwtService::new(SECRET);
        let token = service
            .sign(&identity(json!({ "sub": "1", "aud": "somebody" })))
            .unwrap();
        assert!(service.verify_token(&token).is_ok());
    }
}
