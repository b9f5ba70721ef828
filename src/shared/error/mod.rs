//! 统一错误处理模块
//!
//! HTTP 边界上的统一错误类型。客户端只会看到 `{"error": "..."}`，
//! 内部细节只进日志。

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

/// 限流时返回给客户端的固定文案
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// 应用程序统一错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 认证相关错误
    #[error("认证错误: {0}")]
    Unauthorized(#[from] AuthError),

    /// 超出限流窗口
    #[error("请求过于频繁，{retry_after_seconds} 秒后重试")]
    RateLimited { retry_after_seconds: u64 },

    /// 路由不存在
    #[error("资源未找到")]
    NotFound,

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取HTTP状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 对外暴露的错误文案
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::Unauthorized(auth) => auth.public_message(),
            AppError::RateLimited { .. } => RATE_LIMIT_MESSAGE,
            AppError::NotFound => "Not Found",
            AppError::Internal(_) => "Internal Server Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            tracing::error!(status = ?status_code, error = %self, "处理请求时发生错误");
        } else {
            tracing::debug!(status = ?status_code, error = %self, "请求被拒绝");
        }

        let body = Json(json!({ "error": self.public_message() }));
        let mut response = (status_code, body).into_response();

        if let AppError::RateLimited { retry_after_seconds } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_keep_distinct_messages() {
        assert_eq!(
            AppError::from(AuthError::MissingToken).public_message(),
            "Unauthorized"
        );
        assert_eq!(
            AppError::from(AuthError::MissingSecret).public_message(),
            "Unauthorized"
        );
        assert_eq!(
            AppError::from(AuthError::InvalidToken).public_message(),
            "Invalid token"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::RateLimited { retry_after_seconds: 3 }.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Internal("指标编码失败".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_seconds: 42 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::Internal("connection reset by peer".to_string());
        assert_eq!(err.public_message(), "Internal Server Error");
    }
}
