//! 限流中间件
//!
//! 固定窗口，按客户端计数。每个响应都带上 `RateLimit-*` 头。

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::business::{RateLimitResult, RateLimitSnapshot, SharedRateLimitService};
use crate::shared::{constants::is_ignored_path, AppError};

pub const RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
pub const RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
pub const RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

pub async fn rate_limit_middleware(
    State(limiter): State<SharedRateLimitService>,
    request: Request,
    next: Next,
) -> Response {
    if is_ignored_path(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_key(&request);
    let result = limiter.check_rate_limit(&client).await;

    let mut response = match result {
        RateLimitResult::Allowed(_) => next.run(request).await,
        RateLimitResult::Exceeded(snapshot) => AppError::RateLimited {
            retry_after_seconds: snapshot.retry_after_seconds,
        }
        .into_response(),
    };

    apply_headers(response.headers_mut(), result.snapshot());
    response
}

/// 客户端标识：X-Forwarded-For 最右侧一项（只信任一跳代理），其次是对端地址
pub fn client_key(request: &Request) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.rsplit(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn apply_headers(headers: &mut HeaderMap, snapshot: &RateLimitSnapshot) {
    headers.insert(RATELIMIT_LIMIT, HeaderValue::from(snapshot.limit));
    headers.insert(RATELIMIT_REMAINING, HeaderValue::from(snapshot.remaining));
    headers.insert(RATELIMIT_RESET, HeaderValue::from(snapshot.reset_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(forwarded: Option<&str>, peer: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = forwarded {
            builder = builder.header("x-forwarded-for", value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(addr) = peer {
            request
                .extensions_mut()
                .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        }
        request
    }

    #[test]
    fn test_client_key_prefers_rightmost_forwarded_entry() {
        let request = request_with(Some("10.0.0.1, 203.0.113.9"), Some("127.0.0.1:5000"));
        assert_eq!(client_key(&request), "203.0.113.9");
    }

    #[test]
    fn test_client_key_falls_back_to_peer() {
        assert_eq!(client_key(&request_with(None, Some("192.0.2.4:8080"))), "192.0.2.4");
        assert_eq!(client_key(&request_with(Some(" "), Some("192.0.2.4:8080"))), "192.0.2.4");
    }

    #[test]
    fn test_client_key_unknown() {
        assert_eq!(client_key(&request_with(None, None)), "unknown");
    }

    #[test]
    fn test_apply_headers() {
        let mut headers = HeaderMap::new();
        apply_headers(
            &mut headers,
            &RateLimitSnapshot {
                limit: 100,
                remaining: 99,
                reset_at: 1_700_000_060,
                retry_after_seconds: 60,
            },
        );
        assert_eq!(headers.get("ratelimit-limit").unwrap(), "100");
        assert_eq!(headers.get("ratelimit-remaining").unwrap(), "99");
        assert_eq!(headers.get("ratelimit-reset").unwrap(), "1700000060");
    }
}
