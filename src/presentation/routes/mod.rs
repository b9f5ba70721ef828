//! 路由配置模块
//!
//! 组织和配置所有HTTP路由。每条路由注册时声明访问级别，由授权守卫统一判定。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response},
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Level, Span};

use crate::auth::middleware::with_access;
use crate::auth::{AuthGuard, JwtService, RouteAccess};
use crate::business::{AppService, RateLimitService, SharedRateLimitService};
use crate::infrastructure::{Config, Database, HttpMetrics};
use crate::presentation::handlers;
use crate::presentation::middleware::{metrics_middleware, rate_limit_middleware};

/// 处理器共享的应用状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Database,
    pub app_service: AppService,
    pub metrics: HttpMetrics,
    pub rate_limiter: SharedRateLimitService,
    /// 未配置 JWT_SECRET 时为空
    pub jwt: Option<Arc<JwtService>>,
}

impl AppState {
    pub fn new(config: Config, database: Database, metrics: HttpMetrics) -> Self {
        let jwt = config
            .auth
            .jwt_secret
            .as_deref()
            .map(|secret| Arc::new(JwtService::new(secret)));
        let rate_limiter = Arc::new(RateLimitService::new(&config.throttle));
        let app_service = AppService::new(&config, database.clone());

        Self {
            config: Arc::new(config),
            database,
            app_service,
            metrics,
            rate_limiter,
            jwt,
        }
    }
}

/// 注册路由时同时绑定访问级别
struct RouteTable {
    router: Router<AppState>,
    jwt: Option<Arc<JwtService>>,
}

impl RouteTable {
    fn new(jwt: Option<Arc<JwtService>>) -> Self {
        Self {
            router: Router::new(),
            jwt,
        }
    }

    fn route(mut self, path: &str, access: RouteAccess, handler: MethodRouter<AppState>) -> Self {
        let guard = AuthGuard::new(access, self.jwt.clone());
        self.router = self.router.route(path, with_access(handler, guard));
        self
    }

    fn public(self, path: &str, handler: MethodRouter<AppState>) -> Self {
        self.route(path, RouteAccess::Public, handler)
    }

    fn protected(self, path: &str, handler: MethodRouter<AppState>) -> Self {
        self.route(path, RouteAccess::Protected, handler)
    }

    fn into_router(self) -> Router<AppState> {
        self.router
    }
}

/// 创建应用路由
pub fn create_routes(state: AppState) -> Router {
    let routes = RouteTable::new(state.jwt.clone())
        .public("/health", get(handlers::health::health_check))
        .public("/", get(handlers::hello::get_hello))
        .public("/v1", get(handlers::hello::get_hello))
        .protected("/v1/profile", get(handlers::profile::get_profile))
        .public("/metrics", get(handlers::metrics::export_metrics))
        .into_router()
        .fallback(handlers::not_found);

    routes
        // 由内到外：限流 -> 指标 -> 安全头 -> 请求日志 / 请求 ID
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_DNS_PREFETCH_CONTROL,
            HeaderValue::from_static("off"),
        ))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(make_request_span)
                        .on_response(log_response),
                )
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

fn make_request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// 5xx 记 error，4xx 记 warn，其余 info
fn log_response(response: &Response<Body>, latency: Duration, _span: &Span) {
    let status = response.status();
    let latency_ms = latency.as_millis() as u64;

    let level = response_level(status.as_u16());

    if level == Level::ERROR {
        tracing::error!(status = status.as_u16(), latency_ms, "请求完成");
    } else if level == Level::WARN {
        tracing::warn!(status = status.as_u16(), latency_ms, "请求完成");
    } else {
        tracing::info!(status = status.as_u16(), latency_ms, "请求完成");
    }
}

fn response_level(status: u16) -> Level {
    if status >= 500 {
        Level::ERROR
    } else if status >= 400 {
        Level::WARN
    } else {
        Level::INFO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_level() {
        assert_eq!(response_level(200), Level::INFO);
        assert_eq!(response_level(304), Level::INFO);
        assert_eq!(response_level(401), Level::WARN);
        assert_eq!(response_level(429), Level::WARN);
        assert_eq!(response_level(500), Level::ERROR);
        assert_eq!(response_level(503), Level::ERROR);
    }
}
