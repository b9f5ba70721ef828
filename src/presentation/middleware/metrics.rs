//! 请求指标中间件
//!
//! 路由标签优先使用匹配到的路由模板（如 `/users/:id`），匹配不到时退回原始路径。
//! `/health` 和 `/metrics` 不计入。

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::infrastructure::HttpMetrics;
use crate::shared::constants::is_ignored_path;

pub async fn metrics_middleware(
    State(metrics): State<HttpMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    if is_ignored_path(&route) {
        return next.run(request).await;
    }

    let method = request.method().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    metrics.record(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
