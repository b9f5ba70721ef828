//! Prometheus 指标导出

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

use crate::presentation::routes::AppState;
use crate::shared::{AppError, AppResult};

/// 以文本格式导出注册表
pub async fn export_metrics(State(state): State<AppState>) -> AppResult<Response> {
    let body = state
        .metrics
        .encode()
        .map_err(|e| AppError::Internal(format!("指标编码失败: {e}")))?;

    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body).into_response())
}
