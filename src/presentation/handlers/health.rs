//! 健康检查处理器

use axum::{extract::State, response::Json};
use tracing::debug;

use crate::business::HealthResponse;
use crate::presentation::routes::AppState;

/// 基础健康检查，不访问数据库
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    debug!("🏥 健康检查请求");
    Json(state.app_service.get_health())
}
