//! 问候处理器（`/` 与 `/v1`）

use axum::{extract::State, response::Json};

use crate::business::HelloResponse;
use crate::presentation::routes::AppState;

pub async fn get_hello(State(state): State<AppState>) -> Json<HelloResponse> {
    Json(state.app_service.get_hello().await)
}
