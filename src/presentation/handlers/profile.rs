//! 受保护的示例路由

use axum::{response::Json, Extension};
use serde_json::{json, Value};
use tracing::info;

use crate::auth::Identity;

/// 返回授权守卫挂到请求上的 token payload
pub async fn get_profile(Extension(identity): Extension<Identity>) -> Json<Value> {
    info!(sub = identity.subject().unwrap_or("-"), "👤 获取当前身份");
    Json(json!({ "user": identity }))
}
