//! HTTP请求处理器模块

pub mod health;
pub mod hello;
pub mod metrics;
pub mod profile;

use crate::shared::AppError;

/// 未匹配任何路由
pub async fn not_found() -> AppError {
    AppError::NotFound
}
