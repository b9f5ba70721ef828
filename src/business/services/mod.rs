//! 业务服务模块

pub mod app_service;
pub mod rate_limit_service;

pub use app_service::{AppService, HealthResponse, HelloResponse};
pub use rate_limit_service::{
    spawn_cleanup_task, RateLimitResult, RateLimitService, RateLimitSnapshot, SharedRateLimitService,
};
