//! myapp-hello 服务
//! 
//! 最小化的后端服务模板：问候、健康检查、数据库探测、JWT 鉴权、限流和 Prometheus 指标，
//! 按分层架构组织

// 核心模块
pub mod shared;          // 共享模块（错误处理、常量）
pub mod infrastructure;  // 基础设施层（配置、数据库与迁移、指标、日志）
pub mod business;        // 业务逻辑层（问候/健康检查、限流）
pub mod presentation;    // 表示层（HTTP处理、路由、中间件）
pub mod auth;           // 认证和授权模块

// 重新导出核心类型
pub use infrastructure::{Config, Database};
pub use shared::{AppError, AppResult};
pub use presentation::{create_routes, AppState};
