//! 业务逻辑层模块
//! 
//! 包含问候/健康检查服务和限流服务

pub mod services;

// 重新导出常用类型
pub use services::*;
