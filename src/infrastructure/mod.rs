//! 基础设施层模块
//!
//! 负责配置校验、数据库与迁移、指标注册表、日志等基础设施相关功能

pub mod config;
pub mod database;
pub mod logging;
pub mod metrics;

// 重新导出常用类型和错误
pub use config::{Config, ConfigurationError};
pub use database::migrations::{Migration, MigrationError, MigrationRunner};
pub use database::{Database, DatabaseError, DbStatus};
pub use metrics::HttpMetrics;
