pub mod migrations;

use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::PgPool;

use crate::infrastructure::config::{Config, DatabaseConfig};

/// 关闭连接池的最长等待时间
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// 数据库错误类型
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Database is not configured")]
    NotConfigured,

    #[error("SQL执行错误: {0}")]
    Sql(#[from] sqlx::Error),
}

/// 数据库连通状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DbStatus {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "not configured")]
    NotConfigured,
}

impl DbStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbStatus::Connected => "connected",
            DbStatus::Error => "error",
            DbStatus::NotConfigured => "not configured",
        }
    }
}

impl std::fmt::Display for DbStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 数据库管理器
///
/// 是否持有连接池在构造时决定，之后不再改变。没有配置 `DATABASE_URL`
/// 时处于"未配置"状态，`ping` 直接返回 [`DbStatus::NotConfigured`]。
#[derive(Debug, Clone)]
pub struct Database {
    pool: Option<PgPool>,
}

impl Database {
    /// 使用配置创建数据库实例，连接池惰性建立，首次使用时才真正连接
    pub fn new(config: &Config) -> Result<Self, DatabaseError> {
        match config.database_url.as_deref() {
            Some(url) => Self::connect_lazy(url, &config.database),
            None => Ok(Self::unconfigured()),
        }
    }

    /// 未配置数据库的实例
    pub fn unconfigured() -> Self {
        Self { pool: None }
    }

    /// 按给定参数构建惰性连接池
    pub fn connect_lazy(database_url: &str, config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let connect_options = PgConnectOptions::from_str(database_url)?
            .options([("statement_timeout", config.statement_timeout_ms.to_string())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_lazy_with(connect_options);

        tracing::info!(
            max_connections = config.max_connections,
            "数据库连接池已创建（惰性连接）"
        );

        Ok(Self { pool: Some(pool) })
    }

    /// 是否配置了数据库
    pub fn is_configured(&self) -> bool {
        self.pool.is_some()
    }

    /// 获取数据库连接池
    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// 检查数据库连通性，失败只记录日志，不向调用方抛出
    pub async fn ping(&self) -> DbStatus {
        let Some(pool) = &self.pool else {
            return DbStatus::NotConfigured;
        };

        let start = Instant::now();
        match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => {
                tracing::debug!(elapsed = ?start.elapsed(), "数据库健康检查成功");
                DbStatus::Connected
            }
            Err(e) => {
                tracing::error!(
                    elapsed = ?start.elapsed(),
                    error = %e,
                    cause = ?e,
                    "Database health check failed"
                );
                DbStatus::Error
            }
        }
    }

    /// 执行 SQL 并返回全部行，未配置数据库时返回 [`DatabaseError::NotConfigured`]
    pub async fn query(&self, sql: &str, args: PgArguments) -> Result<Vec<PgRow>, DatabaseError> {
        let pool = self.pool.as_ref().ok_or(DatabaseError::NotConfigured)?;
        let rows = sqlx::query_with(sql, args).fetch_all(pool).await?;
        Ok(rows)
    }

    /// 关闭连接池，最多等待 [`SHUTDOWN_TIMEOUT`]
    pub async fn close(&self) {
        self.close_with_timeout(SHUTDOWN_TIMEOUT).await;
    }

    /// 关闭连接池，超时后记录警告并直接返回
    pub async fn close_with_timeout(&self, timeout: Duration) {
        let Some(pool) = &self.pool else {
            return;
        };

        tracing::info!("正在关闭数据库连接池...");
        match tokio::time::timeout(timeout, pool.close()).await {
            Ok(()) => tracing::info!("数据库连接池已关闭"),
            Err(_) => tracing::warn!(
                timeout_secs = timeout.as_secs(),
                "Pool shutdown timed out, forcing close"
            ),
        }
    }
}
