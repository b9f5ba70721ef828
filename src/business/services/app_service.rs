//! 问候与健康检查服务

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::instrument;

use crate::infrastructure::{Config, Database, DbStatus};

/// `GET /` 的响应体
#[derive(Debug, Clone, Serialize)]
pub struct HelloResponse {
    pub message: &'static str,
    pub env: String,
    pub app: String,
    pub db: DbStatus,
    pub timestamp: String,
}

/// `GET /health` 的响应体
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// 应用服务
#[derive(Debug, Clone)]
pub struct AppService {
    database: Database,
    env: String,
    app: String,
}

impl AppService {
    pub fn new(config: &Config, database: Database) -> Self {
        Self {
            database,
            env: config.node_env.clone(),
            app: config.app_name.clone(),
        }
    }

    /// 问候信息，附带一次数据库连通性探测
    #[instrument(skip(self))]
    pub async fn get_hello(&self) -> HelloResponse {
        let db = self.database.ping().await;

        HelloResponse {
            message: "Hello World!",
            env: self.env.clone(),
            app: self.app.clone(),
            db,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// 存活检查，不访问数据库
    pub fn get_health(&self) -> HealthResponse {
        HealthResponse { status: "ok" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn service() -> AppService {
        let mut raw = HashMap::new();
        raw.insert("NODE_ENV".to_string(), "test".to_string());
        raw.insert("APP_NAME".to_string(), "hello-svc".to_string());
        let config = Config::from_env_map(&raw).unwrap();
        AppService::new(&config, Database::unconfigured())
    }

    #[tokio::test]
    async fn test_hello_without_database() {
        let hello = service().get_hello().await;
        assert_eq!(hello.message, "Hello World!");
        assert_eq!(hello.env, "test");
        assert_eq!(hello.app, "hello-svc");
        assert_eq!(hello.db, DbStatus::NotConfigured);
        assert!(chrono::DateTime::parse_from_rfc3339(&hello.timestamp).is_ok());
        assert!(hello.timestamp.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_hello_serializes_db_status_as_string() {
        let value = serde_json::to_value(service().get_hello().await).unwrap();
        assert_eq!(value["db"], "not configured");
        assert_eq!(value["message"], "Hello World!");
    }

    #[test]
    fn test_health() {
        let value = serde_json::to_value(service().get_health()).unwrap();
        assert_eq!(value, serde_json::json!({ "status": "ok" }));
    }
}
