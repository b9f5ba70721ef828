pub mod validation;

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::constants::{DEFAULT_APP_NAME, DEFAULT_PORT};
pub use validation::{validate, ConfigurationError};

/// 校验后的强类型配置，进程生命周期内不可变
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node_env: String,
    pub app_name: String,
    pub database_url: Option<String>,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub throttle: ThrottleConfig,
    pub log_level: String,
    pub migrations_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub idle_timeout_seconds: u64,
    pub statement_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout_seconds: 30,
            idle_timeout_seconds: 30,
            statement_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// 窗口长度（毫秒）
    pub ttl_ms: u64,
    /// 窗口内允许的请求数
    pub limit: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            ttl_ms: validation::DEFAULT_THROTTLE_TTL_MS,
            limit: validation::DEFAULT_THROTTLE_LIMIT,
        }
    }
}

fn lookup<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

impl Config {
    /// 从进程环境加载（先读取 .env），校验失败直接返回错误
    pub fn load() -> Result<Self, ConfigurationError> {
        dotenv::dotenv().ok();
        let raw: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_map(&raw)
    }

    /// 从任意键值映射构建配置，测试里用它代替真实环境
    pub fn from_env_map(raw: &HashMap<String, String>) -> Result<Self, ConfigurationError> {
        let vars = validate(raw)?;
        let parse_or = |key: &str, default: u64| {
            lookup(&vars, key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };
        // 连接数必须落在 1..=u32::MAX，否则用缺省值
        let max_connections = lookup(&vars, "DB_MAX_CONNECTIONS")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n >= 1);

        let db_defaults = DatabaseConfig::default();
        let throttle_defaults = ThrottleConfig::default();

        Ok(Config {
            node_env: lookup(&vars, "NODE_ENV").unwrap_or("development").to_string(),
            app_name: lookup(&vars, "APP_NAME").unwrap_or(DEFAULT_APP_NAME).to_string(),
            database_url: lookup(&vars, "DATABASE_URL").map(str::to_string),

            server: ServerConfig {
                port: lookup(&vars, "PORT")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_PORT),
                host: lookup(&vars, "HOST").unwrap_or("0.0.0.0").to_string(),
            },

            database: DatabaseConfig {
                max_connections: max_connections.unwrap_or(db_defaults.max_connections),
                acquire_timeout_seconds: parse_or(
                    "DB_ACQUIRE_TIMEOUT",
                    db_defaults.acquire_timeout_seconds,
                ),
                idle_timeout_seconds: parse_or("DB_IDLE_TIMEOUT", db_defaults.idle_timeout_seconds),
                statement_timeout_ms: parse_or(
                    "DB_STATEMENT_TIMEOUT",
                    db_defaults.statement_timeout_ms,
                ),
            },

            auth: AuthConfig {
                jwt_secret: lookup(&vars, "JWT_SECRET").map(str::to_string),
            },

            throttle: ThrottleConfig {
                ttl_ms: parse_or("THROTTLE_TTL", throttle_defaults.ttl_ms),
                // 上限已由校验保证
                limit: lookup(&vars, "THROTTLE_LIMIT")
                    .and_then(|v| v.parse::<u32>().ok())
                    .unwrap_or(throttle_defaults.limit),
            },

            log_level: lookup(&vars, "LOG_LEVEL").unwrap_or("info").to_string(),
            migrations_dir: PathBuf::from(lookup(&vars, "MIGRATIONS_DIR").unwrap_or("migrations")),
        })
    }

    pub fn is_production(&self) -> bool {
        self.node_env == "production"
    }
}
