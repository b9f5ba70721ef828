//! 日志初始化
//!
//! 生产环境输出 JSON 行，其他环境输出便于阅读的格式。
//! 过滤级别优先取 LOG_LEVEL，其次 RUST_LOG，最后回落到 info。

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infrastructure::Config;

/// 根据配置构建过滤器，非法的 LOG_LEVEL 回落到 RUST_LOG / info
pub fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// 初始化全局日志订阅器，只能调用一次
pub fn init_logging(config: &Config) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter(&config.log_level));

    if config.is_production() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}
