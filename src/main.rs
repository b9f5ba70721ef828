//! myapp-hello 服务主入口

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use myapp_hello::auth::JwtService;
use myapp_hello::business::spawn_cleanup_task;
use myapp_hello::infrastructure::logging::init_logging;
use myapp_hello::infrastructure::{HttpMetrics, MigrationRunner};
use myapp_hello::{create_routes, AppState, Config, Database};

#[derive(Debug, Parser)]
#[command(name = "myapp-hello", version, about = "Hello World backend service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 启动 HTTP 服务（默认）
    Serve,
    /// 只执行数据库迁移
    Migrate,
    /// 用 JWT_SECRET 签发一个本地调试用的 token
    Token {
        /// `sub` 声明
        #[arg(long)]
        sub: String,
        /// 有效期（秒）
        #[arg(long, default_value_t = 3600)]
        ttl_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载并校验配置，失败直接退出
    let config = Config::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            init_logging(&config)?;
            let database = Database::new(&config)?;
            if !database.is_configured() {
                bail!("DATABASE_URL 未配置，无法执行迁移");
            }
            let result = run_migrations(&config, &database).await;
            database.close().await;
            result
        }
        Command::Token { sub, ttl_secs } => {
            let Some(secret) = config.auth.jwt_secret.as_deref() else {
                bail!("JWT_SECRET 未配置，无法签发 token");
            };
            let token = JwtService::new(secret)
                .generate_token(&sub, Duration::from_secs(ttl_secs))
                .context("签发 token 失败")?;
            println!("{token}");
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    init_logging(&config)?;
    info!("🚀 启动 {} ({})", config.app_name, config.node_env);

    // 连接池惰性建立，未配置时为空
    let database = Database::new(&config)?;
    if database.is_configured() {
        run_migrations(&config, &database).await?;
    } else {
        info!("⚠️ 未配置 DATABASE_URL，跳过数据库迁移");
    }

    let metrics = HttpMetrics::new().context("注册 Prometheus 指标失败")?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let cleanup_every = Duration::from_millis(config.throttle.ttl_ms.max(1_000));

    let state = AppState::new(config, database.clone(), metrics);
    let cleanup = spawn_cleanup_task(state.rate_limiter.clone(), cleanup_every);
    let app = create_routes(state);
    info!("✅ 路由创建成功");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("无法监听 {addr}"))?;
    info!("🌐 服务器启动成功，监听地址: {}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .tcp_nodelay(true)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    database.close().await;
    info!("👋 服务已停止");

    Ok(())
}

/// 执行迁移，失败视为启动失败
async fn run_migrations(config: &Config, database: &Database) -> anyhow::Result<()> {
    let Some(pool) = database.pool() else {
        return Ok(());
    };

    let applied = MigrationRunner::new(pool.clone())
        .run_dir(&config.migrations_dir)
        .await
        .context("数据库迁移失败")?;
    info!("✅ 数据库迁移完成，本次应用 {} 个", applied.len());

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("无法监听 SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 接收到关闭信号，正在优雅关闭服务器...");
}
