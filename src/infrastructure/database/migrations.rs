//! SQL 迁移执行器
//!
//! 所有迁移在同一个事务内执行，并先获取事务级 advisory lock
//! (`pg_advisory_xact_lock`)。多个实例同时启动时只有一个能拿到锁，
//! 其余实例阻塞到事务结束后再检查，发现没有待执行的迁移就直接返回。
//! 锁随 COMMIT / ROLLBACK 自动释放，进程崩溃也不会遗留。

use std::path::{Path, PathBuf};

use sqlx::{Executor, PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{info, warn};

/// 迁移专用的 advisory lock 键
pub const ADVISORY_LOCK_KEY: i64 = 7_777_777;

const CREATE_TRACKING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS migrations (
        id SERIAL PRIMARY KEY,
        name VARCHAR(255) UNIQUE NOT NULL,
        applied_at TIMESTAMPTZ DEFAULT now()
    )
"#;

/// 迁移错误类型
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("读取迁移目录 {path} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("迁移文件名不是合法 UTF-8: {}", .path.display())]
    InvalidName { path: PathBuf },

    #[error("迁移事务失败: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("执行迁移 {name} 失败: {source}")]
    Apply {
        name: String,
        #[source]
        source: sqlx::Error,
    },
}

/// 单个迁移单元，`name` 即文件名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub name: String,
    pub sql: String,
}

impl Migration {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// 读取目录下所有 `.sql` 文件，按文件名排序
pub async fn load_migrations(dir: &Path) -> Result<Vec<Migration>, MigrationError> {
    let io_err = |source| MigrationError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut migrations = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("sql") {
            continue;
        }
        // 不能静默跳过任何迁移
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return Err(MigrationError::InvalidName { path: path.clone() });
        };
        let sql = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;
        migrations.push(Migration::new(name, sql));
    }

    sort_migrations(&mut migrations);
    Ok(migrations)
}

/// 按名称字典序排序，数字前缀决定执行顺序
pub fn sort_migrations(migrations: &mut [Migration]) {
    migrations.sort_by(|a, b| a.name.cmp(&b.name));
}

/// 迁移执行器
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    pool: PgPool,
}

impl MigrationRunner {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 加载目录中的迁移并执行
    pub async fn run_dir(&self, dir: &Path) -> Result<Vec<String>, MigrationError> {
        let migrations = load_migrations(dir).await?;
        info!(dir = %dir.display(), count = migrations.len(), "已加载迁移文件");
        self.run(&migrations).await
    }

    /// 执行尚未应用的迁移，返回本次实际应用的迁移名
    ///
    /// 任一步失败都会回滚整个事务，调用方应把错误视为启动失败。
    pub async fn run(&self, migrations: &[Migration]) -> Result<Vec<String>, MigrationError> {
        let mut ordered = migrations.to_vec();
        sort_migrations(&mut ordered);

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ADVISORY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        match apply_pending(&mut tx, &ordered).await {
            Ok(applied) => {
                tx.commit().await?;
                if applied.is_empty() {
                    info!("没有待执行的迁移");
                }
                Ok(applied)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "迁移回滚失败");
                }
                Err(e)
            }
        }
    }
}

async fn apply_pending(
    tx: &mut Transaction<'_, Postgres>,
    migrations: &[Migration],
) -> Result<Vec<String>, MigrationError> {
    (&mut **tx).execute(CREATE_TRACKING_TABLE).await?;

    let mut applied = Vec::new();
    for migration in migrations {
        let exists = sqlx::query("SELECT 1 FROM migrations WHERE name = $1")
            .bind(&migration.name)
            .fetch_optional(&mut **tx)
            .await?
            .is_some();
        if exists {
            continue;
        }

        (&mut **tx)
            .execute(migration.sql.as_str())
            .await
            .map_err(|source| MigrationError::Apply {
                name: migration.name.clone(),
                source,
            })?;

        sqlx::query("INSERT INTO migrations (name) VALUES ($1)")
            .bind(&migration.name)
            .execute(&mut **tx)
            .await?;

        info!(migration = %migration.name, "Applied migration");
        applied.push(migration.name.clone());
    }

    Ok(applied)
}
