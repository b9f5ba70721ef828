use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::infrastructure::config::validation::MAX_THROTTLE_TTL_MS;
use crate::infrastructure::config::ThrottleConfig;

/// 速率限制记录（固定窗口，从该客户端的第一个请求开始计时）
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// 当前窗口的配额快照，用于生成 RateLimit-* 响应头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    pub limit: u32,
    pub remaining: u32,
    /// 窗口结束时间（Unix 秒）
    pub reset_at: i64,
    /// 距窗口结束的秒数（向上取整）
    pub retry_after_seconds: u64,
}

/// 速率限制结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitResult {
    Allowed(RateLimitSnapshot),
    Exceeded(RateLimitSnapshot),
}

impl RateLimitResult {
    pub fn snapshot(&self) -> &RateLimitSnapshot {
        match self {
            RateLimitResult::Allowed(snapshot) | RateLimitResult::Exceeded(snapshot) => snapshot,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed(_))
    }
}

/// 速率限制服务
/// 按客户端标识在内存中计数
#[derive(Debug)]
pub struct RateLimitService {
    window: Duration,
    limit: u32,
    // 客户端标识 -> 记录
    records: RwLock<HashMap<String, RateLimitRecord>>,
}

impl RateLimitService {
    /// 创建新的速率限制服务
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            window: Duration::milliseconds(config.ttl_ms.min(MAX_THROTTLE_TTL_MS) as i64),
            limit: config.limit,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// 检查并更新速率限制
    pub async fn check_rate_limit(&self, client: &str) -> RateLimitResult {
        self.check_at(client, Utc::now()).await
    }

    /// 以指定时间点检查，便于测试窗口切换
    pub async fn check_at(&self, client: &str, now: DateTime<Utc>) -> RateLimitResult {
        let mut records = self.records.write().await;
        let record = records
            .entry(client.to_string())
            .or_insert_with(|| RateLimitRecord {
                count: 0,
                window_start: now,
            });

        // 窗口过期则重置计数器
        if now >= window_end(record.window_start, self.window) {
            record.count = 0;
            record.window_start = now;
        }

        let window_end = window_end(record.window_start, self.window);
        let millis_left = (window_end - now).num_milliseconds().max(0) as u64;
        let retry_after_seconds = millis_left.div_ceil(1000);
        let reset_at = window_end.timestamp() + i64::from(window_end.timestamp_subsec_millis() > 0);

        if record.count >= self.limit {
            warn!(client, count = record.count, limit = self.limit, "⚠️ 请求超出限流窗口");
            return RateLimitResult::Exceeded(RateLimitSnapshot {
                limit: self.limit,
                remaining: 0,
                reset_at,
                retry_after_seconds,
            });
        }

        // 增加计数器
        record.count += 1;
        debug!(client, count = record.count, limit = self.limit, "速率检查通过");

        RateLimitResult::Allowed(RateLimitSnapshot {
            limit: self.limit,
            remaining: self.limit - record.count,
            reset_at,
            retry_after_seconds,
        })
    }

    /// 清理过期记录（定期调用），返回清理后的记录数
    pub async fn cleanup_expired_records(&self) -> usize {
        self.cleanup_at(Utc::now()).await
    }

    /// 当前跟踪的客户端数
    pub async fn tracked_clients(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.write().await;
        let window = self.window;
        records.retain(|_, record| window_end(record.window_start, window) > now);
        debug!("🧹 清理速率限制记录，当前记录数: {}", records.len());
        records.len()
    }
}

/// 窗口结束时间，溢出时取可表示的最大时间
fn window_end(start: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    start
        .checked_add_signed(window)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// 全局速率限制服务实例
pub type SharedRateLimitService = Arc<RateLimitService>;

/// 后台定期清理过期窗口
pub fn spawn_cleanup_task(service: SharedRateLimitService, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // 第一次 tick 立即返回
        ticker.tick().await;
        loop {
            ticker.tick().await;
            service.cleanup_expired_records().await;
        }
    })
}
