//! Prometheus 指标注册表
//!
//! 进程内只创建一次，通过 [`HttpMetrics`] 句柄共享给中间件和 `/metrics` 处理器。

use std::sync::Arc;

use prometheus::proto::Metric;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};

/// 请求耗时直方图的分桶（秒）
pub const DURATION_BUCKETS: [f64; 11] = [0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

const LABELS: [&str; 3] = ["method", "route", "status_code"];

/// 共享的 HTTP 指标句柄
#[derive(Clone)]
pub struct HttpMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    request_duration: HistogramVec,
    requests_total: IntCounterVec,
}

impl std::fmt::Debug for HttpMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMetrics").finish_non_exhaustive()
    }
}

impl HttpMetrics {
    /// 创建全新的注册表并注册 HTTP 指标
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let request_duration = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds")
                .buckets(DURATION_BUCKETS.to_vec()),
            &LABELS,
        )?;
        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests"),
            &LABELS,
        )?;

        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(requests_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                request_duration,
                requests_total,
            }),
        })
    }

    /// 记录一次完成的请求
    pub fn record(&self, method: &str, route: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        let labels = [method, route, status.as_str()];

        self.inner
            .request_duration
            .with_label_values(&labels)
            .observe(duration_secs);
        self.inner.requests_total.with_label_values(&labels).inc();
    }

    /// 指定标签组合的请求计数
    pub fn request_count(&self, method: &str, route: &str, status: u16) -> u64 {
        self.find("http_requests_total", method, route, status)
            .map(|metric| metric.get_counter().get_value() as u64)
            .unwrap_or(0)
    }

    /// 指定标签组合的耗时样本数
    pub fn duration_sample_count(&self, method: &str, route: &str, status: u16) -> u64 {
        self.find("http_request_duration_seconds", method, route, status)
            .map(|metric| metric.get_histogram().get_sample_count())
            .unwrap_or(0)
    }

    /// 所有标签组合的请求总数
    pub fn total_requests(&self) -> u64 {
        self.inner
            .registry
            .gather()
            .iter()
            .filter(|family| family.get_name() == "http_requests_total")
            .flat_map(|family| family.get_metric())
            .map(|metric| metric.get_counter().get_value() as u64)
            .sum()
    }

    // 只读查找，不会顺带创建新的时间序列
    fn find(&self, name: &str, method: &str, route: &str, status: u16) -> Option<Metric> {
        let status = status.to_string();
        let wanted = [("method", method), ("route", route), ("status_code", status.as_str())];

        self.inner
            .registry
            .gather()
            .into_iter()
            .filter(|family| family.get_name() == name)
            .flat_map(|family| family.get_metric().to_vec())
            .find(|metric| {
                wanted.iter().all(|(key, value)| {
                    metric
                        .get_label()
                        .iter()
                        .any(|pair| pair.get_name() == *key && pair.get_value() == *value)
                })
            })
    }

    /// 以 Prometheus 文本格式导出
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.inner.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    /// 导出内容的 Content-Type
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }
}
