//! 追踪与基础指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub cloud_status_fetches: u64,
    pub cloud_status_applies: u64,
    pub cloud_errors: u64,
    pub snapshot_cache_hits: u64,
    pub state_publish_success: u64,
    pub state_publish_failure: u64,
    pub commands_received: u64,
    pub commands_dropped: u64,
    pub reconcile_noops: u64,
    pub reconcile_latency_ms_total: u64,
    pub reconcile_latency_ms_count: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    cloud_status_fetches: AtomicU64,
    cloud_status_applies: AtomicU64,
    cloud_errors: AtomicU64,
    snapshot_cache_hits: AtomicU64,
    state_publish_success: AtomicU64,
    state_publish_failure: AtomicU64,
    commands_received: AtomicU64,
    commands_dropped: AtomicU64,
    reconcile_noops: AtomicU64,
    reconcile_latency_ms_total: AtomicU64,
    reconcile_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            cloud_status_fetches: AtomicU64::new(0),
            cloud_status_applies: AtomicU64::new(0),
            cloud_errors: AtomicU64::new(0),
            snapshot_cache_hits: AtomicU64::new(0),
            state_publish_success: AtomicU64::new(0),
            state_publish_failure: AtomicU64::new(0),
            commands_received: AtomicU64::new(0),
            commands_dropped: AtomicU64::new(0),
            reconcile_noops: AtomicU64::new(0),
            reconcile_latency_ms_total: AtomicU64::new(0),
            reconcile_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cloud_status_fetches: self.cloud_status_fetches.load(Ordering::Relaxed),
            cloud_status_applies: self.cloud_status_applies.load(Ordering::Relaxed),
            cloud_errors: self.cloud_errors.load(Ordering::Relaxed),
            snapshot_cache_hits: self.snapshot_cache_hits.load(Ordering::Relaxed),
            state_publish_success: self.state_publish_success.load(Ordering::Relaxed),
            state_publish_failure: self.state_publish_failure.load(Ordering::Relaxed),
            commands_received: self.commands_received.load(Ordering::Relaxed),
            commands_dropped: self.commands_dropped.load(Ordering::Relaxed),
            reconcile_noops: self.reconcile_noops.load(Ordering::Relaxed),
            reconcile_latency_ms_total: self.reconcile_latency_ms_total.load(Ordering::Relaxed),
            reconcile_latency_ms_count: self.reconcile_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录云端状态读取次数。
pub fn record_cloud_status_fetch() {
    metrics()
        .cloud_status_fetches
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录云端状态下发次数。
pub fn record_cloud_status_apply() {
    metrics()
        .cloud_status_applies
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录云端调用失败次数。
pub fn record_cloud_error() {
    metrics().cloud_errors.fetch_add(1, Ordering::Relaxed);
}

/// 记录令牌窗口内快照命中次数（省去一次云端调用）。
pub fn record_snapshot_cache_hit() {
    metrics()
        .snapshot_cache_hits
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录状态发布成功次数（MQTT 发布成功）。
pub fn record_state_publish_success() {
    metrics()
        .state_publish_success
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录状态发布失败次数（MQTT 发布失败）。
pub fn record_state_publish_failure() {
    metrics()
        .state_publish_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录收到的设备命令次数。
pub fn record_command_received() {
    metrics().commands_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录丢弃的设备命令次数（未知属性 / 非法取值 / 未登记设备）。
pub fn record_command_dropped() {
    metrics().commands_dropped.fetch_add(1, Ordering::Relaxed);
}

/// 记录归一化后与当前状态相同而跳过下发的次数。
pub fn record_reconcile_noop() {
    metrics().reconcile_noops.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次状态下发的端到端耗时（毫秒，含归一化+云端+落库）。
pub fn record_reconcile_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .reconcile_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .reconcile_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
