//! 稳定的 DTO 与 API 响应契约。

use domain::{OperationMode, Status, StatusPatch};
use serde::{Deserialize, Serialize};

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 设备列表项。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDto {
    pub device_id: String,
    pub appliance_id: String,
    pub device_name: String,
}

/// 设备详情：登记信息 + 当前状态 + 最近一次运转中的模式。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailDto {
    pub device_id: String,
    pub appliance_id: String,
    pub device_name: String,
    pub status: Status,
    pub last_active_mode: Option<OperationMode>,
}

/// 指标快照返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
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

/// 设备命令请求体：对可控字段的稀疏补丁。
#[derive(Debug, Deserialize)]
pub struct SendCommandRequest {
    #[serde(flatten)]
    pub patch: StatusPatch,
}
