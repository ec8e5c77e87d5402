//! 数据模型
//!
//! - 设备模型：`DeviceRecord`（登记信息 + 云端操作令牌）
//! - 快照模型：`StatusSnapshotRecord`（每（设备, 模式）一行的最近状态）

use domain::{OperationMode, Status};

/// 设备记录。
///
/// `token` / `token_expire_ms` 仅在云端写入成功后由对账引擎更新；
/// 令牌在有效期内时本地快照可信，读取无需访问云端。
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRecord {
    /// 内部设备 ID（UUID）。
    pub device_id: String,
    /// 云端侧机器 ID（唯一）。
    pub appliance_id: String,
    /// 显示名称（云端 nickname，同步时更新）。
    pub device_name: String,
    /// 云端操作令牌。
    pub token: Option<String>,
    /// 令牌过期时刻（epoch 毫秒）。
    pub token_expire_ms: Option<i64>,
}

impl DeviceRecord {
    /// 令牌在指定时刻是否有效（非空且严格未过期）。
    pub fn token_valid_at(&self, now_ms: i64) -> bool {
        match (&self.token, self.token_expire_ms) {
            (Some(token), Some(expire_ms)) => !token.is_empty() && expire_ms > now_ms,
            _ => false,
        }
    }
}

/// 状态快照记录。
///
/// 键为（device_id, operation_mode），模式取自状态自身的模式字段，
/// 因此写入总是落在"该状态所处模式的那一行"。
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshotRecord {
    pub device_id: String,
    pub operation_mode: OperationMode,
    pub data: Status,
    pub updated_at_ms: i64,
}
