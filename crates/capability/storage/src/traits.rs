//! 存储接口 Trait 定义
//!
//! `StatusStore`：设备登记 + 状态快照的统一接口。
//!
//! 设计原则：
//! - 所有接口返回 `StorageError`
//! - 使用 async_trait 支持动态分发
//! - 快照 upsert 以状态自身的模式字段为键，不接受外部传入的键
//! - 不提供行锁：按设备互斥由引擎显式持有（锁与读取是两个独立步骤）

use crate::error::StorageError;
use crate::models::{DeviceRecord, StatusSnapshotRecord};
use async_trait::async_trait;
use domain::{OperationMode, Status};

/// 设备与快照存储接口。
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// 列出全部登记设备。
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError>;

    /// 按内部 ID 查找设备。
    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError>;

    /// 按云端机器 ID 查找设备（同步时的 find-or-create 用）。
    async fn find_device_by_appliance(
        &self,
        appliance_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError>;

    /// 登记新设备。
    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError>;

    /// 保存设备（名称、令牌等字段的整体覆盖）。
    async fn save_device(&self, record: &DeviceRecord) -> Result<(), StorageError>;

    /// 删除设备，并级联删除其全部快照。
    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError>;

    /// 以 `status.operation_mode` 为键 upsert 快照。
    async fn upsert_snapshot(
        &self,
        device_id: &str,
        status: &Status,
        updated_at_ms: i64,
    ) -> Result<(), StorageError>;

    /// 该设备全模式中最近更新的快照。
    async fn latest_snapshot(
        &self,
        device_id: &str,
    ) -> Result<Option<StatusSnapshotRecord>, StorageError>;

    /// 限定模式集合中最近更新的快照。
    async fn latest_snapshot_for_modes(
        &self,
        device_id: &str,
        modes: &[OperationMode],
    ) -> Result<Option<StatusSnapshotRecord>, StorageError>;

    /// 云端写入成功后的原子提交：保存设备（新令牌 + 过期时刻）并
    /// upsert 确认状态的快照。任一步失败则整体不生效。
    async fn commit_applied(
        &self,
        device: &DeviceRecord,
        status: &Status,
        updated_at_ms: i64,
    ) -> Result<(), StorageError>;
}
