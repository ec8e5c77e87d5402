//! 内存存储实现
//!
//! 仅用于测试与本地运行。
//!
//! 使用 RwLock + HashMap 提供线程安全的内存存储。快照按写入序号排序，
//! 避免同一毫秒内多次写入导致"最近快照"歧义。

use crate::error::StorageError;
use crate::models::{DeviceRecord, StatusSnapshotRecord};
use crate::traits::StatusStore;
use async_trait::async_trait;
use domain::{OperationMode, Status};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicI64, Ordering};

struct SnapshotRow {
    record: StatusSnapshotRecord,
    seq: i64,
}

/// 设备 + 快照内存存储。
pub struct InMemoryStatusStore {
    devices: RwLock<HashMap<String, DeviceRecord>>,
    snapshots: RwLock<HashMap<(String, OperationMode), SnapshotRow>>,
    seq: AtomicI64,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(HashMap::new()),
            seq: AtomicI64::new(0),
        }
    }

    fn next_seq(&self) -> i64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let mut devices: Vec<DeviceRecord> = self
            .devices
            .read()
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let device = self
            .devices
            .read()
            .ok()
            .and_then(|map| map.get(device_id).cloned());
        Ok(device)
    }

    async fn find_device_by_appliance(
        &self,
        appliance_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let device = self.devices.read().ok().and_then(|map| {
            map.values()
                .find(|item| item.appliance_id == appliance_id)
                .cloned()
        });
        Ok(device)
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if map.contains_key(&record.device_id) {
            return Err(StorageError::new("device exists"));
        }
        if map
            .values()
            .any(|item| item.appliance_id == record.appliance_id)
        {
            return Err(StorageError::new("appliance already registered"));
        }
        map.insert(record.device_id.clone(), record.clone());
        Ok(record)
    }

    async fn save_device(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        match map.get_mut(&record.device_id) {
            Some(device) => {
                *device = record.clone();
                Ok(())
            }
            None => Err(StorageError::new("device not found")),
        }
    }

    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError> {
        let mut devices = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        if devices.remove(device_id).is_none() {
            return Ok(false);
        }
        // 快照级联删除
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        snapshots.retain(|(id, _), _| id != device_id);
        Ok(true)
    }

    async fn upsert_snapshot(
        &self,
        device_id: &str,
        status: &Status,
        updated_at_ms: i64,
    ) -> Result<(), StorageError> {
        let mut snapshots = self
            .snapshots
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let key = (device_id.to_string(), status.operation_mode);
        snapshots.insert(
            key,
            SnapshotRow {
                record: StatusSnapshotRecord {
                    device_id: device_id.to_string(),
                    operation_mode: status.operation_mode,
                    data: status.clone(),
                    updated_at_ms,
                },
                seq: self.next_seq(),
            },
        );
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        device_id: &str,
    ) -> Result<Option<StatusSnapshotRecord>, StorageError> {
        let snapshot = self
            .snapshots
            .read()
            .ok()
            .and_then(|map| {
                map.values()
                    .filter(|row| row.record.device_id == device_id)
                    .max_by_key(|row| row.seq)
                    .map(|row| row.record.clone())
            });
        Ok(snapshot)
    }

    async fn latest_snapshot_for_modes(
        &self,
        device_id: &str,
        modes: &[OperationMode],
    ) -> Result<Option<StatusSnapshotRecord>, StorageError> {
        let snapshot = self
            .snapshots
            .read()
            .ok()
            .and_then(|map| {
                map.values()
                    .filter(|row| {
                        row.record.device_id == device_id
                            && modes.contains(&row.record.operation_mode)
                    })
                    .max_by_key(|row| row.seq)
                    .map(|row| row.record.clone())
            });
        Ok(snapshot)
    }

    async fn commit_applied(
        &self,
        device: &DeviceRecord,
        status: &Status,
        updated_at_ms: i64,
    ) -> Result<(), StorageError> {
        // 内存实现中两次写都在进程内完成；先校验设备存在再写，
        // 保证与 Postgres 实现同样的"失败不留半写"语义。
        {
            let map = self
                .devices
                .read()
                .map_err(|_| StorageError::new("lock failed"))?;
            if !map.contains_key(&device.device_id) {
                return Err(StorageError::new("device not found"));
            }
        }
        self.save_device(device).await?;
        self.upsert_snapshot(&device.device_id, status, updated_at_ms)
            .await
    }
}
