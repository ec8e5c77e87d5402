//! 状态调和引擎
//!
//! 单设备串行的读改写核心：
//! - 读路径在令牌有效窗口内信任本地快照，省去云端往返
//! - 写路径：归一化补丁 -> 合并 -> 前置发布 -> 云端下发 -> 确认发布 -> 原子落库
//! - 设备同步与季节自动判定复用同一条写路径
//!
//! 串行化由引擎自有的按设备互斥锁实现，锁的获取是显式的第一步，
//! 覆盖完整的读改写周期；不同设备完全并行。

pub mod judgment;
pub mod normalize;

use crate::normalize::NormalizeContext;
use domain::{OperationMode, Status, StatusPatch};
use eolia_bus::StatePublisher;
use eolia_cloud::{CloudError, CloudGateway, OPERATION_TOKEN_LIFETIME_MS};
use eolia_codec::Property;
use eolia_storage::{DeviceRecord, StatusStore, StorageError};
use eolia_telemetry::{
    record_cloud_error, record_cloud_status_apply, record_cloud_status_fetch,
    record_reconcile_latency_ms, record_reconcile_noop, record_snapshot_cache_hit,
    record_state_publish_failure,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 引擎错误。
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("device not found: {0}")]
    NotFound(String),
    #[error("status cache inconsistent for device {device_id}: {detail}")]
    Consistency { device_id: String, detail: String },
    #[error("cloud error: {0}")]
    Cloud(#[from] CloudError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// 状态调和引擎。
pub struct ReconciliationEngine {
    store: Arc<dyn StatusStore>,
    cloud: Arc<dyn CloudGateway>,
    publisher: Arc<dyn StatePublisher>,
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn StatusStore>,
        cloud: Arc<dyn CloudGateway>,
        publisher: Arc<dyn StatePublisher>,
    ) -> Self {
        Self {
            store,
            cloud,
            publisher,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// 取得设备专属互斥锁。不同设备各自独立，互不阻塞。
    fn lock_for(&self, device_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(device_id.to_string()).or_default().clone()
    }

    /// 读取设备当前状态（读路径）。
    pub async fn get_status(&self, device_id: &str) -> Result<Status, EngineError> {
        let lock = self.lock_for(device_id);
        let _guard = lock.lock().await;
        self.get_status_locked(device_id).await
    }

    /// 锁内读路径。读穿得到的状态立即落库。
    async fn get_status_locked(&self, device_id: &str) -> Result<Status, EngineError> {
        let device = self
            .store
            .find_device(device_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(device_id.to_string()))?;
        let (status, from_cloud) = self.read_current(&device).await?;
        if from_cloud {
            self.store
                .upsert_snapshot(device_id, &status, now_epoch_ms())
                .await?;
        }
        Ok(status)
    }

    /// 读取当前权威状态。第二个返回值表示状态来自云端读穿且尚未落库；
    /// 写路径据此把落库推迟到下发结果确定之后，失败时存储保持原样。
    async fn read_current(&self, device: &DeviceRecord) -> Result<(Status, bool), EngineError> {
        let device_id = device.device_id.as_str();
        let now = now_epoch_ms();

        if device.token_valid_at(now) {
            // 令牌在有效期内只可能由本服务持有，快照即权威状态
            let snapshot = self.store.latest_snapshot(device_id).await?.ok_or_else(|| {
                EngineError::Consistency {
                    device_id: device_id.to_string(),
                    detail: "valid token but no snapshot".to_string(),
                }
            })?;
            if snapshot.data.operation_token != device.token {
                return Err(EngineError::Consistency {
                    device_id: device_id.to_string(),
                    detail: "snapshot token does not match device token".to_string(),
                });
            }
            record_snapshot_cache_hit();
            return Ok((snapshot.data, false));
        }

        // 令牌缺失或过期：云端读穿。纯读不铸造令牌。
        record_cloud_status_fetch();
        let mut status = match self.cloud.fetch_status(&device.appliance_id).await {
            Ok(status) => status,
            Err(err) => {
                record_cloud_error();
                return Err(err.into());
            }
        };
        status.appliance_id = device.appliance_id.clone();
        info!(
            target: "eolia.engine",
            device_id = %device_id,
            operation_mode = %status.operation_mode,
            operation_status = status.operation_status,
            "status_refreshed_from_cloud"
        );
        self.publish_full_state(device_id, &status).await;
        Ok((status, true))
    }

    /// 下发状态补丁（写路径）。
    pub async fn set_status(&self, device_id: &str, patch: StatusPatch) -> Result<(), EngineError> {
        if patch.is_empty() {
            return Ok(());
        }
        let lock = self.lock_for(device_id);
        let _guard = lock.lock().await;
        let started_at = Instant::now();

        let device = self
            .store
            .find_device(device_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(device_id.to_string()))?;
        let (current, current_from_cloud) = self.read_current(&device).await?;

        // 归一化规则所需的快照在锁内预取，规则链本身保持纯函数
        let ctx = NormalizeContext {
            mode_snapshot: match patch.operation_mode {
                Some(mode) if mode.supports_temperature() => self
                    .store
                    .latest_snapshot_for_modes(device_id, &[mode])
                    .await?
                    .map(|snapshot| snapshot.data),
                _ => None,
            },
            last_active_snapshot: if patch.operation_mode.is_none()
                && !current.operation_status
                && patch.operation_status == Some(true)
            {
                self.store
                    .latest_snapshot_for_modes(device_id, &OperationMode::ACTIVE)
                    .await?
                    .map(|snapshot| snapshot.data)
            } else {
                None
            },
        };

        let Some(normalized) = normalize::normalize(&current, patch, &ctx) else {
            self.record_noop(device_id, &current, current_from_cloud)
                .await?;
            return Ok(());
        };
        let update = normalized.merge_over(&current);
        if update == current {
            // 归一化后与当前状态一致：抑制多余的云端写与总线发布
            self.record_noop(device_id, &current, current_from_cloud)
                .await?;
            return Ok(());
        }

        // 云端写较慢，先把乐观状态推给订阅方
        self.publish_full_state(device_id, &update).await;

        record_cloud_status_apply();
        let applied = match self.cloud.apply_status(&update).await {
            Ok(applied) => applied,
            Err(err) => {
                record_cloud_error();
                return Err(err.into());
            }
        };
        self.publish_full_state(device_id, &applied).await;

        let now = now_epoch_ms();
        let mut device = device;
        device.token = applied.operation_token.clone();
        device.token_expire_ms = applied
            .operation_token
            .as_ref()
            .map(|_| now + OPERATION_TOKEN_LIFETIME_MS);
        self.store.commit_applied(&device, &applied, now).await?;
        info!(
            target: "eolia.engine",
            device_id = %device_id,
            operation_mode = %applied.operation_mode,
            operation_status = applied.operation_status,
            token_expire_ms = ?device.token_expire_ms,
            "status_applied"
        );
        record_reconcile_latency_ms(started_at.elapsed().as_millis() as u64);
        Ok(())
    }

    /// 写入被抑制时的收尾：读穿得到的状态此时才落库。
    async fn record_noop(
        &self,
        device_id: &str,
        current: &Status,
        current_from_cloud: bool,
    ) -> Result<(), EngineError> {
        if current_from_cloud {
            self.store
                .upsert_snapshot(device_id, current, now_epoch_ms())
                .await?;
        }
        record_reconcile_noop();
        Ok(())
    }

    /// 与云端账号同步设备登记。新设备读穿一次以播种快照。
    ///
    /// 逐设备写入，不包整体事务：中途失败时已处理的设备保持已更新，
    /// 重跑按 appliance_id find-or-create 收敛。
    pub async fn synchronize(&self) -> Result<(), EngineError> {
        let cloud_devices = match self.cloud.list_devices().await {
            Ok(devices) => devices,
            Err(err) => {
                record_cloud_error();
                return Err(err.into());
            }
        };
        for cloud_device in cloud_devices {
            match self
                .store
                .find_device_by_appliance(&cloud_device.appliance_id)
                .await?
            {
                Some(mut device) => {
                    if device.device_name != cloud_device.nickname {
                        device.device_name = cloud_device.nickname.clone();
                        self.store.save_device(&device).await?;
                    }
                }
                None => {
                    let device = DeviceRecord {
                        device_id: uuid::Uuid::new_v4().to_string(),
                        appliance_id: cloud_device.appliance_id.clone(),
                        device_name: cloud_device.nickname.clone(),
                        token: None,
                        token_expire_ms: None,
                    };
                    let device = self.store.create_device(device).await?;
                    info!(
                        target: "eolia.engine",
                        device_id = %device.device_id,
                        appliance_id = %device.appliance_id,
                        "device_registered"
                    );
                    self.get_status(&device.device_id).await?;
                }
            }
        }
        Ok(())
    }

    /// 季节自动判定。设备已开机时不做任何事。
    pub async fn automatic_judgment(&self, device_id: &str) -> Result<(), EngineError> {
        let current = self.get_status(device_id).await?;
        if current.operation_status {
            return Ok(());
        }
        let today = chrono::Local::now().date_naive();
        let Some(mode) = judgment::judge(today, current.inside_temp, current.inside_humidity)
        else {
            return Ok(());
        };
        info!(
            target: "eolia.engine",
            device_id = %device_id,
            operation_mode = %mode,
            inside_temp = current.inside_temp,
            inside_humidity = current.inside_humidity,
            "automatic_judgment_matched"
        );
        let patch = StatusPatch {
            operation_mode: Some(mode),
            ..StatusPatch::default()
        };
        self.set_status(device_id, patch).await
    }

    /// 逐属性发布完整状态。发布失败记日志后吞掉，不影响主流程。
    async fn publish_full_state(&self, device_id: &str, status: &Status) {
        for property in Property::ALL {
            let value = property.format(status);
            if let Err(err) = self
                .publisher
                .publish_state(device_id, property.as_str(), &value)
                .await
            {
                record_state_publish_failure();
                warn!(
                    target: "eolia.engine",
                    device_id = %device_id,
                    property = property.as_str(),
                    "state publish failed: {}",
                    err
                );
            }
        }
    }
}

fn now_epoch_ms() -> i64 {
    let now = std::time::SystemTime::now();
    let duration = now
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    duration.as_millis() as i64
}
