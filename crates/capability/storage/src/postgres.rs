//! Postgres 存储实现
//!
//! 设计要点：
//! - 所有 SQL 参数化
//! - 快照以 JSONB 落库，模式列与 JSON 内的模式字段保持一致（写入方保证）
//! - `commit_applied` 在单事务内保存设备与快照，失败整体回滚
//!
//! 期望的表结构：
//!
//! ```sql
//! create table devices (
//!   device_id       text primary key,
//!   appliance_id    text not null unique,
//!   device_name     text not null,
//!   token           text,
//!   token_expire_ms bigint
//! );
//!
//! create table status_snapshots (
//!   device_id      text not null references devices (device_id) on delete cascade,
//!   operation_mode varchar(30) not null,
//!   data           jsonb not null,
//!   updated_at_ms  bigint not null,
//!   primary key (device_id, operation_mode)
//! );
//! ```

use crate::error::StorageError;
use crate::models::{DeviceRecord, StatusSnapshotRecord};
use crate::traits::StatusStore;
use async_trait::async_trait;
use domain::{OperationMode, Status};
use sqlx::{PgPool, Row};

pub struct PgStatusStore {
    pub pool: PgPool,
}

impl PgStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }
}

fn device_from_row(row: &sqlx::postgres::PgRow) -> Result<DeviceRecord, StorageError> {
    Ok(DeviceRecord {
        device_id: row.try_get("device_id")?,
        appliance_id: row.try_get("appliance_id")?,
        device_name: row.try_get("device_name")?,
        token: row.try_get("token")?,
        token_expire_ms: row.try_get("token_expire_ms")?,
    })
}

fn snapshot_from_row(row: &sqlx::postgres::PgRow) -> Result<StatusSnapshotRecord, StorageError> {
    let mode_name: String = row.try_get("operation_mode")?;
    let operation_mode = OperationMode::from_name(&mode_name)
        .ok_or_else(|| StorageError::new(format!("unknown operation_mode: {mode_name}")))?;
    let data: serde_json::Value = row.try_get("data")?;
    Ok(StatusSnapshotRecord {
        device_id: row.try_get("device_id")?,
        operation_mode,
        data: serde_json::from_value(data)?,
        updated_at_ms: row.try_get("updated_at_ms")?,
    })
}

#[async_trait]
impl StatusStore for PgStatusStore {
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, StorageError> {
        let rows = sqlx::query(
            "select device_id, appliance_id, device_name, token, token_expire_ms \
             from devices order by device_id",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut devices = Vec::with_capacity(rows.len());
        for row in rows {
            devices.push(device_from_row(&row)?);
        }
        Ok(devices)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query(
            "select device_id, appliance_id, device_name, token, token_expire_ms \
             from devices where device_id = $1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(device_from_row(&row)?))
    }

    async fn find_device_by_appliance(
        &self,
        appliance_id: &str,
    ) -> Result<Option<DeviceRecord>, StorageError> {
        let row = sqlx::query(
            "select device_id, appliance_id, device_name, token, token_expire_ms \
             from devices where appliance_id = $1",
        )
        .bind(appliance_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(device_from_row(&row)?))
    }

    async fn create_device(&self, record: DeviceRecord) -> Result<DeviceRecord, StorageError> {
        sqlx::query(
            "insert into devices (device_id, appliance_id, device_name, token, token_expire_ms) \
             values ($1, $2, $3, $4, $5)",
        )
        .bind(&record.device_id)
        .bind(&record.appliance_id)
        .bind(&record.device_name)
        .bind(&record.token)
        .bind(record.token_expire_ms)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn save_device(&self, record: &DeviceRecord) -> Result<(), StorageError> {
        let result = sqlx::query(
            "update devices set \
             appliance_id = $1, device_name = $2, token = $3, token_expire_ms = $4 \
             where device_id = $5",
        )
        .bind(&record.appliance_id)
        .bind(&record.device_name)
        .bind(&record.token)
        .bind(record.token_expire_ms)
        .bind(&record.device_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::new("device not found"));
        }
        Ok(())
    }

    async fn delete_device(&self, device_id: &str) -> Result<bool, StorageError> {
        // 快照由外键 on delete cascade 连带删除
        let result = sqlx::query("delete from devices where device_id = $1")
            .bind(device_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_snapshot(
        &self,
        device_id: &str,
        status: &Status,
        updated_at_ms: i64,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_value(status)?;
        sqlx::query(
            "insert into status_snapshots (device_id, operation_mode, data, updated_at_ms) \
             values ($1, $2, $3, $4) \
             on conflict (device_id, operation_mode) \
             do update set data = excluded.data, updated_at_ms = excluded.updated_at_ms",
        )
        .bind(device_id)
        .bind(status.operation_mode.as_str())
        .bind(&data)
        .bind(updated_at_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        device_id: &str,
    ) -> Result<Option<StatusSnapshotRecord>, StorageError> {
        let row = sqlx::query(
            "select device_id, operation_mode, data, updated_at_ms \
             from status_snapshots where device_id = $1 \
             order by updated_at_ms desc limit 1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(snapshot_from_row(&row)?))
    }

    async fn latest_snapshot_for_modes(
        &self,
        device_id: &str,
        modes: &[OperationMode],
    ) -> Result<Option<StatusSnapshotRecord>, StorageError> {
        let mode_names: Vec<String> = modes.iter().map(|mode| mode.as_str().to_string()).collect();
        let row = sqlx::query(
            "select device_id, operation_mode, data, updated_at_ms \
             from status_snapshots where device_id = $1 and operation_mode = any($2) \
             order by updated_at_ms desc limit 1",
        )
        .bind(device_id)
        .bind(&mode_names)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(snapshot_from_row(&row)?))
    }

    async fn commit_applied(
        &self,
        device: &DeviceRecord,
        status: &Status,
        updated_at_ms: i64,
    ) -> Result<(), StorageError> {
        let data = serde_json::to_value(status)?;
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "update devices set \
             appliance_id = $1, device_name = $2, token = $3, token_expire_ms = $4 \
             where device_id = $5",
        )
        .bind(&device.appliance_id)
        .bind(&device.device_name)
        .bind(&device.token)
        .bind(device.token_expire_ms)
        .bind(&device.device_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::new("device not found"));
        }
        sqlx::query(
            "insert into status_snapshots (device_id, operation_mode, data, updated_at_ms) \
             values ($1, $2, $3, $4) \
             on conflict (device_id, operation_mode) \
             do update set data = excluded.data, updated_at_ms = excluded.updated_at_ms",
        )
        .bind(&device.device_id)
        .bind(status.operation_mode.as_str())
        .bind(&data)
        .bind(updated_at_ms)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
