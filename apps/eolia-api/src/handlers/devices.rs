//! 设备 handlers
//!
//! - GET /devices - 列出登记设备
//! - GET /devices/{id} - 设备详情（含当前状态与最近运转模式）
//! - DELETE /devices/{id} - 删除设备（连带快照）
//! - PUT /command/sync - 与云端账号同步设备登记

use crate::AppState;
use crate::middleware::require_api_key;
use crate::utils::response::{device_to_dto, engine_error, not_found_error, storage_error};
use api_contract::{ApiResponse, DeviceDetailDto, DeviceDto};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use domain::OperationMode;

#[derive(serde::Deserialize)]
pub struct DevicePath {
    pub device_id: String,
}

/// 列出全部登记设备。
pub async fn list_devices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }
    match state.store.list_devices().await {
        Ok(items) => {
            let data: Vec<DeviceDto> = items.into_iter().map(device_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
        }
        Err(err) => storage_error(err),
    }
}

/// 设备详情：登记信息 + 引擎读路径的当前状态 + 最近一次运转中的模式。
pub async fn get_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }
    let device = match state.store.find_device(&path.device_id).await {
        Ok(Some(device)) => device,
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    };
    let status = match state.engine.get_status(&path.device_id).await {
        Ok(status) => status,
        Err(err) => return engine_error(err),
    };
    let last_active_mode = match state
        .store
        .latest_snapshot_for_modes(&path.device_id, &OperationMode::ACTIVE)
        .await
    {
        Ok(snapshot) => snapshot.map(|snapshot| snapshot.operation_mode),
        Err(err) => return storage_error(err),
    };
    let detail = DeviceDetailDto {
        device_id: device.device_id,
        appliance_id: device.appliance_id,
        device_name: device.device_name,
        status,
        last_active_mode,
    };
    (StatusCode::OK, Json(ApiResponse::success(detail))).into_response()
}

/// 删除设备，快照连带删除。
pub async fn delete_device(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }
    match state.store.delete_device(&path.device_id).await {
        Ok(true) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Ok(false) => not_found_error(),
        Err(err) => storage_error(err),
    }
}

/// 与云端账号同步设备登记。
pub async fn sync_devices(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }
    match state.engine.synchronize().await {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(()))).into_response(),
        Err(err) => engine_error(err),
    }
}
