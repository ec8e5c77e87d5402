//! 设备命令 handlers
//!
//! - POST /devices/{id}/command/send - 下发状态补丁（202，异步执行）
//! - POST /devices/{id}/command/auto - 季节自动判定（202，异步执行）
//!
//! 云端写较慢，接口先回 202，由后台任务走引擎写路径；
//! 执行失败只记日志，结果通过总线状态与设备详情观察。

use crate::AppState;
use crate::handlers::devices::DevicePath;
use crate::middleware::require_api_key;
use crate::utils::response::{bad_request_error, not_found_error, storage_error};
use api_contract::{ApiResponse, SendCommandRequest};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

/// 下发状态补丁。
pub async fn send_command(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    headers: HeaderMap,
    Json(req): Json<SendCommandRequest>,
) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }
    if req.patch.is_empty() {
        return bad_request_error("empty command");
    }
    if let Err(message) = req.patch.validate() {
        return bad_request_error(message);
    }
    match state.store.find_device(&path.device_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    }
    let engine = state.engine.clone();
    let device_id = path.device_id.clone();
    tokio::spawn(async move {
        if let Err(err) = engine.set_status(&device_id, req.patch).await {
            warn!(
                target: "eolia.api",
                device_id = %device_id,
                "async command failed: {}",
                err
            );
        }
    });
    (StatusCode::ACCEPTED, Json(ApiResponse::success(()))).into_response()
}

/// 触发季节自动判定。
pub async fn auto_judgment(
    State(state): State<AppState>,
    Path(path): Path<DevicePath>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) = require_api_key(&state, &headers) {
        return response;
    }
    match state.store.find_device(&path.device_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found_error(),
        Err(err) => return storage_error(err),
    }
    let engine = state.engine.clone();
    let device_id = path.device_id.clone();
    tokio::spawn(async move {
        if let Err(err) = engine.automatic_judgment(&device_id).await {
            warn!(
                target: "eolia.api",
                device_id = %device_id,
                "automatic judgment failed: {}",
                err
            );
        }
    });
    (StatusCode::ACCEPTED, Json(ApiResponse::success(()))).into_response()
}
