//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：auth_error, bad_request_error, not_found_error,
//!   storage_error, engine_error
//! - DTO 转换：device_to_dto

use api_contract::{ApiResponse, DeviceDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eolia_engine::EngineError;
use eolia_storage::{DeviceRecord, StorageError};

/// 认证错误响应
pub fn auth_error() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(
            "AUTH.UNAUTHORIZED",
            "unauthorized",
        )),
    )
        .into_response()
}

/// 错误请求响应
pub fn bad_request_error(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::<()>::error("INVALID.REQUEST", message.into())),
    )
        .into_response()
}

/// 资源未找到错误响应
pub fn not_found_error() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("RESOURCE.NOT_FOUND", "not found")),
    )
        .into_response()
}

/// 存储错误响应
pub fn storage_error(err: StorageError) -> Response {
    let message = err.to_string();
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::<()>::error("INTERNAL.ERROR", message)),
    )
        .into_response()
}

/// 引擎错误响应。缓存不一致不做自动修复，原样暴露给调用方。
pub fn engine_error(err: EngineError) -> Response {
    let (status, code) = match &err {
        EngineError::NotFound(_) => (StatusCode::NOT_FOUND, "RESOURCE.NOT_FOUND"),
        EngineError::Consistency { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CACHE.INCONSISTENT")
        }
        EngineError::Cloud(_) => (StatusCode::BAD_GATEWAY, "CLOUD.ERROR"),
        EngineError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL.ERROR"),
    };
    let message = err.to_string();
    (status, Json(ApiResponse::<()>::error(code, message))).into_response()
}

/// DeviceRecord 转 DeviceDto
pub fn device_to_dto(record: DeviceRecord) -> DeviceDto {
    DeviceDto {
        device_id: record.device_id,
        appliance_id: record.appliance_id,
        device_name: record.device_name,
    }
}
