//! 路由定义
//!
//! 集中管理所有 API 路由，将路径映射到对应的 handlers。
//! 路由包括：
//! - 健康检查：/health（免认证）
//! - 指标：/metrics
//! - 设备：/devices/*
//! - 命令：/command/sync, /devices/{id}/command/*

use super::AppState;
use super::handlers::*;
use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};

/// 创建 API 路由
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(get_metrics))
        .route("/devices", get(list_devices))
        .route("/devices/:device_id", get(get_device).delete(delete_device))
        .route("/command/sync", put(sync_devices))
        .route("/devices/:device_id/command/send", post(send_command))
        .route("/devices/:device_id/command/auto", post(auto_judgment))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
