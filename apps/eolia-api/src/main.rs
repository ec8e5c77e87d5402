//! eolia-api 启动入口
//!
//! 装配顺序：配置 -> 日志 -> 存储 -> 云端登录 -> MQTT 总线 -> 调和引擎
//! -> 命令监听 -> 定时读穿刷新 -> HTTP 服务。

mod bridge;
mod handlers;
mod middleware;
mod routes;
mod utils;

use axum::middleware as axum_middleware;
use eolia_bus::{
    MqttBus, MqttBusConfig, MqttCommandListenerConfig, NoopPublisher, StatePublisher,
    spawn_command_listener,
};
use eolia_cloud::EoliaClient;
use eolia_config::AppConfig;
use eolia_engine::ReconciliationEngine;
use eolia_storage::{InMemoryStatusStore, PgStatusStore, StatusStore};
use eolia_telemetry::init_tracing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReconciliationEngine>,
    pub store: Arc<dyn StatusStore>,
    pub api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    // 存储：配置了数据库则用 Postgres，否则退回内存存储
    let store: Arc<dyn StatusStore> = match &config.database_url {
        Some(database_url) => Arc::new(PgStatusStore::connect(database_url).await?),
        None => {
            warn!(target: "eolia.api", "EOLIA_DATABASE_URL not set, using in-memory store");
            Arc::new(InMemoryStatusStore::new())
        }
    };

    // 云端客户端：启动时登录一次建立会话
    let cloud = Arc::new(EoliaClient::new(
        config.eolia_user_id.clone(),
        config.eolia_password.clone(),
    )?);
    cloud.login().await?;

    // MQTT 总线：发布器 + 命令监听
    let publisher: Arc<dyn StatePublisher> = if config.mqtt_enabled {
        let (bus, _eventloop) = MqttBus::connect(MqttBusConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            topic_base: config.mqtt_topic_base.clone(),
            qos: config.mqtt_qos,
        })?;
        Arc::new(bus)
    } else {
        warn!(target: "eolia.api", "mqtt disabled, state publishes are dropped");
        Arc::new(NoopPublisher)
    };

    let engine = Arc::new(ReconciliationEngine::new(
        store.clone(),
        cloud.clone(),
        publisher,
    ));

    if config.mqtt_enabled {
        let sink = Arc::new(bridge::EngineCommandSink::new(
            engine.clone(),
            store.clone(),
        ));
        let _listener = spawn_command_listener(
            MqttCommandListenerConfig {
                host: config.mqtt_host.clone(),
                port: config.mqtt_port,
                username: config.mqtt_username.clone(),
                password: config.mqtt_password.clone(),
                topic_base: config.mqtt_topic_base.clone(),
                qos: config.mqtt_qos,
            },
            sink,
        );
    }

    spawn_refresh_task(
        engine.clone(),
        store.clone(),
        config.refresh_interval_seconds,
    );

    let state = AppState {
        engine,
        store,
        api_key: config.api_key.clone(),
    };

    let app = routes::create_api_router()
        .with_state(state)
        // 注入 request_id/trace_id
        .layer(axum_middleware::from_fn(middleware::request_context));

    info!(target: "eolia.api", addr = %config.http_addr, "http server starting");
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// 定时对全部登记设备做读穿刷新。令牌仍有效的设备直接命中快照。
fn spawn_refresh_task(
    engine: Arc<ReconciliationEngine>,
    store: Arc<dyn StatusStore>,
    interval_seconds: u64,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        // interval 的第一拍立即到期，跳过以避免与启动流程抢占
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let devices = match store.list_devices().await {
                Ok(devices) => devices,
                Err(err) => {
                    warn!(target: "eolia.api", "refresh device list failed: {}", err);
                    continue;
                }
            };
            for device in devices {
                if let Err(err) = engine.get_status(&device.device_id).await {
                    warn!(
                        target: "eolia.api",
                        device_id = %device.device_id,
                        "scheduled refresh failed: {}",
                        err
                    );
                }
            }
        }
    });
}
