//! MQTT 状态总线
//!
//! 主题约定（`{base}` 默认 `eolia-web-api`）：
//! - 出站：`{base}/{device_id}/{property}/get`，retained，供面板订阅
//! - 入站：`{base}/{device_id}/{property}/set`，面板写入的命令
//!
//! 出站发布由 [`StatePublisher`] 抽象，入站命令经 [`spawn_command_listener`]
//! 转交给 [`CommandSink`]（由应用侧桥接到状态引擎）。

use async_trait::async_trait;
use eolia_telemetry::{record_command_received, record_state_publish_success};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TOPIC_BASE: &str = "eolia-web-api";

/// 总线错误。
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("publish error: {0}")]
    Publish(String),
    #[error("subscribe error: {0}")]
    Subscribe(String),
}

/// 状态发布抽象。测试中以记录桩替换。
#[async_trait]
pub trait StatePublisher: Send + Sync {
    /// 发布单个属性的当前值。
    async fn publish_state(
        &self,
        device_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), BusError>;
}

/// 空发布器（本地运行时无 broker 可用）。
#[derive(Debug, Default)]
pub struct NoopPublisher;

#[async_trait]
impl StatePublisher for NoopPublisher {
    async fn publish_state(
        &self,
        _device_id: &str,
        _property: &str,
        _value: &str,
    ) -> Result<(), BusError> {
        Ok(())
    }
}

/// 入站命令处理抽象。由应用侧实现，负责解码 + 触发状态下发。
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn handle_command(&self, device_id: &str, property: &str, payload: &str);
}

/// MQTT 总线配置。
#[derive(Debug, Clone)]
pub struct MqttBusConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_base: String,
    pub qos: u8,
}

/// MQTT 总线实现（发布面板状态）。
#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    topic_base: String,
    qos: QoS,
}

impl MqttBus {
    pub fn connect(config: MqttBusConfig) -> Result<(Self, tokio::task::JoinHandle<()>), BusError> {
        let client_id = format!("eolia-bus-publish-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let handle = tokio::spawn(async move {
            loop {
                if let Err(err) = eventloop.poll().await {
                    warn!(target: "eolia.bus", "mqtt publish eventloop error: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        });
        Ok((
            Self {
                client,
                topic_base: config.topic_base,
                qos: qos_from_u8(config.qos),
            },
            handle,
        ))
    }

    fn topic_for(&self, device_id: &str, property: &str) -> String {
        let base = self.topic_base.trim_end_matches('/');
        format!("{base}/{device_id}/{property}/get")
    }
}

#[async_trait]
impl StatePublisher for MqttBus {
    async fn publish_state(
        &self,
        device_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), BusError> {
        let topic = self.topic_for(device_id, property);
        // retained：面板重连后立即拿到最近一次状态
        self.client
            .publish(topic, self.qos, true, value.as_bytes())
            .await
            .map_err(|err| BusError::Publish(err.to_string()))?;
        record_state_publish_success();
        Ok(())
    }
}

/// MQTT 命令监听配置。
#[derive(Debug, Clone)]
pub struct MqttCommandListenerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_base: String,
    pub qos: u8,
}

pub fn spawn_command_listener(
    config: MqttCommandListenerConfig,
    sink: Arc<dyn CommandSink>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let client_id = format!("eolia-bus-command-{}", uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, config.host, config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) = (config.username, config.password) {
            options.set_credentials(username, password);
        }
        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let topic = format!("{}/+/+/set", config.topic_base.trim_end_matches('/'));
        if let Err(err) = client.subscribe(topic, qos_from_u8(config.qos)).await {
            warn!(target: "eolia.bus", "mqtt command subscribe error: {}", err);
            return;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Some((device_id, property)) =
                        extract_command_scope(&config.topic_base, &publish.topic)
                    else {
                        warn!(target: "eolia.bus", "command topic skipped: {}", publish.topic);
                        continue;
                    };
                    let payload = match std::str::from_utf8(&publish.payload) {
                        Ok(text) => text.trim().to_string(),
                        Err(err) => {
                            warn!(target: "eolia.bus", "command payload not utf-8: {}", err);
                            continue;
                        }
                    };
                    record_command_received();
                    info!(
                        target: "eolia.bus",
                        device_id = %device_id,
                        property = %property,
                        payload = %payload,
                        "command_received"
                    );
                    sink.handle_command(&device_id, &property, &payload).await;
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "eolia.bus", "mqtt command eventloop error: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    })
}

/// 从命令主题解析 device_id 与 property。
///
/// 主题必须正好是 `{base}/{device_id}/{property}/set`，多余或缺失的段一律拒绝。
fn extract_command_scope(base: &str, topic: &str) -> Option<(String, String)> {
    let base = base.trim_matches('/');
    let topic = topic.trim_matches('/');
    let rest = if base.is_empty() {
        topic
    } else {
        topic.strip_prefix(base)?
    };
    let rest = rest.trim_start_matches('/');
    let parts: Vec<&str> = rest.split('/').filter(|part| !part.is_empty()).collect();
    let [device_id, property, "set"] = parts.as_slice() else {
        return None;
    };
    Some((device_id.to_string(), property.to_string()))
}

fn qos_from_u8(value: u8) -> QoS {
    match value {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtLeastOnce,
    }
}
