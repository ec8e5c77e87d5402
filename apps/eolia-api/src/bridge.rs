//! 总线命令到引擎的桥接
//!
//! 入站命令以 (device_id, property, payload) 形式到达；这里完成
//! 属性解码并触发引擎写路径。解码失败或设备未登记的命令告警后丢弃，
//! 不产生任何状态更新。

use async_trait::async_trait;
use eolia_bus::CommandSink;
use eolia_codec::Property;
use eolia_engine::{EngineError, ReconciliationEngine};
use eolia_storage::StatusStore;
use eolia_telemetry::record_command_dropped;
use std::sync::Arc;
use tracing::warn;

pub struct EngineCommandSink {
    engine: Arc<ReconciliationEngine>,
    store: Arc<dyn StatusStore>,
}

impl EngineCommandSink {
    pub fn new(engine: Arc<ReconciliationEngine>, store: Arc<dyn StatusStore>) -> Self {
        Self { engine, store }
    }
}

#[async_trait]
impl CommandSink for EngineCommandSink {
    async fn handle_command(&self, device_id: &str, property: &str, payload: &str) {
        let patch = match Property::from_name(property).and_then(|property| property.parse(payload))
        {
            Ok(patch) => patch,
            Err(err) => {
                record_command_dropped();
                warn!(
                    target: "eolia.api",
                    device_id = %device_id,
                    property = %property,
                    "command dropped: {}",
                    err
                );
                return;
            }
        };
        match self.store.find_device(device_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                record_command_dropped();
                warn!(
                    target: "eolia.api",
                    device_id = %device_id,
                    "command dropped: device not registered"
                );
                return;
            }
            Err(err) => {
                warn!(target: "eolia.api", "command device lookup failed: {}", err);
                return;
            }
        }
        if let Err(err) = self.engine.set_status(device_id, patch).await {
            if matches!(err, EngineError::NotFound(_)) {
                record_command_dropped();
            }
            warn!(
                target: "eolia.api",
                device_id = %device_id,
                property = %property,
                "command apply failed: {}",
                err
            );
        }
    }
}
