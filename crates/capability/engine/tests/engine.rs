use async_trait::async_trait;
use domain::{
    AiControl, AirFlow, DEFAULT_TEMPERATURE, OperationMode, Status, StatusPatch,
    WindDirectionHorizon,
};
use eolia_bus::{BusError, StatePublisher};
use eolia_cloud::{CloudDevice, CloudError, CloudGateway};
use eolia_engine::{EngineError, ReconciliationEngine};
use eolia_storage::{DeviceRecord, InMemoryStatusStore, StatusStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

struct MockCloud {
    devices: Mutex<Vec<CloudDevice>>,
    statuses: Mutex<HashMap<String, Status>>,
    fetch_calls: AtomicU64,
    apply_calls: AtomicU64,
    token_seq: AtomicU64,
    fail_apply: AtomicBool,
}

impl MockCloud {
    fn new() -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            fetch_calls: AtomicU64::new(0),
            apply_calls: AtomicU64::new(0),
            token_seq: AtomicU64::new(0),
            fail_apply: AtomicBool::new(false),
        }
    }

    fn set_status(&self, status: Status) {
        self.statuses
            .lock()
            .unwrap()
            .insert(status.appliance_id.clone(), status);
    }

    fn fetch_calls(&self) -> u64 {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    fn apply_calls(&self) -> u64 {
        self.apply_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CloudGateway for MockCloud {
    async fn list_devices(&self) -> Result<Vec<CloudDevice>, CloudError> {
        Ok(self.devices.lock().unwrap().clone())
    }

    async fn fetch_status(&self, appliance_id: &str) -> Result<Status, CloudError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.statuses
            .lock()
            .unwrap()
            .get(appliance_id)
            .cloned()
            .ok_or(CloudError::Unauthorized)
    }

    async fn apply_status(&self, status: &Status) -> Result<Status, CloudError> {
        self.apply_calls.fetch_add(1, Ordering::Relaxed);
        if self.fail_apply.load(Ordering::Relaxed) {
            return Err(CloudError::Rejected {
                code: "5000".to_string(),
                message: "apply rejected".to_string(),
            });
        }
        let token = self.token_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let mut applied = status.clone();
        applied.operation_token = Some(format!("token-{token}"));
        self.statuses
            .lock()
            .unwrap()
            .insert(applied.appliance_id.clone(), applied.clone());
        Ok(applied)
    }
}

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<(String, String, String)>>,
}

impl RecordingPublisher {
    fn last_value(&self, property: &str) -> Option<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, name, _)| name == property)
            .map(|(_, _, value)| value.clone())
    }
}

#[async_trait]
impl StatePublisher for RecordingPublisher {
    async fn publish_state(
        &self,
        device_id: &str,
        property: &str,
        value: &str,
    ) -> Result<(), BusError> {
        self.events.lock().unwrap().push((
            device_id.to_string(),
            property.to_string(),
            value.to_string(),
        ));
        Ok(())
    }
}

struct Fixture {
    engine: ReconciliationEngine,
    store: Arc<InMemoryStatusStore>,
    cloud: Arc<MockCloud>,
    publisher: Arc<RecordingPublisher>,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStatusStore::new());
    let cloud = Arc::new(MockCloud::new());
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = ReconciliationEngine::new(store.clone(), cloud.clone(), publisher.clone());
    Fixture {
        engine,
        store,
        cloud,
        publisher,
    }
}

fn off_status(appliance_id: &str) -> Status {
    Status {
        appliance_id: appliance_id.to_string(),
        operation_status: false,
        operation_mode: OperationMode::Stop,
        temperature: 20.0,
        ai_control: AiControl::Off,
        air_flow: AirFlow::NotSet,
        wind_volume: 0,
        wind_direction: 0,
        wind_direction_horizon: WindDirectionHorizon::Auto,
        timer_value: 0,
        nanoex: false,
        inside_temp: 25.0,
        inside_humidity: 50.0,
        outside_temp: 999.0,
        operation_token: None,
    }
}

async fn register_device(f: &Fixture, device_id: &str) -> DeviceRecord {
    let appliance_id = format!("appliance-{device_id}");
    let record = DeviceRecord {
        device_id: device_id.to_string(),
        appliance_id: appliance_id.clone(),
        device_name: "リビング".to_string(),
        token: None,
        token_expire_ms: None,
    };
    f.cloud.set_status(off_status(&appliance_id));
    f.store.create_device(record).await.expect("create device")
}

#[tokio::test]
async fn cached_read_skips_cloud_within_token_window() {
    let f = fixture();
    register_device(&f, "device-1").await;

    // 写路径铸造令牌：内部读一次云端 + 一次下发
    let patch = StatusPatch {
        operation_mode: Some(OperationMode::Cooling),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");
    assert_eq!(f.cloud.fetch_calls(), 1);
    assert_eq!(f.cloud.apply_calls(), 1);

    // 令牌窗口内的读取不再触碰云端
    let status = f.engine.get_status("device-1").await.expect("get");
    assert_eq!(status.operation_mode, OperationMode::Cooling);
    assert!(status.operation_status);
    assert_eq!(f.cloud.fetch_calls(), 1);
}

#[tokio::test]
async fn mismatched_snapshot_token_is_fatal() {
    let f = fixture();
    let mut device = register_device(&f, "device-1").await;

    let mut snapshot = off_status(&device.appliance_id);
    snapshot.operation_token = Some("stale-token".to_string());
    f.store
        .upsert_snapshot("device-1", &snapshot, 1)
        .await
        .expect("upsert");
    device.token = Some("fresh-token".to_string());
    device.token_expire_ms = Some(i64::MAX);
    f.store.save_device(&device).await.expect("save");

    let err = f.engine.get_status("device-1").await.expect_err("error");
    assert!(matches!(err, EngineError::Consistency { .. }));
    // 不触碰云端，也不静默修复
    assert_eq!(f.cloud.fetch_calls(), 0);
}

#[tokio::test]
async fn repeated_patch_is_suppressed() {
    let f = fixture();
    register_device(&f, "device-1").await;

    let patch = StatusPatch {
        operation_mode: Some(OperationMode::Cooling),
        ..StatusPatch::default()
    };
    f.engine
        .set_status("device-1", patch.clone())
        .await
        .expect("set");
    f.engine.set_status("device-1", patch).await.expect("set");

    // 第二次归一化后与当前状态一致，不重复下发
    assert_eq!(f.cloud.apply_calls(), 1);
}

#[tokio::test]
async fn empty_patch_is_noop() {
    let f = fixture();
    register_device(&f, "device-1").await;

    f.engine
        .set_status("device-1", StatusPatch::default())
        .await
        .expect("set");
    assert_eq!(f.cloud.fetch_calls(), 0);
    assert_eq!(f.cloud.apply_calls(), 0);
}

#[tokio::test]
async fn power_on_restores_last_active_mode() {
    let f = fixture();
    let device = register_device(&f, "device-1").await;

    let mut heating = off_status(&device.appliance_id);
    heating.operation_status = true;
    heating.operation_mode = OperationMode::Heating;
    heating.temperature = 22.0;
    heating.ai_control = AiControl::Comfortable;
    f.store
        .upsert_snapshot("device-1", &heating, 1)
        .await
        .expect("upsert");

    let patch = StatusPatch {
        operation_status: Some(true),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    let status = f.engine.get_status("device-1").await.expect("get");
    assert_eq!(status.operation_mode, OperationMode::Heating);
    assert_eq!(status.temperature, 22.0);
    assert_eq!(status.ai_control, AiControl::Comfortable);
}

#[tokio::test]
async fn power_on_without_history_defaults_to_auto() {
    let f = fixture();
    register_device(&f, "device-1").await;

    let patch = StatusPatch {
        operation_status: Some(true),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    let status = f.engine.get_status("device-1").await.expect("get");
    assert_eq!(status.operation_mode, OperationMode::Auto);
    assert_eq!(status.temperature, DEFAULT_TEMPERATURE);
    assert_eq!(status.ai_control, AiControl::Comfortable);
}

#[tokio::test]
async fn air_flow_preset_clears_wind_volume() {
    let f = fixture();
    register_device(&f, "device-1").await;

    let patch = StatusPatch {
        operation_mode: Some(OperationMode::Cooling),
        wind_volume: Some(4),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    let patch = StatusPatch {
        air_flow: Some(AirFlow::Powerful),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    let status = f.engine.get_status("device-1").await.expect("get");
    assert_eq!(status.air_flow, AirFlow::Powerful);
    assert_eq!(status.wind_volume, 0);
    assert_eq!(status.ai_control, AiControl::Off);
}

#[tokio::test]
async fn unsupported_mode_drops_temperature_fields() {
    let f = fixture();
    register_device(&f, "device-1").await;

    let patch = StatusPatch {
        operation_mode: Some(OperationMode::Blast),
        temperature: Some(18.0),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    let status = f.engine.get_status("device-1").await.expect("get");
    assert_eq!(status.operation_mode, OperationMode::Blast);
    assert_eq!(status.ai_control, AiControl::Off);
    // 温度保持原值，不被无意义的目标温度覆盖
    assert_eq!(status.temperature, 20.0);
}

#[tokio::test]
async fn pre_and_post_write_states_are_published() {
    let f = fixture();
    register_device(&f, "device-1").await;

    let patch = StatusPatch {
        operation_mode: Some(OperationMode::Heating),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    // 读穿 + 前置 + 确认，每轮 13 个属性
    let events = f.publisher.events.lock().unwrap().len();
    assert_eq!(events, 39);
    assert_eq!(f.publisher.last_value("mode").as_deref(), Some("heat"));
    assert_eq!(f.publisher.last_value("power").as_deref(), Some("ON"));
}

#[tokio::test]
async fn failed_cloud_apply_leaves_store_untouched() {
    let f = fixture();
    register_device(&f, "device-1").await;
    f.cloud.fail_apply.store(true, Ordering::Relaxed);

    let patch = StatusPatch {
        operation_mode: Some(OperationMode::Cooling),
        ..StatusPatch::default()
    };
    let err = f
        .engine
        .set_status("device-1", patch)
        .await
        .expect_err("error");
    assert!(matches!(err, EngineError::Cloud(_)));

    // 写路径失败：读穿快照与令牌都不落库
    let snapshot = f.store.latest_snapshot("device-1").await.expect("query");
    assert!(snapshot.is_none());
    let device = f
        .store
        .find_device("device-1")
        .await
        .expect("query")
        .expect("device");
    assert!(device.token.is_none());
}

#[tokio::test]
async fn suppressed_write_still_records_read_through() {
    let f = fixture();
    register_device(&f, "device-1").await;

    // 关机 -> 关机是 no-op，但读穿到的状态仍要落库
    let patch = StatusPatch {
        operation_status: Some(false),
        ..StatusPatch::default()
    };
    f.engine.set_status("device-1", patch).await.expect("set");

    assert_eq!(f.cloud.apply_calls(), 0);
    let snapshot = f
        .store
        .latest_snapshot("device-1")
        .await
        .expect("query")
        .expect("snapshot");
    assert_eq!(snapshot.operation_mode, OperationMode::Stop);
}

#[tokio::test]
async fn unknown_device_is_not_found() {
    let f = fixture();
    let err = f.engine.get_status("missing").await.expect_err("error");
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn synchronize_registers_and_seeds_new_devices() {
    let f = fixture();
    f.cloud.devices.lock().unwrap().push(CloudDevice {
        appliance_id: "appliance-a".to_string(),
        nickname: "寝室".to_string(),
    });
    f.cloud.set_status(off_status("appliance-a"));

    f.engine.synchronize().await.expect("sync");

    let devices = f.store.list_devices().await.expect("list");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "寝室");
    // 新设备读穿一次播种快照
    assert_eq!(f.cloud.fetch_calls(), 1);
    let snapshot = f
        .store
        .latest_snapshot(&devices[0].device_id)
        .await
        .expect("query")
        .expect("snapshot");
    assert_eq!(snapshot.operation_mode, OperationMode::Stop);

    // 再次同步只更新名称，不重复建档
    f.cloud.devices.lock().unwrap()[0].nickname = "和室".to_string();
    f.engine.synchronize().await.expect("sync");
    let devices = f.store.list_devices().await.expect("list");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].device_name, "和室");
    assert_eq!(f.cloud.fetch_calls(), 1);
}

#[tokio::test]
async fn automatic_judgment_skips_powered_on_device() {
    let f = fixture();
    let device = register_device(&f, "device-1").await;

    let mut running = off_status(&device.appliance_id);
    running.operation_status = true;
    running.operation_mode = OperationMode::Cooling;
    f.cloud.set_status(running);

    f.engine
        .automatic_judgment("device-1")
        .await
        .expect("judgment");
    // 已开机：读一次确认后不做任何下发
    assert_eq!(f.cloud.apply_calls(), 0);
}
