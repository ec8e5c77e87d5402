use domain::{
    AiControl, AirFlow, OperationMode, Status, WindDirectionHorizon,
};
use eolia_storage::{DeviceRecord, InMemoryStatusStore, StatusStore};

fn device(id: &str) -> DeviceRecord {
    DeviceRecord {
        device_id: id.to_string(),
        appliance_id: format!("appliance-{id}"),
        device_name: "寝室".to_string(),
        token: None,
        token_expire_ms: None,
    }
}

fn status(mode: OperationMode, temperature: f64) -> Status {
    Status {
        appliance_id: "appliance-device-1".to_string(),
        operation_status: mode.is_active(),
        operation_mode: mode,
        temperature,
        ai_control: AiControl::Comfortable,
        air_flow: AirFlow::NotSet,
        wind_volume: 0,
        wind_direction: 0,
        wind_direction_horizon: WindDirectionHorizon::Auto,
        timer_value: 0,
        nanoex: false,
        inside_temp: 25.0,
        inside_humidity: 50.0,
        outside_temp: 999.0,
        operation_token: Some("token-1".to_string()),
    }
}

#[tokio::test]
async fn snapshot_upsert_is_keyed_by_embedded_mode() {
    let store = InMemoryStatusStore::new();
    store.create_device(device("device-1")).await.expect("create");

    store
        .upsert_snapshot("device-1", &status(OperationMode::Cooling, 24.0), 1)
        .await
        .expect("upsert");
    store
        .upsert_snapshot("device-1", &status(OperationMode::Cooling, 26.0), 2)
        .await
        .expect("upsert");
    store
        .upsert_snapshot("device-1", &status(OperationMode::Heating, 22.0), 3)
        .await
        .expect("upsert");

    // 同一模式只保留一行，后写覆盖先写
    let cooling = store
        .latest_snapshot_for_modes("device-1", &[OperationMode::Cooling])
        .await
        .expect("query")
        .expect("cooling snapshot");
    assert_eq!(cooling.data.temperature, 26.0);

    let latest = store
        .latest_snapshot("device-1")
        .await
        .expect("query")
        .expect("latest");
    assert_eq!(latest.operation_mode, OperationMode::Heating);
}

#[tokio::test]
async fn latest_snapshot_for_modes_filters() {
    let store = InMemoryStatusStore::new();
    store.create_device(device("device-1")).await.expect("create");

    store
        .upsert_snapshot("device-1", &status(OperationMode::Heating, 22.0), 1)
        .await
        .expect("upsert");
    store
        .upsert_snapshot("device-1", &status(OperationMode::Cleaning, 20.0), 2)
        .await
        .expect("upsert");

    // 清扫模式不在运转中集合内，应回到 Heating
    let active = store
        .latest_snapshot_for_modes("device-1", &OperationMode::ACTIVE)
        .await
        .expect("query")
        .expect("active snapshot");
    assert_eq!(active.operation_mode, OperationMode::Heating);

    let none = store
        .latest_snapshot_for_modes("device-1", &[OperationMode::Nanoe])
        .await
        .expect("query");
    assert!(none.is_none());
}

#[tokio::test]
async fn delete_device_cascades_snapshots() {
    let store = InMemoryStatusStore::new();
    store.create_device(device("device-1")).await.expect("create");
    store
        .upsert_snapshot("device-1", &status(OperationMode::Auto, 20.0), 1)
        .await
        .expect("upsert");

    assert!(store.delete_device("device-1").await.expect("delete"));
    assert!(!store.delete_device("device-1").await.expect("delete"));
    let snapshot = store.latest_snapshot("device-1").await.expect("query");
    assert!(snapshot.is_none());
}

#[tokio::test]
async fn appliance_id_is_unique() {
    let store = InMemoryStatusStore::new();
    store.create_device(device("device-1")).await.expect("create");

    let mut duplicate = device("device-2");
    duplicate.appliance_id = "appliance-device-1".to_string();
    assert!(store.create_device(duplicate).await.is_err());

    let found = store
        .find_device_by_appliance("appliance-device-1")
        .await
        .expect("query")
        .expect("device");
    assert_eq!(found.device_id, "device-1");
}

#[tokio::test]
async fn commit_applied_updates_token_and_snapshot() {
    let store = InMemoryStatusStore::new();
    store.create_device(device("device-1")).await.expect("create");

    let mut updated = device("device-1");
    updated.token = Some("token-2".to_string());
    updated.token_expire_ms = Some(10_000);
    let applied = status(OperationMode::Cooling, 25.0);
    store
        .commit_applied(&updated, &applied, 5)
        .await
        .expect("commit");

    let device = store
        .find_device("device-1")
        .await
        .expect("query")
        .expect("device");
    assert_eq!(device.token.as_deref(), Some("token-2"));
    assert!(device.token_valid_at(9_999));

    let snapshot = store
        .latest_snapshot("device-1")
        .await
        .expect("query")
        .expect("snapshot");
    assert_eq!(snapshot.operation_mode, OperationMode::Cooling);
    assert_eq!(snapshot.updated_at_ms, 5);
}
