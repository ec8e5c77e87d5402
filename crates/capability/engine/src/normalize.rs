//! 补丁归一化规则链
//!
//! 按固定顺序对补丁施加规则，输出可直接合并下发的补丁；返回 None
//! 表示整次写入应视为 no-op。规则本身是纯函数，所需的历史快照由
//! 引擎预取后以 [`NormalizeContext`] 传入。

use domain::{AiControl, AirFlow, DEFAULT_TEMPERATURE, OperationMode, Status, StatusPatch};

/// 归一化所需的历史快照。
#[derive(Debug, Default)]
pub struct NormalizeContext {
    /// 补丁目标模式（支持设定温度时）对应的最近快照。
    pub mode_snapshot: Option<Status>,
    /// 最近一次运转中模式的快照，用于关机 -> 开机的恢复。
    pub last_active_snapshot: Option<Status>,
}

/// 依次施加全部规则。None 表示 no-op。
pub fn normalize(
    current: &Status,
    patch: StatusPatch,
    ctx: &NormalizeContext,
) -> Option<StatusPatch> {
    let mut patch = patch;
    resolve_mode_and_power(current, &mut patch, ctx)?;
    alias_modes(&mut patch);
    default_ai_for_volume(current, &mut patch);
    strip_temperature_fields(current, &mut patch);
    resolve_flow_exclusivity(&mut patch);
    Some(patch)
}

/// 规则 1/2：模式与电源的解析。
///
/// - 给出模式时：Stop -> Stop 为 no-op；支持温度的模式从该模式的
///   快照回填温度 / AI 偏好；电源由模式是否运转中推导。
/// - 未给模式时：电源缺省继承当前值；开机中携带当前模式；
///   关机 -> 开机时恢复最近运转快照（无快照则 Auto/20/comfortable）；
///   关机 -> 关机为 no-op。
fn resolve_mode_and_power(
    current: &Status,
    patch: &mut StatusPatch,
    ctx: &NormalizeContext,
) -> Option<()> {
    match patch.operation_mode {
        Some(mode) => {
            if mode == OperationMode::Stop && current.operation_mode == OperationMode::Stop {
                return None;
            }
            if mode.supports_temperature() {
                if patch.temperature.is_none() {
                    patch.temperature = Some(
                        ctx.mode_snapshot
                            .as_ref()
                            .map(|snapshot| snapshot.temperature)
                            .unwrap_or(DEFAULT_TEMPERATURE),
                    );
                }
                if patch.ai_control.is_none() {
                    patch.ai_control = Some(
                        ctx.mode_snapshot
                            .as_ref()
                            .map(|snapshot| snapshot.ai_control)
                            .unwrap_or(AiControl::Comfortable),
                    );
                }
            }
            patch.operation_status = Some(mode.is_active());
        }
        None => {
            if patch.operation_status.is_none() {
                patch.operation_status = Some(current.operation_status);
            }
            let target_on = patch.operation_status == Some(true);
            if current.operation_status {
                // 开机中：显式携带当前模式，后续别名规则对其同样生效
                patch.operation_mode = Some(current.operation_mode);
            } else if target_on {
                match &ctx.last_active_snapshot {
                    Some(snapshot) => {
                        patch.operation_mode = Some(snapshot.operation_mode);
                        if patch.temperature.is_none() {
                            patch.temperature = Some(snapshot.temperature);
                        }
                        if patch.ai_control.is_none() {
                            patch.ai_control = Some(snapshot.ai_control);
                        }
                    }
                    None => {
                        patch.operation_mode = Some(OperationMode::Auto);
                        if patch.temperature.is_none() {
                            patch.temperature = Some(DEFAULT_TEMPERATURE);
                        }
                        if patch.ai_control.is_none() {
                            patch.ai_control = Some(AiControl::Comfortable);
                        }
                    }
                }
            } else {
                // 关机 -> 关机
                return None;
            }
        }
    }
    Some(())
}

/// 规则 3：模式别名。
///
/// Stop 归一为 Auto（此后关机仅以 operation_status=false 表达）；
/// Nanoe 归一为 Blast + nanoex 强制开。
fn alias_modes(patch: &mut StatusPatch) {
    match patch.operation_mode {
        Some(OperationMode::Stop) => {
            patch.operation_mode = Some(OperationMode::Auto);
        }
        Some(OperationMode::Nanoe) => {
            patch.operation_mode = Some(OperationMode::Blast);
            patch.nanoex = Some(true);
        }
        _ => {}
    }
}

/// 规则 4：只调风量且当前 AI 偏好为 off 时，默认补 comfortable。
fn default_ai_for_volume(current: &Status, patch: &mut StatusPatch) {
    if patch.wind_volume.is_some()
        && patch.ai_control.is_none()
        && current.ai_control == AiControl::Off
    {
        patch.ai_control = Some(AiControl::Comfortable);
    }
}

/// 规则 5：解析后的模式不支持设定温度时，丢弃温度并强制 AI 偏好 off。
fn strip_temperature_fields(current: &Status, patch: &mut StatusPatch) {
    let resolved = patch.operation_mode.unwrap_or(current.operation_mode);
    if !resolved.supports_temperature() {
        patch.temperature = None;
        patch.ai_control = Some(AiControl::Off);
    }
}

/// 规则 6：风流预设与风量互斥。
///
/// 设置非默认风流预设时风量清零且 AI 偏好 off；设置风量时风流预设
/// 回到默认。
fn resolve_flow_exclusivity(patch: &mut StatusPatch) {
    if let Some(air_flow) = patch.air_flow {
        if air_flow != AirFlow::NotSet {
            patch.wind_volume = Some(0);
            patch.ai_control = Some(AiControl::Off);
            return;
        }
    }
    if patch.wind_volume.is_some() {
        patch.air_flow = Some(AirFlow::NotSet);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::WindDirectionHorizon;

    fn status(mode: OperationMode, on: bool) -> Status {
        Status {
            appliance_id: "appliance-1".to_string(),
            operation_status: on,
            operation_mode: mode,
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

    fn patch_mode(mode: OperationMode) -> StatusPatch {
        StatusPatch {
            operation_mode: Some(mode),
            ..StatusPatch::default()
        }
    }

    #[test]
    fn stop_to_stop_is_noop() {
        let current = status(OperationMode::Stop, false);
        let ctx = NormalizeContext::default();
        assert!(normalize(&current, patch_mode(OperationMode::Stop), &ctx).is_none());
    }

    #[test]
    fn temperature_mode_backfills_from_snapshot() {
        let current = status(OperationMode::Auto, true);
        let mut snapshot = status(OperationMode::Heating, true);
        snapshot.temperature = 22.0;
        snapshot.ai_control = AiControl::ComfortableEconavi;
        let ctx = NormalizeContext {
            mode_snapshot: Some(snapshot),
            last_active_snapshot: None,
        };
        let normalized = normalize(&current, patch_mode(OperationMode::Heating), &ctx)
            .expect("normalized");
        assert_eq!(normalized.temperature, Some(22.0));
        assert_eq!(normalized.ai_control, Some(AiControl::ComfortableEconavi));
        assert_eq!(normalized.operation_status, Some(true));
    }

    #[test]
    fn temperature_mode_defaults_without_snapshot() {
        let current = status(OperationMode::Auto, true);
        let ctx = NormalizeContext::default();
        let normalized = normalize(&current, patch_mode(OperationMode::Cooling), &ctx)
            .expect("normalized");
        assert_eq!(normalized.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(normalized.ai_control, Some(AiControl::Comfortable));
    }

    #[test]
    fn power_on_restores_last_active_snapshot() {
        let current = status(OperationMode::Auto, false);
        let mut snapshot = status(OperationMode::Heating, true);
        snapshot.temperature = 23.0;
        snapshot.ai_control = AiControl::Comfortable;
        let ctx = NormalizeContext {
            mode_snapshot: None,
            last_active_snapshot: Some(snapshot),
        };
        let patch = StatusPatch {
            operation_status: Some(true),
            ..StatusPatch::default()
        };
        let normalized = normalize(&current, patch, &ctx).expect("normalized");
        assert_eq!(normalized.operation_mode, Some(OperationMode::Heating));
        assert_eq!(normalized.temperature, Some(23.0));
    }

    #[test]
    fn power_on_without_history_defaults_to_auto() {
        let current = status(OperationMode::Auto, false);
        let ctx = NormalizeContext::default();
        let patch = StatusPatch {
            operation_status: Some(true),
            ..StatusPatch::default()
        };
        let normalized = normalize(&current, patch, &ctx).expect("normalized");
        assert_eq!(normalized.operation_mode, Some(OperationMode::Auto));
        assert_eq!(normalized.temperature, Some(DEFAULT_TEMPERATURE));
        assert_eq!(normalized.ai_control, Some(AiControl::Comfortable));
    }

    #[test]
    fn off_to_off_is_noop() {
        let current = status(OperationMode::Auto, false);
        let ctx = NormalizeContext::default();
        let patch = StatusPatch {
            temperature: Some(24.0),
            ..StatusPatch::default()
        };
        assert!(normalize(&current, patch, &ctx).is_none());
    }

    #[test]
    fn stop_mode_aliases_to_auto_with_power_off() {
        let current = status(OperationMode::Cooling, true);
        let ctx = NormalizeContext::default();
        let normalized = normalize(&current, patch_mode(OperationMode::Stop), &ctx)
            .expect("normalized");
        assert_eq!(normalized.operation_mode, Some(OperationMode::Auto));
        assert_eq!(normalized.operation_status, Some(false));
    }

    #[test]
    fn nanoe_aliases_to_blast_with_nanoex() {
        let current = status(OperationMode::Auto, true);
        let ctx = NormalizeContext::default();
        let normalized = normalize(&current, patch_mode(OperationMode::Nanoe), &ctx)
            .expect("normalized");
        assert_eq!(normalized.operation_mode, Some(OperationMode::Blast));
        assert_eq!(normalized.nanoex, Some(true));
        // Blast 不支持设定温度
        assert_eq!(normalized.temperature, None);
        assert_eq!(normalized.ai_control, Some(AiControl::Off));
    }

    #[test]
    fn carried_over_mode_is_aliased() {
        // 无模式的补丁携带当前模式，Nanoe 同样要归一为 Blast + nanoex
        let current = status(OperationMode::Nanoe, true);
        let ctx = NormalizeContext::default();
        let patch = StatusPatch {
            wind_volume: Some(3),
            ..StatusPatch::default()
        };
        let normalized = normalize(&current, patch, &ctx).expect("normalized");
        assert_eq!(normalized.operation_mode, Some(OperationMode::Blast));
        assert_eq!(normalized.nanoex, Some(true));
    }

    #[test]
    fn volume_change_defaults_ai_to_comfortable() {
        let current = status(OperationMode::Cooling, true);
        let ctx = NormalizeContext::default();
        let patch = StatusPatch {
            wind_volume: Some(3),
            ..StatusPatch::default()
        };
        let normalized = normalize(&current, patch, &ctx).expect("normalized");
        assert_eq!(normalized.ai_control, Some(AiControl::Comfortable));
        assert_eq!(normalized.air_flow, Some(AirFlow::NotSet));
    }

    #[test]
    fn air_flow_preset_zeroes_volume_and_ai() {
        let current = status(OperationMode::Cooling, true);
        let ctx = NormalizeContext::default();
        let patch = StatusPatch {
            air_flow: Some(AirFlow::Powerful),
            wind_volume: Some(4),
            ..StatusPatch::default()
        };
        let normalized = normalize(&current, patch, &ctx).expect("normalized");
        assert_eq!(normalized.wind_volume, Some(0));
        assert_eq!(normalized.ai_control, Some(AiControl::Off));
    }
}
