//! 稀疏状态补丁。

use crate::status::{AiControl, AirFlow, OperationMode, Status, WindDirectionHorizon};
use crate::{MAX_TEMPERATURE, MIN_TEMPERATURE, TIMER_VALUES, WIND_DIRECTIONS, WIND_VOLUMES};
use serde::{Deserialize, Serialize};

/// 对 `Status` 可控字段的稀疏补丁。
///
/// 由属性编解码或 HTTP 请求体产生，永不落库；只用于合并。
/// 传感器字段与 `operation_token` 不可通过补丁修改。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_status: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_mode: Option<OperationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_control: Option<AiControl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_flow: Option<AirFlow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_volume: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_direction_horizon: Option<WindDirectionHorizon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_value: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nanoex: Option<bool>,
}

impl StatusPatch {
    /// 全字段为空。空补丁在引擎入口处直接视为 no-op。
    pub fn is_empty(&self) -> bool {
        *self == StatusPatch::default()
    }

    /// 校验各字段的取值范围。HTTP 入口在下发前调用；
    /// 总线入口的取值由编解码层保证。
    pub fn validate(&self) -> Result<(), String> {
        if let Some(temperature) = self.temperature {
            if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
                return Err(format!("temperature out of range: {temperature}"));
            }
        }
        if let Some(wind_volume) = self.wind_volume {
            if !WIND_VOLUMES.contains(&wind_volume) {
                return Err(format!("invalid wind_volume: {wind_volume}"));
            }
        }
        if let Some(wind_direction) = self.wind_direction {
            if !WIND_DIRECTIONS.contains(&wind_direction) {
                return Err(format!("invalid wind_direction: {wind_direction}"));
            }
        }
        if let Some(timer_value) = self.timer_value {
            if !TIMER_VALUES.contains(&timer_value) {
                return Err(format!("invalid timer_value: {timer_value}"));
            }
        }
        Ok(())
    }

    /// 浅合并：补丁中出现的字段覆盖当前状态的对应字段。
    pub fn merge_over(&self, current: &Status) -> Status {
        let mut next = current.clone();
        if let Some(operation_status) = self.operation_status {
            next.operation_status = operation_status;
        }
        if let Some(operation_mode) = self.operation_mode {
            next.operation_mode = operation_mode;
        }
        if let Some(temperature) = self.temperature {
            next.temperature = temperature;
        }
        if let Some(ai_control) = self.ai_control {
            next.ai_control = ai_control;
        }
        if let Some(air_flow) = self.air_flow {
            next.air_flow = air_flow;
        }
        if let Some(wind_volume) = self.wind_volume {
            next.wind_volume = wind_volume;
        }
        if let Some(wind_direction) = self.wind_direction {
            next.wind_direction = wind_direction;
        }
        if let Some(horizon) = self.wind_direction_horizon {
            next.wind_direction_horizon = horizon;
        }
        if let Some(timer_value) = self.timer_value {
            next.timer_value = timer_value;
        }
        if let Some(nanoex) = self.nanoex {
            next.nanoex = nanoex;
        }
        next
    }
}
