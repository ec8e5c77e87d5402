//! 状态值对象与闭合枚举。
//!
//! 字段命名沿用 Eolia 云端 API 的原生词汇（snake_case JSON），
//! 快照以 JSON 形式落库，因此全部派生 Serialize/Deserialize。

use serde::{Deserialize, Serialize};

/// 运转模式。
///
/// `Stop` 是"停止"哨兵模式：对外（MQTT/HTTP）电源关以
/// `operation_status=false` 表达，规范化阶段会把 `Stop` 别名为 `Auto`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationMode {
    Stop,
    Auto,
    Cooling,
    Heating,
    CoolDehumidifying,
    ComfortableDehumidification,
    ClothesDryer,
    Blast,
    Nanoe,
    Cleaning,
    NanoexCleaning,
}

impl OperationMode {
    /// 实际进行空气调节的"运转中"模式。
    pub const ACTIVE: [OperationMode; 8] = [
        OperationMode::Auto,
        OperationMode::Cooling,
        OperationMode::Heating,
        OperationMode::CoolDehumidifying,
        OperationMode::ComfortableDehumidification,
        OperationMode::ClothesDryer,
        OperationMode::Blast,
        OperationMode::Nanoe,
    ];

    /// 内部清扫模式。
    pub const CLEANING: [OperationMode; 2] =
        [OperationMode::Cleaning, OperationMode::NanoexCleaning];

    /// 是否为运转中模式（决定 operation_status 的派生值）。
    pub fn is_active(self) -> bool {
        Self::ACTIVE.contains(&self)
    }

    /// 是否为清扫类模式。
    pub fn is_cleaning(self) -> bool {
        Self::CLEANING.contains(&self)
    }

    /// 该模式是否支持设定温度与 AI 控制。
    pub fn supports_temperature(self) -> bool {
        matches!(
            self,
            OperationMode::Auto
                | OperationMode::Cooling
                | OperationMode::Heating
                | OperationMode::CoolDehumidifying
        )
    }

    /// 存储键/日志用的稳定名称（与 serde 名称一致）。
    pub fn as_str(self) -> &'static str {
        match self {
            OperationMode::Stop => "Stop",
            OperationMode::Auto => "Auto",
            OperationMode::Cooling => "Cooling",
            OperationMode::Heating => "Heating",
            OperationMode::CoolDehumidifying => "CoolDehumidifying",
            OperationMode::ComfortableDehumidification => "ComfortableDehumidification",
            OperationMode::ClothesDryer => "ClothesDryer",
            OperationMode::Blast => "Blast",
            OperationMode::Nanoe => "Nanoe",
            OperationMode::Cleaning => "Cleaning",
            OperationMode::NanoexCleaning => "NanoexCleaning",
        }
    }

    /// 从稳定名称解析（与 `as_str` 对称）。
    pub fn from_name(name: &str) -> Option<Self> {
        let mode = match name {
            "Stop" => OperationMode::Stop,
            "Auto" => OperationMode::Auto,
            "Cooling" => OperationMode::Cooling,
            "Heating" => OperationMode::Heating,
            "CoolDehumidifying" => OperationMode::CoolDehumidifying,
            "ComfortableDehumidification" => OperationMode::ComfortableDehumidification,
            "ClothesDryer" => OperationMode::ClothesDryer,
            "Blast" => OperationMode::Blast,
            "Nanoe" => OperationMode::Nanoe,
            "Cleaning" => OperationMode::Cleaning,
            "NanoexCleaning" => OperationMode::NanoexCleaning,
            _ => return None,
        };
        Some(mode)
    }
}

impl std::fmt::Display for OperationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AI 控制预设。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiControl {
    Off,
    Comfortable,
    ComfortableEconavi,
}

/// 风量选项（パワフル等），与风量档位互斥。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirFlow {
    NotSet,
    Powerful,
    Long,
    Quiet,
}

impl AirFlow {
    /// MQTT 表示（serde 名称一致）。
    pub fn as_str(self) -> &'static str {
        match self {
            AirFlow::NotSet => "not_set",
            AirFlow::Powerful => "powerful",
            AirFlow::Long => "long",
            AirFlow::Quiet => "quiet",
        }
    }
}

/// 左右风向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindDirectionHorizon {
    Auto,
    ToLeft,
    NearbyLeft,
    Front,
    NearbyRight,
    ToRight,
}

impl WindDirectionHorizon {
    pub fn as_str(self) -> &'static str {
        match self {
            WindDirectionHorizon::Auto => "auto",
            WindDirectionHorizon::ToLeft => "to_left",
            WindDirectionHorizon::NearbyLeft => "nearby_left",
            WindDirectionHorizon::Front => "front",
            WindDirectionHorizon::NearbyRight => "nearby_right",
            WindDirectionHorizon::ToRight => "to_right",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let value = match name {
            "auto" => WindDirectionHorizon::Auto,
            "to_left" => WindDirectionHorizon::ToLeft,
            "nearby_left" => WindDirectionHorizon::NearbyLeft,
            "front" => WindDirectionHorizon::Front,
            "nearby_right" => WindDirectionHorizon::NearbyRight,
            "to_right" => WindDirectionHorizon::ToRight,
            _ => return None,
        };
        Some(value)
    }
}

/// 设备完整运转状态。
///
/// 每次更新生成新值，不做就地修改；来源只有云端网关的返回或快照还原。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// 云端侧机器 ID。
    pub appliance_id: String,
    /// 电源（运转中 = true）。
    pub operation_status: bool,
    pub operation_mode: OperationMode,
    /// 设定温度（℃）。不支持温度的模式下云端回传上次的值，对外不公开。
    pub temperature: f64,
    pub ai_control: AiControl,
    pub air_flow: AirFlow,
    /// 风量档位：0（自动）或 2..=5。
    pub wind_volume: u8,
    /// 上下风向：0（自动摆动）或 1..=5。
    pub wind_direction: u8,
    pub wind_direction_horizon: WindDirectionHorizon,
    /// 切タイマー（分钟、0 = 无效）。
    pub timer_value: u16,
    /// ナノイーX 开关。
    pub nanoex: bool,
    /// 室内温度（℃）。
    pub inside_temp: f64,
    /// 室内湿度（%）。
    pub inside_humidity: f64,
    /// 室外温度（℃）、999 = 不可用。
    pub outside_temp: f64,
    /// 云端操作令牌。写入成功时由云端下发。
    pub operation_token: Option<String>,
}
