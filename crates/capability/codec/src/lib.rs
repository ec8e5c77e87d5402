//! 属性编解码：设备状态 ↔ MQTT 属性字符串的双向纯映射。
//!
//! 每个属性对应一个解析器（入站命令值 → `StatusPatch`）和一个转换器
//! （完整 `Status` → 规范字符串）。属性集合是闭合枚举，穷举匹配解析，
//! 不存在运行时注册表。属性命名遵循 Home Assistant MQTT HVAC 约定。

use domain::{
    AiControl, AirFlow, MAX_TEMPERATURE, MIN_TEMPERATURE, OUTSIDE_TEMP_UNKNOWN, OperationMode,
    Status, StatusPatch, TIMER_VALUES, WIND_DIRECTIONS, WindDirectionHorizon,
};

/// 编解码错误。入站命令解码失败时记录告警并丢弃该命令。
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown property: {0}")]
    UnknownProperty(String),
    #[error("property is read-only: {0}")]
    ReadOnly(&'static str),
    #[error("invalid value for {property}: {value}")]
    InvalidValue {
        property: &'static str,
        value: String,
    },
}

/// MQTT 属性。
///
/// 前 10 个可写（存在 set topic），后 3 个为只读传感器属性。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Power,
    Mode,
    Temperature,
    FanMode,
    SwingMode,
    PresetMode,
    Nanoex,
    WindDirection,
    WindDirectionHorizon,
    OffTimer,
    CurrentTemperature,
    CurrentHumidity,
    OutsideTemperature,
}

impl Property {
    /// 全属性（发布完整状态时逐一运行转换器）。
    pub const ALL: [Property; 13] = [
        Property::Power,
        Property::Mode,
        Property::Temperature,
        Property::FanMode,
        Property::SwingMode,
        Property::PresetMode,
        Property::Nanoex,
        Property::WindDirection,
        Property::WindDirectionHorizon,
        Property::OffTimer,
        Property::CurrentTemperature,
        Property::CurrentHumidity,
        Property::OutsideTemperature,
    ];

    /// topic 段名称。
    pub fn as_str(self) -> &'static str {
        match self {
            Property::Power => "power",
            Property::Mode => "mode",
            Property::Temperature => "temperature",
            Property::FanMode => "fan_mode",
            Property::SwingMode => "swing_mode",
            Property::PresetMode => "preset_mode",
            Property::Nanoex => "nanoex",
            Property::WindDirection => "wind_direction",
            Property::WindDirectionHorizon => "wind_direction_horizon",
            Property::OffTimer => "off_timer",
            Property::CurrentTemperature => "current_temperature",
            Property::CurrentHumidity => "current_humidity",
            Property::OutsideTemperature => "outside_temperature",
        }
    }

    /// 由 topic 段名称解析属性。未知名称在分发之前被拒绝。
    pub fn from_name(name: &str) -> Result<Self, DecodeError> {
        let property = match name {
            "power" => Property::Power,
            "mode" => Property::Mode,
            "temperature" => Property::Temperature,
            "fan_mode" => Property::FanMode,
            "swing_mode" => Property::SwingMode,
            "preset_mode" => Property::PresetMode,
            "nanoex" => Property::Nanoex,
            "wind_direction" => Property::WindDirection,
            "wind_direction_horizon" => Property::WindDirectionHorizon,
            "off_timer" => Property::OffTimer,
            "current_temperature" => Property::CurrentTemperature,
            "current_humidity" => Property::CurrentHumidity,
            "outside_temperature" => Property::OutsideTemperature,
            other => return Err(DecodeError::UnknownProperty(other.to_string())),
        };
        Ok(property)
    }

    /// 该属性是否接受入站命令。
    pub fn is_writable(self) -> bool {
        !matches!(
            self,
            Property::CurrentTemperature
                | Property::CurrentHumidity
                | Property::OutsideTemperature
        )
    }

    /// 解析入站命令值，产出稀疏补丁。
    ///
    /// 值不在属性的固定枚举内时返回 `DecodeError`；只读属性直接拒绝。
    pub fn parse(self, value: &str) -> Result<StatusPatch, DecodeError> {
        match self {
            Property::Power => parse_power(value),
            Property::Mode => parse_mode(value),
            Property::Temperature => parse_temperature(value),
            Property::FanMode => parse_fan_mode(value),
            Property::SwingMode => parse_swing_mode(value),
            Property::PresetMode => parse_preset_mode(value),
            Property::Nanoex => parse_nanoex(value),
            Property::WindDirection => parse_wind_direction(value),
            Property::WindDirectionHorizon => parse_wind_direction_horizon(value),
            Property::OffTimer => parse_off_timer(value),
            Property::CurrentTemperature => Err(DecodeError::ReadOnly("current_temperature")),
            Property::CurrentHumidity => Err(DecodeError::ReadOnly("current_humidity")),
            Property::OutsideTemperature => Err(DecodeError::ReadOnly("outside_temperature")),
        }
    }

    /// 将完整状态转换为该属性的规范字符串表示。
    pub fn format(self, status: &Status) -> String {
        match self {
            Property::Power => format_power(status),
            Property::Mode => format_mode(status),
            Property::Temperature => format_temperature(status),
            Property::FanMode => format_fan_mode(status),
            Property::SwingMode => format_swing_mode(status),
            Property::PresetMode => format_preset_mode(status),
            Property::Nanoex => format_nanoex(status),
            Property::WindDirection => format_wind_direction(status),
            Property::WindDirectionHorizon => status.wind_direction_horizon.as_str().to_string(),
            Property::OffTimer => format_off_timer(status),
            Property::CurrentTemperature => format_number(status.inside_temp),
            Property::CurrentHumidity => format_number(status.inside_humidity),
            Property::OutsideTemperature => format_outside_temperature(status),
        }
    }
}

// ---------------------------------------------------------------------------
// 解析器
// ---------------------------------------------------------------------------

fn parse_power(value: &str) -> Result<StatusPatch, DecodeError> {
    match value {
        "ON" => Ok(StatusPatch {
            operation_status: Some(true),
            ..StatusPatch::default()
        }),
        "OFF" => Ok(StatusPatch {
            operation_status: Some(false),
            ..StatusPatch::default()
        }),
        other => Err(invalid("power", other)),
    }
}

fn parse_mode(value: &str) -> Result<StatusPatch, DecodeError> {
    let operation_mode = match value {
        "auto" => OperationMode::Auto,
        "cool" => OperationMode::Cooling,
        "heat" => OperationMode::Heating,
        "dry" => OperationMode::CoolDehumidifying,
        "fan_only" => OperationMode::Nanoe,
        "off" => OperationMode::Stop,
        other => return Err(invalid("mode", other)),
    };
    Ok(StatusPatch {
        operation_mode: Some(operation_mode),
        ..StatusPatch::default()
    })
}

fn parse_temperature(value: &str) -> Result<StatusPatch, DecodeError> {
    let temperature: f64 = value
        .parse()
        .map_err(|_| invalid("temperature", value))?;
    if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(invalid("temperature", value));
    }
    Ok(StatusPatch {
        temperature: Some(temperature),
        ..StatusPatch::default()
    })
}

fn parse_fan_mode(value: &str) -> Result<StatusPatch, DecodeError> {
    // 命名风量选项（not_set 除外）直接映射到 air_flow
    if let Some(air_flow) = match value {
        "powerful" => Some(AirFlow::Powerful),
        "long" => Some(AirFlow::Long),
        "quiet" => Some(AirFlow::Quiet),
        _ => None,
    } {
        return Ok(StatusPatch {
            air_flow: Some(air_flow),
            ..StatusPatch::default()
        });
    }

    let wind_volume = match value {
        "1" => 2,
        "2" => 3,
        "3" => 4,
        "4" => 5,
        "auto" => 0,
        other => return Err(invalid("fan_mode", other)),
    };
    Ok(StatusPatch {
        wind_volume: Some(wind_volume),
        ..StatusPatch::default()
    })
}

fn parse_swing_mode(value: &str) -> Result<StatusPatch, DecodeError> {
    let wind_direction = match value {
        "on" => 0,
        "off" => 3,
        other => return Err(invalid("swing_mode", other)),
    };
    Ok(StatusPatch {
        wind_direction: Some(wind_direction),
        ..StatusPatch::default()
    })
}

fn parse_preset_mode(value: &str) -> Result<StatusPatch, DecodeError> {
    let patch = match value {
        "cleaning" => StatusPatch {
            operation_mode: Some(OperationMode::Cleaning),
            ..StatusPatch::default()
        },
        "away" => StatusPatch {
            operation_mode: Some(OperationMode::NanoexCleaning),
            ..StatusPatch::default()
        },
        "eco" => StatusPatch {
            ai_control: Some(AiControl::ComfortableEconavi),
            ..StatusPatch::default()
        },
        "comfort" => StatusPatch {
            ai_control: Some(AiControl::Comfortable),
            ..StatusPatch::default()
        },
        "none" => StatusPatch {
            ai_control: Some(AiControl::Off),
            ..StatusPatch::default()
        },
        other => return Err(invalid("preset_mode", other)),
    };
    Ok(patch)
}

fn parse_nanoex(value: &str) -> Result<StatusPatch, DecodeError> {
    match value {
        "ON" => Ok(StatusPatch {
            nanoex: Some(true),
            ..StatusPatch::default()
        }),
        "OFF" => Ok(StatusPatch {
            nanoex: Some(false),
            ..StatusPatch::default()
        }),
        other => Err(invalid("nanoex", other)),
    }
}

fn parse_wind_direction(value: &str) -> Result<StatusPatch, DecodeError> {
    if value == "auto" {
        return Ok(StatusPatch {
            wind_direction: Some(0),
            ..StatusPatch::default()
        });
    }
    let n: u8 = value
        .parse()
        .map_err(|_| invalid("wind_direction", value))?;
    if !WIND_DIRECTIONS.contains(&n) {
        return Err(invalid("wind_direction", value));
    }
    Ok(StatusPatch {
        wind_direction: Some(n),
        ..StatusPatch::default()
    })
}

fn parse_wind_direction_horizon(value: &str) -> Result<StatusPatch, DecodeError> {
    let horizon = WindDirectionHorizon::from_name(value)
        .ok_or_else(|| invalid("wind_direction_horizon", value))?;
    Ok(StatusPatch {
        wind_direction_horizon: Some(horizon),
        ..StatusPatch::default()
    })
}

fn parse_off_timer(value: &str) -> Result<StatusPatch, DecodeError> {
    if value == "off" {
        return Ok(StatusPatch {
            timer_value: Some(0),
            ..StatusPatch::default()
        });
    }
    let minutes: u16 = value
        .strip_suffix("min")
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| invalid("off_timer", value))?;
    if minutes == 0 || !TIMER_VALUES.contains(&minutes) {
        return Err(invalid("off_timer", value));
    }
    Ok(StatusPatch {
        timer_value: Some(minutes),
        ..StatusPatch::default()
    })
}

fn invalid(property: &'static str, value: &str) -> DecodeError {
    DecodeError::InvalidValue {
        property,
        value: value.to_string(),
    }
}

// ---------------------------------------------------------------------------
// 转换器
// ---------------------------------------------------------------------------

fn format_power(status: &Status) -> String {
    if status.operation_status { "ON" } else { "OFF" }.to_string()
}

fn format_mode(status: &Status) -> String {
    if !status.operation_status {
        return "off".to_string();
    }
    let mode = match status.operation_mode {
        OperationMode::Auto => "auto",
        OperationMode::Cooling => "cool",
        OperationMode::Heating => "heat",
        // 多个原生模式折叠为公开值 dry / fan_only
        OperationMode::CoolDehumidifying
        | OperationMode::ComfortableDehumidification
        | OperationMode::ClothesDryer => "dry",
        OperationMode::Blast | OperationMode::Nanoe => "fan_only",
        OperationMode::Stop | OperationMode::Cleaning | OperationMode::NanoexCleaning => "off",
    };
    mode.to_string()
}

fn format_temperature(status: &Status) -> String {
    if status.operation_status && status.operation_mode.supports_temperature() {
        format_number(status.temperature)
    } else {
        "0".to_string()
    }
}

fn format_fan_mode(status: &Status) -> String {
    if status.air_flow != AirFlow::NotSet {
        return status.air_flow.as_str().to_string();
    }
    match status.wind_volume {
        2 => "1",
        3 => "2",
        4 => "3",
        5 => "4",
        _ => "auto",
    }
    .to_string()
}

fn format_swing_mode(status: &Status) -> String {
    if status.wind_direction == 0 { "on" } else { "off" }.to_string()
}

/// preset 表示按优先级链：
/// 清扫中 > 外出清扫 > 电源 OFF > AI 控制 > "none"。
fn format_preset_mode(status: &Status) -> String {
    let preset = match status.operation_mode {
        OperationMode::Cleaning => "cleaning",
        OperationMode::NanoexCleaning => "away",
        _ if !status.operation_status => "none",
        _ => match status.ai_control {
            AiControl::Comfortable => "comfort",
            AiControl::ComfortableEconavi => "eco",
            AiControl::Off => "none",
        },
    };
    preset.to_string()
}

fn format_nanoex(status: &Status) -> String {
    if status.nanoex { "ON" } else { "OFF" }.to_string()
}

fn format_wind_direction(status: &Status) -> String {
    if status.wind_direction == 0 {
        "auto".to_string()
    } else {
        status.wind_direction.to_string()
    }
}

fn format_off_timer(status: &Status) -> String {
    if status.timer_value == 0 {
        "off".to_string()
    } else {
        format!("{}min", status.timer_value)
    }
}

fn format_outside_temperature(status: &Status) -> String {
    if status.outside_temp == OUTSIDE_TEMP_UNKNOWN {
        "unknown".to_string()
    } else {
        format_number(status.outside_temp)
    }
}

/// 整数值不带小数点输出（25.0 → "25"、23.5 → "23.5"）。
fn format_number(value: f64) -> String {
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> Status {
        Status {
            appliance_id: "appliance-1".to_string(),
            operation_status: true,
            operation_mode: OperationMode::Cooling,
            temperature: 24.0,
            ai_control: AiControl::Comfortable,
            air_flow: AirFlow::NotSet,
            wind_volume: 4,
            wind_direction: 0,
            wind_direction_horizon: WindDirectionHorizon::Front,
            timer_value: 0,
            nanoex: false,
            inside_temp: 26.5,
            inside_humidity: 55.0,
            outside_temp: 18.0,
            operation_token: None,
        }
    }

    #[test]
    fn unknown_property_rejected_before_dispatch() {
        assert_eq!(
            Property::from_name("boost"),
            Err(DecodeError::UnknownProperty("boost".to_string()))
        );
    }

    #[test]
    fn sensor_properties_reject_commands() {
        assert_eq!(
            Property::OutsideTemperature.parse("20"),
            Err(DecodeError::ReadOnly("outside_temperature"))
        );
    }

    #[test]
    fn off_timer_enumeration_is_closed() {
        assert_eq!(
            Property::OffTimer.parse("90min").unwrap().timer_value,
            Some(90)
        );
        assert_eq!(Property::OffTimer.parse("off").unwrap().timer_value, Some(0));
        // 45 不在 {30,60,90,120} 内
        assert!(Property::OffTimer.parse("45min").is_err());
        assert!(Property::OffTimer.parse("0min").is_err());
        assert!(Property::OffTimer.parse("min").is_err());
    }

    #[test]
    fn mode_parse_maps_public_vocabulary() {
        assert_eq!(
            Property::Mode.parse("dry").unwrap().operation_mode,
            Some(OperationMode::CoolDehumidifying)
        );
        assert_eq!(
            Property::Mode.parse("fan_only").unwrap().operation_mode,
            Some(OperationMode::Nanoe)
        );
        assert_eq!(
            Property::Mode.parse("off").unwrap().operation_mode,
            Some(OperationMode::Stop)
        );
        assert!(Property::Mode.parse("dry_only").is_err());
    }

    #[test]
    fn mode_format_collapses_native_modes() {
        let mut s = status();
        s.operation_mode = OperationMode::ClothesDryer;
        assert_eq!(Property::Mode.format(&s), "dry");
        s.operation_mode = OperationMode::Blast;
        assert_eq!(Property::Mode.format(&s), "fan_only");
        s.operation_status = false;
        assert_eq!(Property::Mode.format(&s), "off");
    }

    #[test]
    fn fan_mode_maps_volume_levels() {
        assert_eq!(Property::FanMode.parse("3").unwrap().wind_volume, Some(4));
        assert_eq!(Property::FanMode.parse("auto").unwrap().wind_volume, Some(0));
        assert_eq!(
            Property::FanMode.parse("powerful").unwrap().air_flow,
            Some(AirFlow::Powerful)
        );
        // not_set 不作为入站值接受
        assert!(Property::FanMode.parse("not_set").is_err());

        let mut s = status();
        assert_eq!(Property::FanMode.format(&s), "3");
        s.air_flow = AirFlow::Quiet;
        assert_eq!(Property::FanMode.format(&s), "quiet");
    }

    #[test]
    fn preset_mode_priority_chain() {
        let mut s = status();
        assert_eq!(Property::PresetMode.format(&s), "comfort");
        s.ai_control = AiControl::ComfortableEconavi;
        assert_eq!(Property::PresetMode.format(&s), "eco");
        s.operation_status = false;
        assert_eq!(Property::PresetMode.format(&s), "none");
        s.operation_mode = OperationMode::NanoexCleaning;
        assert_eq!(Property::PresetMode.format(&s), "away");
        s.operation_mode = OperationMode::Cleaning;
        assert_eq!(Property::PresetMode.format(&s), "cleaning");
    }

    #[test]
    fn outside_temperature_sentinel_is_unknown() {
        let mut s = status();
        assert_eq!(Property::OutsideTemperature.format(&s), "18");
        s.outside_temp = 999.0;
        assert_eq!(Property::OutsideTemperature.format(&s), "unknown");
    }

    #[test]
    fn temperature_hidden_outside_supported_modes() {
        let mut s = status();
        assert_eq!(Property::Temperature.format(&s), "24");
        s.operation_mode = OperationMode::Blast;
        assert_eq!(Property::Temperature.format(&s), "0");
        s.operation_mode = OperationMode::Cooling;
        s.operation_status = false;
        assert_eq!(Property::Temperature.format(&s), "0");
    }

    #[test]
    fn temperature_parse_bounds() {
        assert!(Property::Temperature.parse("15.5").is_err());
        assert!(Property::Temperature.parse("30.5").is_err());
        assert!(Property::Temperature.parse("warm").is_err());
        assert_eq!(
            Property::Temperature.parse("23.5").unwrap().temperature,
            Some(23.5)
        );
    }

    #[test]
    fn swing_and_wind_direction_values() {
        assert_eq!(
            Property::SwingMode.parse("on").unwrap().wind_direction,
            Some(0)
        );
        assert_eq!(
            Property::SwingMode.parse("off").unwrap().wind_direction,
            Some(3)
        );
        assert_eq!(
            Property::WindDirection.parse("auto").unwrap().wind_direction,
            Some(0)
        );
        assert_eq!(
            Property::WindDirection.parse("5").unwrap().wind_direction,
            Some(5)
        );
        assert!(Property::WindDirection.parse("6").is_err());
    }
}
