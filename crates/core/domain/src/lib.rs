//! 领域模型：Eolia 空调的状态值对象与枚举词汇。

mod patch;
mod status;

pub use patch::StatusPatch;
pub use status::{AiControl, AirFlow, OperationMode, Status, WindDirectionHorizon};

/// 设定温度下限（℃）。
pub const MIN_TEMPERATURE: f64 = 16.0;

/// 设定温度上限（℃）。
pub const MAX_TEMPERATURE: f64 = 30.0;

/// 无历史快照时的默认设定温度。
pub const DEFAULT_TEMPERATURE: f64 = 20.0;

/// 有效风量档位（0 = 自动）。
pub const WIND_VOLUMES: [u8; 5] = [0, 2, 3, 4, 5];

/// 有效上下风向档位（0 = 自动摆动）。
pub const WIND_DIRECTIONS: [u8; 6] = [0, 1, 2, 3, 4, 5];

/// 有效切タイマー值（分钟）。
pub const TIMER_VALUES: [u16; 5] = [0, 30, 60, 90, 120];

/// 室外温度传感器不可用时上报的哨兵值。
pub const OUTSIDE_TEMP_UNKNOWN: f64 = 999.0;
