//! 季节自动模式判定
//!
//! 纯函数：给定日期与室内温湿度，返回建议的运转模式。
//! 制冷季 6/16 - 9/15；制热季 1/1 - 3/31 与 11/1 - 12/31。

use chrono::{Datelike, NaiveDate};
use domain::OperationMode;

pub const HOT_TEMP_THRESHOLD: f64 = 28.0;
pub const COLD_TEMP_THRESHOLD: f64 = 20.0;
/// 制冷季内湿度达到该值时改用冷房除湿。
pub const HUMIDITY_DEHUMIDIFY_THRESHOLD: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Season {
    Cooling,
    Heating,
}

fn season_for(date: NaiveDate) -> Option<Season> {
    let month_day = (date.month(), date.day());
    if ((6, 16)..=(9, 15)).contains(&month_day) {
        Some(Season::Cooling)
    } else if month_day <= (3, 31) || month_day >= (11, 1) {
        Some(Season::Heating)
    } else {
        None
    }
}

/// 判定是否应自动开机及目标模式。不满足任一条件时返回 None。
pub fn judge(date: NaiveDate, inside_temp: f64, inside_humidity: f64) -> Option<OperationMode> {
    match season_for(date)? {
        Season::Cooling if inside_temp > HOT_TEMP_THRESHOLD => {
            if inside_humidity >= HUMIDITY_DEHUMIDIFY_THRESHOLD {
                Some(OperationMode::CoolDehumidifying)
            } else {
                Some(OperationMode::Cooling)
            }
        }
        Season::Heating if inside_temp < COLD_TEMP_THRESHOLD => Some(OperationMode::Heating),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn cooling_season_hot_day_selects_cooling() {
        assert_eq!(
            judge(date(2024, 7, 20), 30.0, 50.0),
            Some(OperationMode::Cooling)
        );
    }

    #[test]
    fn cooling_season_humid_day_selects_dehumidify() {
        assert_eq!(
            judge(date(2024, 8, 1), 29.0, 80.0),
            Some(OperationMode::CoolDehumidifying)
        );
        // 阈值本身算湿
        assert_eq!(
            judge(date(2024, 8, 1), 29.0, 75.0),
            Some(OperationMode::CoolDehumidifying)
        );
    }

    #[test]
    fn heating_season_cold_day_selects_heating() {
        assert_eq!(
            judge(date(2024, 1, 15), 15.0, 40.0),
            Some(OperationMode::Heating)
        );
        assert_eq!(
            judge(date(2024, 12, 31), 19.9, 40.0),
            Some(OperationMode::Heating)
        );
    }

    #[test]
    fn season_boundaries() {
        // 制冷季边界
        assert_eq!(judge(date(2024, 6, 16), 30.0, 50.0), Some(OperationMode::Cooling));
        assert_eq!(judge(date(2024, 9, 15), 30.0, 50.0), Some(OperationMode::Cooling));
        assert_eq!(judge(date(2024, 6, 15), 30.0, 50.0), None);
        assert_eq!(judge(date(2024, 9, 16), 30.0, 50.0), None);
        // 制热季边界
        assert_eq!(judge(date(2024, 3, 31), 10.0, 40.0), Some(OperationMode::Heating));
        assert_eq!(judge(date(2024, 4, 1), 10.0, 40.0), None);
        assert_eq!(judge(date(2024, 11, 1), 10.0, 40.0), Some(OperationMode::Heating));
        assert_eq!(judge(date(2024, 10, 31), 10.0, 40.0), None);
    }

    #[test]
    fn threshold_not_crossed_is_noop() {
        assert_eq!(judge(date(2024, 7, 20), 28.0, 80.0), None);
        assert_eq!(judge(date(2024, 1, 15), 20.0, 40.0), None);
    }
}
