//! 时间戳与时长工具
//!
//! 注解中交换的时间戳固定使用 `YYYY-MM-DD HH:MM:SS` 格式（无时区、无小数秒），
//! 生产方与消费方都必须使用 [`TIMESTAMP_FORMAT`] 解析和格式化。

use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::InspectorResult;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> InspectorResult<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)?;
    Ok(naive.and_utc())
}

/// 解析任务超时时间（如 `10m`、`1h30m`），缺失或无法解析时回退到默认值
pub fn parse_timeout(value: Option<&str>, default: Duration) -> Duration {
    value
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| humantime::parse_duration(v.trim()).ok())
        .unwrap_or(default)
}

/// 以 `1h2m3s` 形式输出时长，精度到秒
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    if hours > 0 {
        format!("{sign}{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{sign}{minutes}m{seconds}s")
    } else {
        format!("{sign}{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_roundtrip() {
        let time = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let formatted = format_timestamp(&time);
        assert_eq!(formatted, "2024-03-09 07:05:01");
        assert_eq!(parse_timestamp(&formatted).unwrap(), time);
    }

    #[test]
    fn test_parse_timestamp_rejects_other_formats() {
        assert!(parse_timestamp("2024-03-09T07:05:01Z").is_err());
        assert!(parse_timestamp("2024-03-09 07:05:01.123").is_err());
    }

    #[test]
    fn test_parse_timeout() {
        let default = Duration::from_secs(600);
        assert_eq!(parse_timeout(Some("45s"), default), Duration::from_secs(45));
        assert_eq!(parse_timeout(Some("10m"), default), Duration::from_secs(600));
        assert_eq!(parse_timeout(Some("1h30m"), default), Duration::from_secs(5400));
        assert_eq!(parse_timeout(Some("soon"), default), default);
        assert_eq!(parse_timeout(Some(""), default), default);
        assert_eq!(parse_timeout(None, default), default);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(chrono::Duration::seconds(0)), "0s");
        assert_eq!(format_duration(chrono::Duration::seconds(90)), "1m30s");
        assert_eq!(format_duration(chrono::Duration::seconds(3605)), "1h0m5s");
        assert_eq!(format_duration(chrono::Duration::seconds(-5)), "-5s");
    }
}
