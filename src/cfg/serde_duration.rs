use anyhow::{anyhow, Result};
use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

// 重新导出serde_with
pub use serde_with::{serde_as, DeserializeAs, SerializeAs};

/// 配置中时长字段的格式化器
///
/// 支持两种写法：
/// - 人性化格式: "5s", "100ms", "1m", "1h30m"
/// - 时间跨度格式: "00:00:05", "1.02:00:00"（[d.]hh:mm:ss[.fff]）
pub struct HumanDur;

impl SerializeAs<Duration> for HumanDur {
    fn serialize_as<S>(source: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_duration(*source))
    }
}

impl<'de> DeserializeAs<'de, Duration> for HumanDur {
    fn deserialize_as<D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

/// 解析时长字符串，自动识别两种格式
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(anyhow!("空字符串"));
    }
    if s.contains(':') {
        parse_timespan(s)
    } else {
        parse_human(&s.to_lowercase())
    }
}

/// 解析 "1h30m45s" 形式
fn parse_human(s: &str) -> Result<Duration> {
    let mut total = Duration::ZERO;
    let mut rest = s;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return Err(anyhow!("期望数字: {}", s));
        }
        let value: f64 = rest[..num_end]
            .parse()
            .map_err(|_| anyhow!("无效数字: {}", &rest[..num_end]))?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(rest.len());
        if unit_end == 0 {
            return Err(anyhow!("缺少时间单位: {}", s));
        }
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let secs = match unit {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            "d" => value * 86400.0,
            _ => return Err(anyhow!("不支持的时间单位: {}", unit)),
        };
        total += Duration::from_secs_f64(secs);
    }

    Ok(total)
}

/// 解析 "[d.]hh:mm:ss[.fff]" 形式
fn parse_timespan(s: &str) -> Result<Duration> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(anyhow!("无效时间跨度: {}", s));
    }

    let (days, hours) = match parts[0].split_once('.') {
        Some((d, h)) => (parse_field(d, s)?, parse_field(h, s)?),
        None => (0, parse_field(parts[0], s)?),
    };
    let minutes = parse_field(parts[1], s)?;
    if hours >= 24 || minutes >= 60 {
        return Err(anyhow!("时间跨度字段越界: {}", s));
    }

    let seconds: f64 = parts[2]
        .parse()
        .map_err(|_| anyhow!("无效秒数: {}", parts[2]))?;
    if !(0.0..60.0).contains(&seconds) {
        return Err(anyhow!("时间跨度字段越界: {}", s));
    }

    Ok(Duration::from_secs(days * 86400 + hours * 3600 + minutes * 60)
        + Duration::from_secs_f64(seconds))
}

fn parse_field(field: &str, whole: &str) -> Result<u64> {
    field
        .parse()
        .map_err(|_| anyhow!("无效时间跨度: {}", whole))
}

/// 格式化为人性化字符串: Duration -> "1h30m45s"
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs == 0 {
        return format!("{}ms", millis);
    }

    let mut out = String::new();
    let mut remaining = total_secs;
    for (unit, size) in [("d", 86400), ("h", 3600), ("m", 60)] {
        if remaining >= size {
            out.push_str(&format!("{}{}", remaining / size, unit));
            remaining %= size;
        }
    }

    if millis > 0 {
        out.push_str(&format!("{}ms", remaining * 1000 + millis as u64));
    } else if remaining > 0 {
        out.push_str(&format!("{}s", remaining));
    }

    out
}
