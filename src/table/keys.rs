//! 分区键与行键
//!
//! 表存储按键的字典序升序返回数据。键里的时间部分用
//! `MAX_TICKS - ticks` 倒序编码，这样较新的事件排在前面。

use chrono::{DateTime, Timelike, Utc};
use serde::Deserialize;

use crate::log::LogRecord;

/// 时间刻度上限（100ns 为单位，自 0001-01-01 起到 9999-12-31 末）
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

/// Unix 纪元对应的时间刻度
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// 分区键策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionKeyType {
    /// 以 logger 名称分区
    #[default]
    LoggerName,
    /// 以事件所在小时倒序分区，每个分区覆盖一个小时
    DateReverse,
}

impl PartitionKeyType {
    /// 计算记录的分区键
    pub fn partition_key(&self, record: &LogRecord) -> String {
        match self {
            PartitionKeyType::LoggerName => record.logger_name.clone(),
            PartitionKeyType::DateReverse => {
                let hour = truncate_to_hour(record.timestamp);
                format!("{:019}", MAX_TICKS - ticks(hour) + 1)
            }
        }
    }
}

/// 时间点对应的刻度数（100ns 为单位，自 0001-01-01 起）
pub fn ticks(timestamp: DateTime<Utc>) -> i64 {
    UNIX_EPOCH_TICKS
        + timestamp.timestamp() * 10_000_000
        + i64::from(timestamp.timestamp_subsec_nanos() / 100)
}

fn truncate_to_hour(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}

/// 生成行键：倒序时间 + 随机 uuid，保证同一时刻的事件也不冲突
pub fn row_key(record: &LogRecord) -> String {
    format!(
        "{:019}.{}",
        MAX_TICKS - ticks(record.timestamp),
        uuid::Uuid::new_v4().as_hyphenated()
    )
}

/// 分片行键：`{base}.{reverse_sequence:05}`
///
/// 最后一个分片后缀最小，按行键降序读取即可按原顺序拼回消息。
pub fn fragment_row_key(base_row_key: &str, index: usize, total: usize) -> String {
    format!("{}.{:05}", base_row_key, total - index - 1)
}
