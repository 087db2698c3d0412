use crate::log::formatter::core::{format_timestamp, message_with_exception};
use crate::log::formatter::LogFormatter;
use crate::log::record::LogRecord;
use anyhow::Result;
use serde::Deserialize;
use smart_default::SmartDefault;

/// JsonFormatter 配置（保留扩展性）
#[derive(Debug, Clone, Deserialize, PartialEq, SmartDefault)]
#[serde(default)]
pub struct JsonFormatterConfig {}

/// JSON 格式化器
///
/// 每条记录输出一行 `{date, level, appname, logger, thread, message}`
pub struct JsonFormatter {}

impl JsonFormatter {
    pub fn new(_: JsonFormatterConfig) -> Self {
        Self {}
    }
}

impl LogFormatter for JsonFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let value = serde_json::json!({
            "date": format_timestamp(record),
            "level": record.level.to_string(),
            "appname": record.domain,
            "logger": record.logger_name,
            "thread": record.thread_name,
            "message": message_with_exception(record),
        });
        Ok(format!("{}\n", serde_json::to_string(&value)?))
    }
}

crate::impl_from!(JsonFormatterConfig => JsonFormatter);
crate::impl_box_from!(JsonFormatter => dyn LogFormatter);
