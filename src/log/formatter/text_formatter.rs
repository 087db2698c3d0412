use crate::log::formatter::core::{format_timestamp, message_with_exception};
use crate::log::formatter::LogFormatter;
use crate::log::record::LogRecord;
use anyhow::Result;
use serde::Deserialize;
use smart_default::SmartDefault;

/// TextFormatter 配置
#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default)]
pub struct TextFormatterConfig {
    /// 行尾是否追加换行
    #[default = true]
    pub line_feed: bool,
}

/// 文本格式化器
///
/// 格式: `Time : … | Level : … | AppName : … | Logger : … | Thread : … | Message : …`
pub struct TextFormatter {
    config: TextFormatterConfig,
}

impl TextFormatter {
    pub fn new(config: TextFormatterConfig) -> Self {
        Self { config }
    }
}

impl LogFormatter for TextFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let mut result = format!(
            "Time : {} | Level : {} | AppName : {} | Logger : {} | Thread : {} | Message : {}",
            format_timestamp(record),
            record.level,
            record.domain,
            record.logger_name,
            record.thread_name,
            message_with_exception(record)
        );
        if self.config.line_feed {
            result.push('\n');
        }
        Ok(result)
    }
}

crate::impl_from!(TextFormatterConfig => TextFormatter);
crate::impl_box_from!(TextFormatter => dyn LogFormatter);
