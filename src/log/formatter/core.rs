use crate::log::record::LogRecord;
use anyhow::Result;
use serde::Deserialize;
use std::fmt;

/// 日志格式化器 trait
///
/// 负责将 LogRecord 渲染为字符串，不产生副作用
pub trait LogFormatter: Send + Sync {
    /// 格式化日志记录
    fn format(&self, record: &LogRecord) -> Result<String>;
}

/// blob appender 的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
    Text,
    /// 与 `Text` 输出相同，blob 扩展名保留配置里写的 `string`
    String,
}

impl OutputFormat {
    /// 文件扩展名
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Xml => "xml",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
            OutputFormat::String => "string",
        }
    }

    /// 该格式对应的默认格式化器
    pub fn formatter(&self) -> Box<dyn LogFormatter> {
        use super::{JsonFormatter, TextFormatter, XmlFormatter};

        match self {
            OutputFormat::Xml => Box::new(XmlFormatter::new(Default::default())),
            OutputFormat::Json => Box::new(JsonFormatter::new(Default::default())),
            OutputFormat::Text | OutputFormat::String => {
                Box::new(TextFormatter::new(Default::default()))
            }
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 事件时间的统一文本格式：`MM/dd/yyyy HH:mm:ss`
pub(crate) fn format_timestamp(record: &LogRecord) -> String {
    record.timestamp.format("%m/%d/%Y %H:%M:%S").to_string()
}

/// JSON / 文本格式共用的消息拼接：有异常时追加异常和位置
pub(crate) fn message_with_exception(record: &LogRecord) -> String {
    match record.exception.as_deref() {
        Some(exception) if !exception.is_empty() => format!(
            "{} | Exception: {} | Location: {}",
            record.message,
            exception,
            record.location_text()
        ),
        _ => record.message.clone(),
    }
}
