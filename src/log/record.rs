use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogLevel {
    /// 最详细的日志
    Trace = 0,
    /// 调试信息
    Debug = 1,
    /// 一般信息
    Info = 2,
    /// 警告信息
    Warn = 3,
    /// 错误信息
    Error = 4,
    /// 致命错误
    Fatal = 5,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Fatal),
            _ => Err(format!("invalid log level: {}", s)),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Fatal => write!(f, "FATAL"),
        }
    }
}

/// 属性值，支持多种类型
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Null,
    /// 任意 JSON 兼容的数据
    Json(Value),
}

impl Serialize for PropertyValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            PropertyValue::String(s) => serializer.serialize_str(s),
            PropertyValue::I64(n) => serializer.serialize_i64(*n),
            PropertyValue::U64(n) => serializer.serialize_u64(*n),
            PropertyValue::F64(n) => serializer.serialize_f64(*n),
            PropertyValue::Bool(b) => serializer.serialize_bool(*b),
            PropertyValue::Null => serializer.serialize_none(),
            PropertyValue::Json(v) => v.serialize(serializer),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::I64(n) => write!(f, "{}", n),
            PropertyValue::U64(n) => write!(f, "{}", n),
            PropertyValue::F64(n) => write!(f, "{}", n),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Null => write!(f, "null"),
            PropertyValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::I64(n)
    }
}

impl From<i32> for PropertyValue {
    fn from(n: i32) -> Self {
        PropertyValue::I64(n as i64)
    }
}

impl From<u64> for PropertyValue {
    fn from(n: u64) -> Self {
        PropertyValue::U64(n)
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::F64(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<Value> for PropertyValue {
    fn from(v: Value) -> Self {
        PropertyValue::Json(v)
    }
}

/// 代码位置信息
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationInfo {
    pub class_name: String,
    pub method_name: String,
    pub file_name: String,
    pub line_number: String,
}

impl LocationInfo {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file_name: impl Into<String>,
        line_number: impl Into<String>,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file_name: file_name.into(),
            line_number: line_number.into(),
        }
    }

    /// 完整位置描述：`Class.method(file:line)`
    pub fn full_info(&self) -> String {
        format!(
            "{}.{}({}:{})",
            self.class_name, self.method_name, self.file_name, self.line_number
        )
    }
}

/// 日志记录
///
/// 由宿主日志框架产生，appender 只读不改。
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// 事件时间（UTC）
    pub timestamp: DateTime<Utc>,
    /// logger 名称
    pub logger_name: String,
    /// 日志级别
    pub level: LogLevel,
    /// 线程名称
    pub thread_name: String,
    /// 应用（域）名称
    pub domain: String,
    /// 调用方身份
    pub identity: String,
    /// 用户名
    pub user_name: String,
    /// 渲染后的日志消息
    pub message: String,
    /// 异常文本
    pub exception: Option<String>,
    /// 自定义属性（保持插入顺序）
    pub properties: Vec<(String, PropertyValue)>,
    /// 代码位置
    pub location: Option<LocationInfo>,
}

impl LogRecord {
    /// 创建新的日志记录
    pub fn new(level: LogLevel, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        let current = std::thread::current();
        let thread_name = current
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", current.id()));

        Self {
            timestamp: Utc::now(),
            logger_name: logger_name.into(),
            level,
            thread_name,
            domain: String::new(),
            identity: String::new(),
            user_name: String::new(),
            message: message.into(),
            exception: None,
            properties: Vec::new(),
            location: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    pub fn with_user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = user_name.into();
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// 添加属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    pub fn with_location(mut self, location: LocationInfo) -> Self {
        self.location = Some(location);
        self
    }

    /// 异常文本，没有异常时为空串
    pub fn exception_text(&self) -> &str {
        self.exception.as_deref().unwrap_or("")
    }

    /// 位置描述，没有位置信息时为空串
    pub fn location_text(&self) -> String {
        self.location
            .as_ref()
            .map(LocationInfo::full_info)
            .unwrap_or_default()
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.iter().any(|(k, _)| k == key)
    }

    /// 属性渲染为 `{k:v, k:v}`，没有属性时为 `{}`
    pub fn properties_text(&self) -> String {
        let body = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{}}}", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("trace").unwrap(), LogLevel::Trace);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("Warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("critical").unwrap(), LogLevel::Fatal);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_level_ordering_and_display() {
        assert!(LogLevel::Fatal > LogLevel::Error);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert_eq!(LogLevel::Warn.to_string(), "WARN");
        assert_eq!(LogLevel::Fatal.to_string(), "FATAL");
    }

    #[test]
    fn test_log_record_builder() {
        let record = LogRecord::new(LogLevel::Error, "app.db", "connection lost")
            .with_domain("billing")
            .with_thread_name("worker-1")
            .with_exception("timeout")
            .with_property("attempt", 3)
            .with_property("host", "db01")
            .with_location(LocationInfo::new("Pool", "acquire", "pool.rs", "88"));

        assert_eq!(record.logger_name, "app.db");
        assert_eq!(record.domain, "billing");
        assert_eq!(record.thread_name, "worker-1");
        assert_eq!(record.exception_text(), "timeout");
        assert_eq!(record.location_text(), "Pool.acquire(pool.rs:88)");
        assert!(record.has_property("host"));
        assert_eq!(record.properties_text(), "{attempt:3, host:db01}");
    }

    #[test]
    fn test_log_record_defaults() {
        let record = LogRecord::new(LogLevel::Info, "app", "hello");
        assert!(record.exception.is_none());
        assert_eq!(record.exception_text(), "");
        assert_eq!(record.location_text(), "");
        assert_eq!(record.properties_text(), "{}");
        assert!(!record.thread_name.is_empty());
    }

    #[test]
    fn test_property_value_serialize() {
        assert_eq!(serde_json::to_string(&PropertyValue::I64(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&PropertyValue::Null).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&PropertyValue::from(serde_json::json!({"a": 1}))).unwrap(),
            r#"{"a":1}"#
        );
    }
}
