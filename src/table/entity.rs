//! 表实体模型
//!
//! 一条日志记录对应一个 [`StorageEntity`]，消息超长时对应多个分片。
//! 负载按三种结构区分：固定列、动态列（属性提升为列）、布局渲染后的单条消息。

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use super::keys::{self, PartitionKeyType};
use crate::error::AppenderError;
use crate::log::formatter::LogFormatter;
use crate::log::{LogRecord, PropertyValue};

/// 消息列名
pub const MESSAGE_COLUMN: &str = "Message";

/// 表实体的列值
#[derive(Debug, Clone, PartialEq)]
pub enum EntityProperty {
    String(String),
    Bool(bool),
    I64(i64),
    Double(f64),
    DateTime(DateTime<Utc>),
    Null,
}

impl Serialize for EntityProperty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            EntityProperty::String(s) => serializer.serialize_str(s),
            EntityProperty::Bool(b) => serializer.serialize_bool(*b),
            EntityProperty::I64(n) => serializer.serialize_i64(*n),
            EntityProperty::Double(n) => serializer.serialize_f64(*n),
            EntityProperty::DateTime(t) => serializer.serialize_str(&t.to_rfc3339()),
            EntityProperty::Null => serializer.serialize_none(),
        }
    }
}

impl fmt::Display for EntityProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityProperty::String(s) => write!(f, "{}", s),
            EntityProperty::Bool(b) => write!(f, "{}", b),
            EntityProperty::I64(n) => write!(f, "{}", n),
            EntityProperty::Double(n) => write!(f, "{}", n),
            EntityProperty::DateTime(t) => write!(f, "{}", t.to_rfc3339()),
            EntityProperty::Null => Ok(()),
        }
    }
}

impl From<&PropertyValue> for EntityProperty {
    fn from(value: &PropertyValue) -> Self {
        match value {
            PropertyValue::String(s) => EntityProperty::String(s.clone()),
            PropertyValue::I64(n) => EntityProperty::I64(*n),
            // 超出 i64 的无符号数只能按文本保存
            PropertyValue::U64(n) => i64::try_from(*n)
                .map(EntityProperty::I64)
                .unwrap_or_else(|_| EntityProperty::String(n.to_string())),
            PropertyValue::F64(n) => EntityProperty::Double(*n),
            PropertyValue::Bool(b) => EntityProperty::Bool(*b),
            PropertyValue::Null => EntityProperty::Null,
            PropertyValue::Json(v) => EntityProperty::String(v.to_string()),
        }
    }
}

impl From<String> for EntityProperty {
    fn from(s: String) -> Self {
        EntityProperty::String(s)
    }
}

impl From<&str> for EntityProperty {
    fn from(s: &str) -> Self {
        EntityProperty::String(s.to_string())
    }
}

/// 固定结构的事件列
#[derive(Debug, Clone, PartialEq)]
pub struct EventColumns {
    pub event_time_stamp: DateTime<Utc>,
    pub level: String,
    pub logger_name: String,
    pub domain: String,
    pub identity: String,
    pub thread_name: String,
    pub user_name: String,
    pub message: String,
    pub exception: String,
    pub location: String,
    pub class_name: String,
    pub method_name: String,
    pub file_name: String,
    pub line_number: String,
    pub properties: String,
    pub sequence_number: i64,
}

/// 布局渲染后的事件
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEvent {
    pub event_time_stamp: DateTime<Utc>,
    pub message: String,
    pub sequence_number: i64,
}

/// 实体负载
#[derive(Debug, Clone, PartialEq)]
pub enum EntityPayload {
    Fixed(EventColumns),
    /// 有序的动态列，同名列后写覆盖先写
    Dynamic(Vec<(String, EntityProperty)>),
    Rendered(RenderedEvent),
}

/// 待写入表存储的实体
#[derive(Debug, Clone, PartialEq)]
pub struct StorageEntity {
    pub partition_key: String,
    pub row_key: String,
    pub payload: EntityPayload,
}

impl StorageEntity {
    /// 提取实体中的消息文本
    ///
    /// 动态实体必须带字符串类型的 `Message` 列，否则视为无法识别的实体结构。
    pub fn message(&self) -> Result<&str, AppenderError> {
        match &self.payload {
            EntityPayload::Fixed(columns) => Ok(&columns.message),
            EntityPayload::Rendered(event) => Ok(&event.message),
            EntityPayload::Dynamic(columns) => columns
                .iter()
                .find(|(name, _)| name == MESSAGE_COLUMN)
                .and_then(|(_, value)| match value {
                    EntityProperty::String(s) => Some(s.as_str()),
                    _ => None,
                })
                .ok_or_else(|| {
                    AppenderError::UnsupportedEntityShape(format!(
                        "dynamic entity {}/{} has no string {} column",
                        self.partition_key, self.row_key, MESSAGE_COLUMN
                    ))
                }),
        }
    }

    /// 展开为列名到列值的有序列表（不含分区键和行键）
    pub fn to_properties(&self) -> Vec<(String, EntityProperty)> {
        match &self.payload {
            EntityPayload::Fixed(c) => vec![
                column("EventTimeStamp", EntityProperty::DateTime(c.event_time_stamp)),
                column("Level", c.level.as_str()),
                column("LoggerName", c.logger_name.as_str()),
                column("Domain", c.domain.as_str()),
                column("Identity", c.identity.as_str()),
                column("ThreadName", c.thread_name.as_str()),
                column("UserName", c.user_name.as_str()),
                column(MESSAGE_COLUMN, c.message.as_str()),
                column("Exception", c.exception.as_str()),
                column("Location", c.location.as_str()),
                column("ClassName", c.class_name.as_str()),
                column("MethodName", c.method_name.as_str()),
                column("FileName", c.file_name.as_str()),
                column("LineNumber", c.line_number.as_str()),
                column("Properties", c.properties.as_str()),
                column("SequenceNumber", EntityProperty::I64(c.sequence_number)),
            ],
            EntityPayload::Dynamic(columns) => columns.clone(),
            EntityPayload::Rendered(e) => vec![
                column("EventTimeStamp", EntityProperty::DateTime(e.event_time_stamp)),
                column(MESSAGE_COLUMN, e.message.as_str()),
                column("SequenceNumber", EntityProperty::I64(e.sequence_number)),
            ],
        }
    }
}

fn column(name: &str, value: impl Into<EntityProperty>) -> (String, EntityProperty) {
    (name.to_string(), value.into())
}

fn set_column(columns: &mut Vec<(String, EntityProperty)>, name: &str, value: EntityProperty) {
    match columns.iter_mut().find(|(n, _)| n == name) {
        Some((_, existing)) => *existing = value,
        None => columns.push((name.to_string(), value)),
    }
}

/// 实体构造器
///
/// `layout` 存在时输出渲染后的单条消息；否则 `prop_as_column` 决定用动态列还是固定列。
#[derive(Clone)]
pub struct EntityFactory {
    pub partition_key_type: PartitionKeyType,
    pub prop_as_column: bool,
    pub layout: Option<Arc<dyn LogFormatter>>,
    pub max_message_size: usize,
}

impl fmt::Debug for EntityFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityFactory")
            .field("partition_key_type", &self.partition_key_type)
            .field("prop_as_column", &self.prop_as_column)
            .field("layout", &self.layout.is_some())
            .field("max_message_size", &self.max_message_size)
            .finish()
    }
}

impl Default for EntityFactory {
    fn default() -> Self {
        Self {
            partition_key_type: PartitionKeyType::default(),
            prop_as_column: false,
            layout: None,
            max_message_size: 16000,
        }
    }
}

impl EntityFactory {
    /// 构造记录的规范实体：计算分区键和行键，消息取完整内容
    pub fn canonical_entity(&self, record: &LogRecord) -> Result<StorageEntity, AppenderError> {
        let message = self.full_message(record)?;
        Ok(StorageEntity {
            partition_key: self.partition_key_type.partition_key(record),
            row_key: keys::row_key(record),
            payload: self.payload(record, message, 0),
        })
    }

    /// 构造携带指定消息片段和序号的负载
    pub(crate) fn payload(
        &self,
        record: &LogRecord,
        message: String,
        sequence_number: i64,
    ) -> EntityPayload {
        if self.layout.is_some() {
            return EntityPayload::Rendered(RenderedEvent {
                event_time_stamp: record.timestamp,
                message,
                sequence_number,
            });
        }

        if self.prop_as_column {
            return EntityPayload::Dynamic(dynamic_columns(record, message, sequence_number));
        }

        let location = record.location.clone().unwrap_or_default();
        EntityPayload::Fixed(EventColumns {
            event_time_stamp: record.timestamp,
            level: record.level.to_string(),
            logger_name: record.logger_name.clone(),
            domain: record.domain.clone(),
            identity: record.identity.clone(),
            thread_name: record.thread_name.clone(),
            user_name: record.user_name.clone(),
            message,
            exception: record.exception_text().to_string(),
            location: record.location_text(),
            class_name: location.class_name,
            method_name: location.method_name,
            file_name: location.file_name,
            line_number: location.line_number,
            properties: record.properties_text(),
            sequence_number,
        })
    }

    fn full_message(&self, record: &LogRecord) -> Result<String, AppenderError> {
        match &self.layout {
            Some(layout) => Ok(layout.format(record)?),
            None => Ok(record.message.clone()),
        }
    }
}

fn dynamic_columns(
    record: &LogRecord,
    message: String,
    sequence_number: i64,
) -> Vec<(String, EntityProperty)> {
    let mut columns = vec![
        column("EventTimeStamp", EntityProperty::DateTime(record.timestamp)),
        column("Level", record.level.to_string()),
        column("LoggerName", record.logger_name.as_str()),
        column("Domain", record.domain.as_str()),
        column("Identity", record.identity.as_str()),
        column("ThreadName", record.thread_name.as_str()),
        column("UserName", record.user_name.as_str()),
        column(MESSAGE_COLUMN, message),
        column("SequenceNumber", EntityProperty::I64(sequence_number)),
    ];

    if let Some(exception) = &record.exception {
        set_column(&mut columns, "Exception", exception.as_str().into());
    }
    if let Some(location) = &record.location {
        set_column(&mut columns, "Location", location.full_info().into());
    }

    // 内置列不被同名属性覆盖，属性之间后写覆盖先写
    let builtin = columns.len();
    for (key, value) in &record.properties {
        if columns[..builtin].iter().any(|(name, _)| name == key) {
            continue;
        }
        set_column(&mut columns, key, value.into());
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::formatter::{JsonFormatter, JsonFormatterConfig};
    use crate::log::{LocationInfo, LogLevel};

    fn record() -> LogRecord {
        LogRecord::new(LogLevel::Warn, "app.cache", "cache miss")
            .with_domain("shop")
            .with_property("key", "user:42")
            .with_property("hits", 7)
            .with_location(LocationInfo::new("Cache", "get", "cache.rs", "12"))
    }

    #[test]
    fn test_fixed_entity() {
        let factory = EntityFactory::default();
        let entity = factory.canonical_entity(&record()).unwrap();

        assert_eq!(entity.partition_key, "app.cache");
        assert_eq!(entity.message().unwrap(), "cache miss");
        match &entity.payload {
            EntityPayload::Fixed(columns) => {
                assert_eq!(columns.level, "WARN");
                assert_eq!(columns.domain, "shop");
                assert_eq!(columns.class_name, "Cache");
                assert_eq!(columns.location, "Cache.get(cache.rs:12)");
                assert_eq!(columns.properties, "{key:user:42, hits:7}");
                assert_eq!(columns.sequence_number, 0);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
        assert_eq!(entity.to_properties().len(), 16);
    }

    #[test]
    fn test_dynamic_entity_promotes_properties() {
        let factory = EntityFactory {
            prop_as_column: true,
            ..Default::default()
        };
        let entity = factory.canonical_entity(&record()).unwrap();
        let columns = entity.to_properties();

        assert_eq!(entity.message().unwrap(), "cache miss");
        assert!(columns.contains(&("key".to_string(), EntityProperty::from("user:42"))));
        assert!(columns.contains(&("hits".to_string(), EntityProperty::I64(7))));
        assert!(columns.contains(&(
            "Location".to_string(),
            EntityProperty::from("Cache.get(cache.rs:12)")
        )));
        assert!(!columns.iter().any(|(name, _)| name == "Exception"));
    }

    #[test]
    fn test_dynamic_entity_keeps_builtin_columns() {
        let factory = EntityFactory {
            prop_as_column: true,
            ..Default::default()
        };
        let record = LogRecord::new(LogLevel::Info, "app", "real message")
            .with_property("Message", "shadow")
            .with_property("Level", 5)
            .with_property("tag", "a")
            .with_property("tag", "b");
        let entity = factory.canonical_entity(&record).unwrap();
        let columns = entity.to_properties();

        assert_eq!(entity.message().unwrap(), "real message");
        assert_eq!(columns.iter().filter(|(name, _)| name == "Message").count(), 1);
        assert!(columns.contains(&("Level".to_string(), EntityProperty::from("INFO"))));
        assert!(columns.contains(&("tag".to_string(), EntityProperty::from("b"))));
    }

    #[test]
    fn test_dynamic_entity_without_string_message() {
        let entity = StorageEntity {
            partition_key: "app".to_string(),
            row_key: "r".to_string(),
            payload: EntityPayload::Dynamic(vec![
                column("Level", "INFO"),
                column(MESSAGE_COLUMN, EntityProperty::I64(5)),
            ]),
        };

        let err = entity.message().unwrap_err();
        assert!(matches!(err, AppenderError::UnsupportedEntityShape(_)));
    }

    #[test]
    fn test_rendered_entity_uses_layout() {
        let factory = EntityFactory {
            layout: Some(Arc::new(JsonFormatter::new(JsonFormatterConfig::default()))),
            ..Default::default()
        };
        let entity = factory.canonical_entity(&record()).unwrap();

        assert!(matches!(entity.payload, EntityPayload::Rendered(_)));
        let message = entity.message().unwrap();
        assert!(message.contains("\"message\":\"cache miss\""));
        assert_eq!(entity.to_properties().len(), 3);
    }

    #[test]
    fn test_entity_property_conversions() {
        assert_eq!(
            EntityProperty::from(&PropertyValue::U64(u64::MAX)),
            EntityProperty::String(u64::MAX.to_string())
        );
        assert_eq!(
            EntityProperty::from(&PropertyValue::U64(3)),
            EntityProperty::I64(3)
        );
        assert_eq!(
            EntityProperty::from(&PropertyValue::Json(serde_json::json!([1, 2]))),
            EntityProperty::String("[1,2]".to_string())
        );
        assert_eq!(serde_json::to_string(&EntityProperty::Null).unwrap(), "null");
    }
}
