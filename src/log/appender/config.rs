//! appender 配置
//!
//! 所有字段都有默认值，缺省的必填项（表名、容器名、目录名、连接字符串）
//! 在激活时报 `MissingSetting`。

use garde::Validate;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::sync::Arc;
use std::time::Duration;

use crate::cfg::serde_duration::{serde_as, HumanDur};
use crate::cfg::TypeOptions;
use crate::error::AppenderError;
use crate::flush::RetryPolicy;
use crate::log::formatter::{create_formatter_from_options, OutputFormat};
use crate::table::{EntityFactory, PartitionKeyType};

/// 连接字符串来源
///
/// `connection_string_name` 优先，按名称从环境变量读取；否则直接使用 `connection_string`。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub connection_string: Option<String>,
    pub connection_string_name: Option<String>,
}

impl ConnectionConfig {
    pub fn resolve(&self) -> Result<String, AppenderError> {
        if let Some(name) = self
            .connection_string_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            return match std::env::var(name) {
                Ok(value) if !value.trim().is_empty() => Ok(value),
                _ => Err(AppenderError::ConnectionStringNotFound(name.to_string())),
            };
        }

        self.connection_string
            .clone()
            .filter(|value| !value.trim().is_empty())
            .ok_or(AppenderError::MissingSetting("connection_string"))
    }
}

fn require(value: &str, setting: &'static str) -> Result<(), AppenderError> {
    if value.trim().is_empty() {
        return Err(AppenderError::MissingSetting(setting));
    }
    Ok(())
}

fn require_positive(value: Duration, setting: &str) -> Result<(), AppenderError> {
    if value.is_zero() {
        return Err(AppenderError::InvalidConfig(format!(
            "{} must be greater than zero",
            setting
        )));
    }
    Ok(())
}

/// 表 appender 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct TableAppenderConfig {
    #[serde(flatten)]
    #[garde(skip)]
    pub connection: ConnectionConfig,

    #[garde(skip)]
    pub table_name: String,

    #[garde(skip)]
    pub partition_key_type: PartitionKeyType,

    /// 把记录属性提升为表的列
    #[garde(skip)]
    pub prop_as_column: bool,

    /// 布局格式化器，设置后每行只保存渲染后的消息
    #[garde(skip)]
    pub layout: Option<TypeOptions>,

    /// 单行消息的最大字符数，超出则拆分
    #[default = 16000]
    #[garde(range(min = 1))]
    pub max_message_size: usize,

    /// 单个批次的最大实体数
    #[default = 100]
    #[garde(range(min = 1, max = 100))]
    pub max_chunk_size: usize,

    /// 缓冲区容量，写满触发刷新
    #[default = 512]
    #[garde(range(min = 1))]
    pub buffer_size: usize,
}

impl TableAppenderConfig {
    pub fn check(&self) -> Result<(), AppenderError> {
        require(&self.table_name, "table_name")?;
        self.validate()?;
        Ok(())
    }

    pub fn entity_factory(&self) -> Result<EntityFactory, AppenderError> {
        let layout = match &self.layout {
            Some(options) => Some(Arc::from(create_formatter_from_options(options).map_err(
                |err| AppenderError::InvalidConfig(format!("layout: {}", err)),
            )?)),
            None => None,
        };

        Ok(EntityFactory {
            partition_key_type: self.partition_key_type,
            prop_as_column: self.prop_as_column,
            layout,
            max_message_size: self.max_message_size,
        })
    }
}

/// 异步表 appender 配置
#[serde_as]
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct AsyncTableAppenderConfig {
    #[serde(flatten)]
    #[garde(skip)]
    pub table: TableAppenderConfig,

    /// 放弃前的最大尝试次数
    #[default = 5]
    #[garde(range(min = 1, max = 100))]
    pub retry_count: usize,

    /// 重试等待的基本单位
    #[serde_as(as = "HumanDur")]
    #[default(Duration::from_secs(5))]
    #[garde(skip)]
    pub retry_wait: Duration,

    /// 定时刷新周期
    #[serde_as(as = "HumanDur")]
    #[default(Duration::from_secs(60))]
    #[garde(skip)]
    pub flush_interval: Duration,
}

impl AsyncTableAppenderConfig {
    pub fn check(&self) -> Result<(), AppenderError> {
        self.table.check()?;
        self.validate()?;
        require_positive(self.retry_wait, "retry_wait")?;
        require_positive(self.flush_interval, "flush_interval")?;
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_count: self.retry_count,
            retry_wait: self.retry_wait,
        }
    }
}

/// blob appender 配置，`BlobAppender` 与 `AppendBlobAppender` 共用
#[serde_as]
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct BlobAppenderConfig {
    #[serde(flatten)]
    #[garde(skip)]
    pub connection: ConnectionConfig,

    /// 容器名，使用前转为小写
    #[garde(skip)]
    pub container_name: String,

    #[garde(skip)]
    pub directory_name: String,

    #[garde(skip)]
    pub output_format: OutputFormat,

    #[default = 512]
    #[garde(range(min = 1))]
    pub buffer_size: usize,

    #[default = 5]
    #[garde(range(min = 1, max = 100))]
    pub retry_count: usize,

    #[serde_as(as = "HumanDur")]
    #[default(Duration::from_secs(5))]
    #[garde(skip)]
    pub retry_wait: Duration,
}

impl BlobAppenderConfig {
    pub fn check(&self) -> Result<(), AppenderError> {
        require(&self.container_name, "container_name")?;
        require(&self.directory_name, "directory_name")?;
        self.validate()?;
        require_positive(self.retry_wait, "retry_wait")?;
        Ok(())
    }

    pub fn container(&self) -> String {
        self.container_name.to_lowercase()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_count: self.retry_count,
            retry_wait: self.retry_wait,
        }
    }
}
