//! 日志模块
//!
//! 把日志记录缓冲在内存中，批量写入表存储或 blob 存储。
//!
//! # 特性
//!
//! - 多种输出器：AsyncTableAppender、TableAppender、BlobAppender、AppendBlobAppender
//! - 可扩展的格式化器：XmlFormatter、JsonFormatter、TextFormatter
//! - 失败重试（线性退避 + 随机抖动），关闭时等待所有在途发送完成
//! - 基于配置的动态创建
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use azlog::cfg::TypeOptions;
//! use azlog::log::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let options = TypeOptions::from_json(r#"
//!         {
//!             type: "AsyncTableAppender",
//!             options: {
//!                 connection_string: "UseDevelopmentStorage=true",
//!                 table_name: "logs",
//!                 partition_key_type: "date_reverse",
//!                 flush_interval: "30s"
//!             }
//!         }
//!     "#)?;
//!
//!     let appender = create_appender_from_options(&options).await?;
//!     appender.append(LogRecord::new(LogLevel::Info, "app", "started")).await?;
//!
//!     // 关闭时发送剩余日志并等待发送完成
//!     appender.close().await?;
//!     Ok(())
//! }
//! ```

pub mod appender;
pub mod formatter;
pub mod record;

pub use appender::{
    create_appender_from_options, AppendBlobAppender, AsyncTableAppender,
    AsyncTableAppenderConfig, BlobAppender, BlobAppenderConfig, EventBuffer, LogAppender,
    TableAppender, TableAppenderConfig,
};
pub use formatter::{
    register_formatters, JsonFormatter, JsonFormatterConfig, LogFormatter, OutputFormat,
    TextFormatter, TextFormatterConfig, XmlFormatter, XmlFormatterConfig,
};
pub use record::{LocationInfo, LogLevel, LogRecord, PropertyValue};
