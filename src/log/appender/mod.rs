mod append_blob_appender;
mod async_table_appender;
mod blob_appender;
mod buffer;
mod config;
mod registry;
mod table_appender;
mod trait_;

pub use append_blob_appender::{daily_blob_name, AppendBlobAppender};
pub use async_table_appender::AsyncTableAppender;
pub use blob_appender::{entry_blob_name, BlobAppender};
pub use buffer::EventBuffer;
pub use config::{
    AsyncTableAppenderConfig, BlobAppenderConfig, ConnectionConfig, TableAppenderConfig,
};
pub use registry::{create_appender_from_options, APPENDER_TYPES};
pub use table_appender::TableAppender;
pub use trait_::LogAppender;
