use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, error};

use super::buffer::EventBuffer;
use super::config::BlobAppenderConfig;
use crate::error::AppenderError;
use crate::flush::{FlushStats, RetrySender};
use crate::log::appender::LogAppender;
use crate::log::formatter::{LogFormatter, OutputFormat};
use crate::log::LogRecord;
use crate::storage::{BlobStore, StorageAccount};

const TARGET: &str = "azlog::appender::blob";

/// 单条事件 blob 的名称：`{dir}/{yyyy_MM_dd_HH_mm_ss_fffffff}.{uuid}.entry.log.{format}`
pub fn entry_blob_name(directory: &str, timestamp: DateTime<Utc>, format: OutputFormat) -> String {
    format!(
        "{}/{}_{:07}.{}.entry.log.{}",
        directory,
        timestamp.format("%Y_%m_%d_%H_%M_%S"),
        timestamp.timestamp_subsec_nanos() / 100,
        uuid::Uuid::new_v4().as_hyphenated(),
        format.extension()
    )
}

/// blob 输出器
///
/// 每条日志写成一个独立的 blob，刷新时并发上传。
pub struct BlobAppender {
    store: Arc<dyn BlobStore>,
    container: String,
    directory: String,
    output_format: OutputFormat,
    formatter: Box<dyn LogFormatter>,
    buffer: EventBuffer,
    sender: RetrySender,
}

impl BlobAppender {
    pub async fn activate(config: BlobAppenderConfig) -> Result<Self, AppenderError> {
        config.check()?;
        let account = StorageAccount::parse(&config.connection.resolve()?)?;
        Self::activate_with_store(config, account.blob_client()).await
    }

    pub async fn activate_with_store(
        config: BlobAppenderConfig,
        store: Arc<dyn BlobStore>,
    ) -> Result<Self, AppenderError> {
        config.check()?;
        let container = config.container();
        if store.create_container_if_not_exists(&container).await? {
            debug!(target: TARGET, container = %container, "container created");
        }

        Ok(Self {
            store,
            container,
            directory: config.directory_name.clone(),
            output_format: config.output_format,
            formatter: config.output_format.formatter(),
            buffer: EventBuffer::new(config.buffer_size),
            sender: RetrySender::new(config.retry_policy()),
        })
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn stats(&self) -> Arc<FlushStats> {
        self.sender.stats()
    }

    fn render(&self, record: &LogRecord) -> Option<String> {
        let output = match self.formatter.format(record) {
            Ok(output) => output,
            Err(err) => {
                error!(target: TARGET, error = %err, "cannot render record");
                return None;
            }
        };

        let output = match self.output_format {
            OutputFormat::Json => format!("[{}]", output.trim_end()),
            OutputFormat::Xml | OutputFormat::Text | OutputFormat::String => output,
        };
        (!output.is_empty()).then_some(output)
    }

    async fn upload(&self, record: &LogRecord) {
        let Some(output) = self.render(record) else {
            return;
        };
        let name = entry_blob_name(&self.directory, record.timestamp, self.output_format);
        let what = format!("blob {}/{}", self.container, name);
        self.sender
            .send(&what, || {
                self.store.upload_text(&self.container, &name, &output)
            })
            .await;
    }

    async fn send_buffer(&self) {
        let records = self.buffer.take().await;
        if records.is_empty() {
            return;
        }
        join_all(records.iter().map(|record| self.upload(record))).await;
        debug!(target: TARGET, records = records.len(), "buffer flushed");
    }
}

#[async_trait::async_trait]
impl LogAppender for BlobAppender {
    async fn append(&self, record: LogRecord) -> Result<()> {
        if self.buffer.push(record).await {
            self.send_buffer().await;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.send_buffer().await;
        Ok(())
    }
}
