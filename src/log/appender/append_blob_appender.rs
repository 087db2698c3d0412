use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
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

const TARGET: &str = "azlog::appender::append_blob";

/// 按天滚动的追加 blob 名称：`{dir}/{yyyy_MM_dd}.entry.log.{format}`
pub fn daily_blob_name(directory: &str, date: DateTime<Utc>, format: OutputFormat) -> String {
    format!(
        "{}/{}.entry.log.{}",
        directory,
        date.format("%Y_%m_%d"),
        format.extension()
    )
}

/// 追加 blob 输出器
///
/// 所有日志按顺序追加到当天的 blob，blob 不存在时先创建。
pub struct AppendBlobAppender {
    store: Arc<dyn BlobStore>,
    container: String,
    directory: String,
    output_format: OutputFormat,
    formatter: Box<dyn LogFormatter>,
    buffer: EventBuffer,
    sender: RetrySender,
}

impl AppendBlobAppender {
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

    pub fn stats(&self) -> Arc<FlushStats> {
        self.sender.stats()
    }

    /// 当前写入的 blob 名称
    pub fn current_blob(&self) -> String {
        daily_blob_name(&self.directory, Utc::now(), self.output_format)
    }

    // blob 已有内容时，XML 记录前补一个换行
    async fn prepare_blob(&self, name: &str) -> Result<bool, AppenderError> {
        if self.store.exists(&self.container, name).await? {
            return Ok(true);
        }
        self.store.create_append_blob(&self.container, name).await?;
        debug!(target: TARGET, blob = %name, "append blob created");
        Ok(false)
    }

    async fn send_buffer(&self) {
        let records = self.buffer.take().await;
        if records.is_empty() {
            return;
        }

        let name = self.current_blob();
        let mut has_content = match self.prepare_blob(&name).await {
            Ok(existed) => existed,
            Err(err) => {
                error!(
                    target: TARGET,
                    blob = %name,
                    records = records.len(),
                    error = %err,
                    "cannot prepare append blob, dropping records"
                );
                return;
            }
        };

        for record in &records {
            let output = match self.formatter.format(record) {
                Ok(output) if !output.is_empty() => output,
                Ok(_) => continue,
                Err(err) => {
                    error!(target: TARGET, error = %err, "cannot render record");
                    continue;
                }
            };

            let output = match self.output_format {
                OutputFormat::Xml if has_content => format!("\n{}", output),
                _ => output,
            };

            let block = Bytes::from(output);
            let what = format!("block to {}/{}", self.container, name);
            let outcome = self
                .sender
                .send(&what, || {
                    self.store
                        .append_block(&self.container, &name, block.clone())
                })
                .await;
            has_content |= outcome.is_delivered();
        }
    }
}

#[async_trait::async_trait]
impl LogAppender for AppendBlobAppender {
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
