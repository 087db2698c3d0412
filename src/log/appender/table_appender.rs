use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::buffer::EventBuffer;
use super::config::TableAppenderConfig;
use crate::error::AppenderError;
use crate::flush::FlushStats;
use crate::log::appender::LogAppender;
use crate::log::LogRecord;
use crate::storage::{StorageAccount, TableStore};
use crate::table::{partition_chunks, EntityFactory, StorageEntity};

const TARGET: &str = "azlog::appender::table";

/// 把记录转换为实体
///
/// 无法识别的实体结构不会中断其余记录的转换，第一个错误随结果一起返回。
pub(crate) fn build_entities(
    factory: &EntityFactory,
    records: &[LogRecord],
) -> (Vec<StorageEntity>, Option<AppenderError>) {
    let mut entities = Vec::with_capacity(records.len());
    let mut failure = None;
    for record in records {
        match factory.entities_for(record) {
            Ok(built) => entities.extend(built),
            Err(err) => {
                error!(target: TARGET, logger = %record.logger_name, error = %err, "cannot build entity");
                failure.get_or_insert(err);
            }
        }
    }
    (entities, failure)
}

/// 表存储输出器
///
/// 刷新时在当前调用中依次写入每个批次，写入失败只记录日志，不重试。
pub struct TableAppender {
    store: Arc<dyn TableStore>,
    table_name: String,
    max_chunk_size: usize,
    factory: EntityFactory,
    buffer: EventBuffer,
    stats: FlushStats,
}

impl TableAppender {
    /// 解析连接字符串并激活
    pub async fn activate(config: TableAppenderConfig) -> Result<Self, AppenderError> {
        config.check()?;
        let account = StorageAccount::parse(&config.connection.resolve()?)?;
        Self::activate_with_store(config, account.table_client()).await
    }

    /// 使用给定的表存储激活，表不存在时创建
    pub async fn activate_with_store(
        config: TableAppenderConfig,
        store: Arc<dyn TableStore>,
    ) -> Result<Self, AppenderError> {
        config.check()?;
        let factory = config.entity_factory()?;
        if store.create_table_if_not_exists(&config.table_name).await? {
            debug!(target: TARGET, table = %config.table_name, "table created");
        }

        Ok(Self {
            store,
            table_name: config.table_name,
            max_chunk_size: config.max_chunk_size,
            factory,
            buffer: EventBuffer::new(config.buffer_size),
            stats: FlushStats::new(),
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn stats(&self) -> &FlushStats {
        &self.stats
    }

    async fn send_buffer(&self) -> Result<(), AppenderError> {
        let records = self.buffer.take().await;
        if records.is_empty() {
            return Ok(());
        }

        let (entities, failure) = build_entities(&self.factory, &records);
        for chunk in partition_chunks(entities, self.max_chunk_size) {
            self.stats.record_attempt();
            match self.store.execute_batch(&self.table_name, &chunk).await {
                Ok(()) => self.stats.record_delivered(),
                Err(err) => {
                    self.stats.record_abandoned();
                    warn!(
                        target: TARGET,
                        table = %self.table_name,
                        partition_key = %chunk.partition_key,
                        entities = chunk.len(),
                        error = %err,
                        "batch write failed, dropping"
                    );
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl LogAppender for TableAppender {
    async fn append(&self, record: LogRecord) -> Result<()> {
        if self.buffer.push(record).await {
            self.send_buffer().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.send_buffer().await?;
        Ok(())
    }
}
