use anyhow::Result;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::buffer::EventBuffer;
use super::config::AsyncTableAppenderConfig;
use super::table_appender::build_entities;
use crate::error::AppenderError;
use crate::flush::{FlushCoordinator, FlushStats, PeriodicFlushTimer, RetrySender};
use crate::log::appender::LogAppender;
use crate::log::LogRecord;
use crate::storage::{StorageAccount, TableStore};
use crate::table::EntityFactory;

const TARGET: &str = "azlog::appender::async_table";

struct Core {
    buffer: EventBuffer,
    factory: EntityFactory,
    coordinator: FlushCoordinator,
}

impl Core {
    async fn send_buffer(&self) -> Result<usize, AppenderError> {
        let records = self.buffer.take().await;
        if records.is_empty() {
            return Ok(0);
        }

        let (entities, failure) = build_entities(&self.factory, &records);
        let tasks = self.coordinator.dispatch(entities);
        debug!(target: TARGET, records = records.len(), tasks, "buffer flushed");

        match failure {
            Some(err) => Err(err),
            None => Ok(tasks),
        }
    }
}

/// 异步表存储输出器
///
/// 刷新只负责划分批次并启动发送任务，不等待发送完成。
/// 激活后立即启动定时刷新；关闭时依次停止定时器、做最后一次刷新、等待在途任务。
pub struct AsyncTableAppender {
    core: Arc<Core>,
    timer: PeriodicFlushTimer,
    table_name: String,
}

impl AsyncTableAppender {
    /// 解析连接字符串并激活
    pub async fn activate(config: AsyncTableAppenderConfig) -> Result<Self, AppenderError> {
        config.check()?;
        let account = StorageAccount::parse(&config.table.connection.resolve()?)?;
        Self::activate_with_store(config, account.table_client()).await
    }

    /// 使用给定的表存储激活，表不存在时创建
    pub async fn activate_with_store(
        config: AsyncTableAppenderConfig,
        store: Arc<dyn TableStore>,
    ) -> Result<Self, AppenderError> {
        config.check()?;
        let factory = config.table.entity_factory()?;
        let table_name = config.table.table_name.clone();
        if store.create_table_if_not_exists(&table_name).await? {
            debug!(target: TARGET, table = %table_name, "table created");
        }

        let sender = RetrySender::new(config.retry_policy());
        let core = Arc::new(Core {
            buffer: EventBuffer::new(config.table.buffer_size),
            factory,
            coordinator: FlushCoordinator::new(
                store,
                table_name.clone(),
                sender,
                config.table.max_chunk_size,
            ),
        });

        let weak: Weak<Core> = Arc::downgrade(&core);
        let timer = PeriodicFlushTimer::start(config.flush_interval, move || {
            let weak = weak.clone();
            async move {
                let Some(core) = weak.upgrade() else {
                    return;
                };
                if let Err(err) = core.send_buffer().await {
                    warn!(target: TARGET, error = %err, "periodic flush failed");
                }
            }
        });

        info!(target: TARGET, table = %table_name, "activated");
        Ok(Self {
            core,
            timer,
            table_name,
        })
    }

    /// 刷新缓冲区，返回启动的发送任务数
    pub async fn flush_buffer(&self) -> Result<usize, AppenderError> {
        self.core.send_buffer().await
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// 当前在途的发送任务数
    pub fn in_flight(&self) -> usize {
        self.core.coordinator.in_flight()
    }

    pub fn stats(&self) -> Arc<FlushStats> {
        self.core.coordinator.stats()
    }
}

#[async_trait::async_trait]
impl LogAppender for AsyncTableAppender {
    async fn append(&self, record: LogRecord) -> Result<()> {
        if self.core.buffer.push(record).await {
            self.core.send_buffer().await?;
        }
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.core.send_buffer().await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        debug!(target: TARGET, table = %self.table_name, "closing");
        self.timer.dispose().await;
        let flushed = self.core.send_buffer().await;
        self.core.coordinator.shutdown().await;
        flushed?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::{LogFormatter, LogLevel};
    use crate::storage::MemoryTableStore;
    use std::time::Duration;

    fn config() -> AsyncTableAppenderConfig {
        let mut config = AsyncTableAppenderConfig::default();
        config.table.table_name = "logs".to_string();
        config.retry_wait = Duration::from_millis(1);
        config
    }

    #[tokio::test]
    async fn test_flush_dispatches_one_task_per_chunk() -> Result<()> {
        let store = Arc::new(MemoryTableStore::new());
        let appender = AsyncTableAppender::activate_with_store(config(), store.clone()).await?;

        for i in 0..250 {
            appender
                .append(LogRecord::new(LogLevel::Info, "app", format!("m{}", i)))
                .await?;
        }
        assert_eq!(appender.flush_buffer().await?, 3);

        appender.close().await?;
        assert_eq!(appender.in_flight(), 0);
        assert_eq!(store.rows("logs").await.len(), 250);
        assert_eq!(appender.stats().delivered(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_close_flushes_remaining_records() -> Result<()> {
        let store = Arc::new(MemoryTableStore::new());
        let appender = AsyncTableAppender::activate_with_store(config(), store.clone()).await?;

        appender.append(LogRecord::new(LogLevel::Warn, "app", "late")).await?;
        appender.close().await?;

        assert_eq!(store.rows("logs").await.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_message_property_does_not_replace_message() -> Result<()> {
        let store = Arc::new(MemoryTableStore::new());
        let mut config = config();
        config.table.prop_as_column = true;
        config.table.max_message_size = 10;
        let appender = AsyncTableAppender::activate_with_store(config, store.clone()).await?;

        appender
            .append(
                LogRecord::new(LogLevel::Info, "app", "0123456789abcde")
                    .with_property("Message", "short"),
            )
            .await?;
        appender.close().await?;

        let mut rows = store.rows("logs").await;
        rows.sort_by(|a, b| b.row_key.cmp(&a.row_key));
        let joined: String = rows
            .iter()
            .filter_map(|row| match row.get("Message") {
                Some(crate::table::EntityProperty::String(part)) => Some(part.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(joined, "0123456789abcde");
        Ok(())
    }

    #[derive(Debug, Clone, Default, serde::Deserialize)]
    struct PickyLayoutConfig {}

    struct PickyLayout;

    impl PickyLayout {
        fn new(_: PickyLayoutConfig) -> Self {
            Self
        }
    }

    impl LogFormatter for PickyLayout {
        fn format(&self, record: &LogRecord) -> Result<String> {
            if record.message.contains("bad") {
                anyhow::bail!("cannot render {}", record.message);
            }
            Ok(record.message.clone())
        }
    }

    crate::impl_from!(PickyLayoutConfig => PickyLayout);
    crate::impl_box_from!(PickyLayout => dyn LogFormatter);

    #[tokio::test]
    async fn test_unrenderable_record_fails_flush() -> Result<()> {
        crate::cfg::register_trait::<PickyLayout, dyn LogFormatter, PickyLayoutConfig>(
            "PickyLayout",
        )?;
        let store = Arc::new(MemoryTableStore::new());
        let mut config = config();
        config.table.layout = Some(crate::cfg::TypeOptions::named("PickyLayout"));
        let appender = AsyncTableAppender::activate_with_store(config, store.clone()).await?;

        appender.append(LogRecord::new(LogLevel::Info, "app", "bad")).await?;
        appender.append(LogRecord::new(LogLevel::Info, "app", "good")).await?;

        let err = appender.flush_buffer().await.unwrap_err();
        assert!(matches!(err, AppenderError::Format(_)));

        appender.close().await?;
        let rows = store.rows("logs").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("Message"),
            Some(&crate::table::EntityProperty::from("good"))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_periodic_flush() -> Result<()> {
        let store = Arc::new(MemoryTableStore::new());
        let mut config = config();
        config.flush_interval = Duration::from_millis(20);
        let appender = AsyncTableAppender::activate_with_store(config, store.clone()).await?;

        appender.append(LogRecord::new(LogLevel::Info, "app", "tick")).await?;
        for _ in 0..100 {
            if !store.rows("logs").await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.rows("logs").await.len(), 1);

        appender.close().await?;
        Ok(())
    }
}
