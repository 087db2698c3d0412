//! 异步刷新协调器
//!
//! 每个批次一个任务并发发送，调用方不等待发送完成；关闭时等待所有在途任务结束。

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::retry::RetrySender;
use super::stats::FlushStats;
use super::tracker::InFlightTasks;
use crate::storage::TableStore;
use crate::table::{partition_chunks, StorageEntity};

const TARGET: &str = "azlog::flush::coordinator";

pub struct FlushCoordinator {
    store: Arc<dyn TableStore>,
    table: Arc<str>,
    max_chunk_size: usize,
    sender: Arc<RetrySender>,
    tasks: InFlightTasks,
}

impl FlushCoordinator {
    pub fn new(
        store: Arc<dyn TableStore>,
        table: impl Into<String>,
        sender: RetrySender,
        max_chunk_size: usize,
    ) -> Self {
        Self {
            store,
            table: Arc::from(table.into()),
            max_chunk_size,
            sender: Arc::new(sender),
            tasks: InFlightTasks::new(),
        }
    }

    /// 划分批次并为每个批次启动一个发送任务，返回启动的任务数
    ///
    /// 关闭后到达的批次被拒绝，只记录日志。关闭标记与任务登记共用一把锁，
    /// 与 `shutdown` 并发调用时，每个批次要么在排空前登记，要么被拒绝。
    pub fn dispatch(&self, entities: Vec<StorageEntity>) -> usize {
        if entities.is_empty() {
            return 0;
        }

        let chunks = partition_chunks(entities, self.max_chunk_size);
        let total = chunks.len();
        let mut launched = 0;
        for chunk in chunks {
            let store = self.store.clone();
            let table = self.table.clone();
            let sender = self.sender.clone();
            let accepted = self.tasks.spawn(async move {
                sender.send_chunk(store.as_ref(), &table, &chunk).await;
            });
            if !accepted {
                break;
            }
            launched += 1;
        }

        let rejected = total - launched;
        if rejected > 0 {
            warn!(
                target: TARGET,
                table = %self.table,
                chunks = rejected,
                "coordinator is shut down, dropping batches"
            );
            self.sender.stats().record_rejected(rejected as u64);
        }
        if launched > 0 {
            debug!(target: TARGET, table = %self.table, tasks = launched, "dispatched");
        }
        launched
    }

    /// 停止接收新批次，并等待所有在途任务完成
    ///
    /// 返回后不会再有新的存储调用。
    pub async fn shutdown(&self) {
        self.tasks.close();
        info!(
            target: TARGET,
            table = %self.table,
            in_flight = self.tasks.len(),
            "waiting on outstanding sends"
        );
        self.tasks.drain().await;
        info!(target: TARGET, table = %self.table, "shutdown complete");
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_closed(&self) -> bool {
        self.tasks.is_closed()
    }

    pub fn stats(&self) -> Arc<FlushStats> {
        self.sender.stats()
    }
}
