//! 在途任务集合
//!
//! 登记、注销和关闭都在同一把锁下完成：spawn 持锁检查关闭标记并插入句柄，
//! 任务结束时在同一把锁下移除自己。关闭后 spawn 一律拒绝，
//! 所以 drain 返回后不会再有新任务开始运行。

use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Default)]
struct TaskSet {
    handles: HashMap<u64, JoinHandle<()>>,
    closed: bool,
}

type SharedTaskSet = Arc<Mutex<TaskSet>>;

fn lock(tasks: &SharedTaskSet) -> MutexGuard<'_, TaskSet> {
    match tasks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// 任务结束（包括 panic）时从集合中移除自己
struct Deregister {
    tasks: SharedTaskSet,
    id: u64,
}

impl Drop for Deregister {
    fn drop(&mut self) {
        lock(&self.tasks).handles.remove(&self.id);
    }
}

/// 在途任务集合
#[derive(Debug, Default)]
pub struct InFlightTasks {
    tasks: SharedTaskSet,
    next_id: AtomicU64,
}

impl InFlightTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 启动并登记一个任务，已关闭时不启动并返回 `false`
    pub fn spawn<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = lock(&self.tasks);
        if tasks.closed {
            return false;
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let registry = self.tasks.clone();
        let handle = tokio::spawn(async move {
            // 在任务内部构造，未被调度就丢弃的任务不会在持锁时回调
            let _deregister = Deregister { tasks: registry, id };
            future.await;
        });
        tasks.handles.insert(id, handle);
        true
    }

    /// 当前在途任务数
    pub fn len(&self) -> usize {
        lock(&self.tasks).handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 停止接收新任务，返回此前是否已关闭
    pub fn close(&self) -> bool {
        std::mem::replace(&mut lock(&self.tasks).closed, true)
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.tasks).closed
    }

    /// 等待所有在途任务完成，包括等待期间新登记的任务
    pub async fn drain(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut tasks = lock(&self.tasks);
                tasks.handles.drain().map(|(_, handle)| handle).collect()
            };
            if handles.is_empty() {
                return;
            }

            for result in join_all(handles).await {
                if let Err(err) = result {
                    warn!(target: "azlog::flush::tracker", error = %err, "send task failed");
                }
            }
        }
    }
}
