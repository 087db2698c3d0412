use tokio::sync::Mutex;

use crate::log::LogRecord;

/// 事件缓冲区
///
/// 只负责累积记录，写满后由 appender 决定何时刷新。
#[derive(Debug)]
pub struct EventBuffer {
    capacity: usize,
    events: Mutex<Vec<LogRecord>>,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    /// 追加一条记录，返回缓冲区是否已满
    pub async fn push(&self, record: LogRecord) -> bool {
        let mut events = self.events.lock().await;
        events.push(record);
        events.len() >= self.capacity
    }

    /// 取出全部记录
    pub async fn take(&self) -> Vec<LogRecord> {
        let mut events = self.events.lock().await;
        std::mem::replace(&mut *events, Vec::with_capacity(self.capacity))
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(512)
    }
}
