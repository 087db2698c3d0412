use std::sync::atomic::{AtomicU64, Ordering};

/// 发送结果计数
#[derive(Debug, Default)]
pub struct FlushStats {
    delivered: AtomicU64,
    abandoned: AtomicU64,
    attempts: AtomicU64,
    rejected: AtomicU64,
}

impl FlushStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 成功送达的发送单元数
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }

    /// 重试耗尽后放弃的发送单元数
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::SeqCst)
    }

    /// 累计尝试次数（含首次）
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// 关闭后被拒绝的批次数
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_rejected(&self, count: u64) {
        self.rejected.fetch_add(count, Ordering::SeqCst);
    }
}
