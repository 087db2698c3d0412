//! 带重试的发送
//!
//! 第 n 次失败后（n 从 1 开始）等待 `retry_wait * (n + jitter)` 再试，
//! jitter 在 `[0, 1)` 内均匀分布，用于错开并发重试的节奏。
//! 失败满 `retry_count` 次后放弃，只记录日志，不向调用方返回错误。

use backon::Retryable;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::stats::FlushStats;
use crate::storage::{StorageError, TableStore};
use crate::table::Chunk;

const TARGET: &str = "azlog::flush::retry";

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 放弃前的最大尝试次数（含首次）
    pub retry_count: usize,
    /// 退避的基本单位
    pub retry_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 5,
            retry_wait: Duration::from_secs(5),
        }
    }
}

/// 抖动随机源，多个并发发送共享，访问需互斥
#[derive(Debug)]
pub struct JitterSource {
    rng: Mutex<StdRng>,
}

impl JitterSource {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// `[0, 1)` 内的随机数
    pub fn next(&self) -> f64 {
        let mut rng = match self.rng.lock() {
            Ok(rng) => rng,
            Err(poisoned) => poisoned.into_inner(),
        };
        rng.gen::<f64>()
    }
}

impl Default for JitterSource {
    fn default() -> Self {
        Self::new()
    }
}

/// 线性退避：第 n 次重试前等待 `retry_wait * (n + jitter)`
///
/// 共产生 `retry_count - 1` 个等待时长，迭代结束即放弃。
#[derive(Debug)]
pub struct LinearBackoff {
    retry_wait: Duration,
    attempt: usize,
    max_retries: usize,
    jitter: Arc<JitterSource>,
}

impl LinearBackoff {
    pub fn new(policy: RetryPolicy, jitter: Arc<JitterSource>) -> Self {
        Self {
            retry_wait: policy.retry_wait,
            attempt: 0,
            max_retries: policy.retry_count.saturating_sub(1),
            jitter,
        }
    }
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }
        self.attempt += 1;
        let factor = self.attempt as f64 + self.jitter.next();
        Some(self.retry_wait.mul_f64(factor))
    }
}

/// 单个发送单元的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered { attempts: usize },
    Abandoned { attempts: usize },
}

impl SendOutcome {
    pub fn attempts(&self) -> usize {
        match self {
            SendOutcome::Delivered { attempts } | SendOutcome::Abandoned { attempts } => *attempts,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }
}

/// 带重试的发送器
///
/// 每个 appender 实例持有一个，抖动随机源和统计计数都不跨实例共享。
#[derive(Debug)]
pub struct RetrySender {
    policy: RetryPolicy,
    jitter: Arc<JitterSource>,
    stats: Arc<FlushStats>,
}

impl RetrySender {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_jitter(policy, Arc::new(JitterSource::new()))
    }

    pub fn with_jitter(policy: RetryPolicy, jitter: Arc<JitterSource>) -> Self {
        Self {
            policy,
            jitter,
            stats: Arc::new(FlushStats::new()),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn stats(&self) -> Arc<FlushStats> {
        self.stats.clone()
    }

    fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(self.policy, self.jitter.clone())
    }

    /// 执行 `op` 直到成功或尝试次数耗尽
    ///
    /// `what` 只用于日志，描述正在发送的内容。
    pub async fn send<F, Fut>(&self, what: &str, mut op: F) -> SendOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(), StorageError>>,
    {
        let attempts = AtomicUsize::new(0);
        let started = Instant::now();

        let result = (|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.record_attempt();
            debug!(target: TARGET, what, attempt, "sending");
            op()
        })
        .retry(self.backoff())
        .notify(|err: &StorageError, delay: Duration| {
            warn!(
                target: TARGET,
                what,
                attempt = attempts.load(Ordering::SeqCst),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "send failed, retrying"
            );
        })
        .await;

        let attempts = attempts.load(Ordering::SeqCst);
        match result {
            Ok(()) => {
                self.stats.record_delivered();
                debug!(
                    target: TARGET,
                    what,
                    attempts,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "sent"
                );
                SendOutcome::Delivered { attempts }
            }
            Err(err) => {
                self.stats.record_abandoned();
                error!(
                    target: TARGET,
                    what,
                    attempts,
                    error = %err,
                    "send failed, giving up"
                );
                SendOutcome::Abandoned { attempts }
            }
        }
    }

    /// 把一个批次写入表存储
    pub async fn send_chunk(&self, store: &dyn TableStore, table: &str, chunk: &Chunk) -> SendOutcome {
        let what = format!(
            "batch of {} to {}/{}",
            chunk.len(),
            table,
            chunk.partition_key
        );
        self.send(&what, || store.execute_batch(table, chunk)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(retry_count: usize) -> RetryPolicy {
        RetryPolicy {
            retry_count,
            retry_wait: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_linear_backoff_delays() {
        let policy = RetryPolicy {
            retry_count: 5,
            retry_wait: Duration::from_secs(5),
        };
        let delays: Vec<Duration> =
            LinearBackoff::new(policy, Arc::new(JitterSource::seeded(7))).collect();

        assert_eq!(delays.len(), 4);
        for (i, delay) in delays.iter().enumerate() {
            let n = (i + 1) as u64;
            assert!(*delay >= Duration::from_secs(5 * n));
            assert!(*delay < Duration::from_secs(5 * (n + 1)));
        }
    }

    #[test]
    fn test_linear_backoff_single_attempt() {
        let mut backoff = LinearBackoff::new(policy(1), Arc::new(JitterSource::new()));
        assert!(backoff.next().is_none());

        let mut backoff = LinearBackoff::new(policy(0), Arc::new(JitterSource::new()));
        assert!(backoff.next().is_none());
    }

    #[test]
    fn test_jitter_range() {
        let jitter = JitterSource::seeded(42);
        for _ in 0..1000 {
            let value = jitter.next();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[tokio::test]
    async fn test_send_succeeds_after_failures() {
        let sender = RetrySender::new(policy(5));
        let calls = AtomicUsize::new(0);

        let outcome = sender
            .send("test", || {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(StorageError::Unavailable("busy".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(outcome, SendOutcome::Delivered { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sender.stats().attempts(), 3);
        assert_eq!(sender.stats().delivered(), 1);
    }

    #[tokio::test]
    async fn test_send_gives_up() {
        let sender = RetrySender::new(policy(5));
        let calls = AtomicUsize::new(0);

        let outcome = sender
            .send("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StorageError::Unavailable("down".to_string())) }
            })
            .await;

        assert_eq!(outcome, SendOutcome::Abandoned { attempts: 5 });
        assert!(!outcome.is_delivered());
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(sender.stats().abandoned(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_waits_grow_linearly() {
        let sender = RetrySender::new(RetryPolicy {
            retry_count: 3,
            retry_wait: Duration::from_secs(5),
        });
        let started = tokio::time::Instant::now();

        let outcome = sender
            .send("test", || async {
                Err(StorageError::Unavailable("down".to_string()))
            })
            .await;

        // 两次等待：[5s, 10s) + [10s, 15s)
        let elapsed = started.elapsed();
        assert_eq!(outcome.attempts(), 3);
        assert!(elapsed >= Duration::from_secs(15));
        assert!(elapsed < Duration::from_secs(25));
    }
}
