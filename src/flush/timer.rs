//! 定时刷新
//!
//! 启动时立即触发一次，之后每隔 `interval` 触发。

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

const TARGET: &str = "azlog::flush::timer";

struct Running {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// 周期触发器，在独立任务上运行
pub struct PeriodicFlushTimer {
    running: Mutex<Option<Running>>,
}

impl PeriodicFlushTimer {
    pub fn start<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let interval = interval.max(Duration::from_millis(1));
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        debug!(target: TARGET, "triggering flush");
                        tick().await;
                    }
                }
            }
        });

        Self {
            running: Mutex::new(Some(Running { stop, handle })),
        }
    }

    fn take(&self) -> Option<Running> {
        match self.running.lock() {
            Ok(mut running) => running.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    /// 停止定时器，等待正在执行的触发结束
    ///
    /// 重复调用无副作用；返回后不会再触发。
    pub async fn dispose(&self) {
        let Some(running) = self.take() else {
            return;
        };
        let _ = running.stop.send(());
        if let Err(err) = running.handle.await {
            debug!(target: TARGET, error = %err, "timer task ended abnormally");
        }
        debug!(target: TARGET, "timer disposed");
    }

    pub fn is_disposed(&self) -> bool {
        match self.running.lock() {
            Ok(running) => running.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl Drop for PeriodicFlushTimer {
    fn drop(&mut self) {
        if let Some(running) = self.take() {
            running.handle.abort();
        }
    }
}
