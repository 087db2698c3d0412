use anyhow::Result;

use crate::log::LogRecord;

/// 日志输出器 trait
///
/// 存储失败在 appender 内部重试和记录，不会从 `append` / `flush` 返回。
#[async_trait::async_trait]
pub trait LogAppender: Send + Sync {
    /// 追加一条日志，缓冲区写满时触发刷新
    async fn append(&self, record: LogRecord) -> Result<()>;

    /// 把缓冲区中的日志发送出去
    async fn flush(&self) -> Result<()>;

    /// 关闭 appender（默认实现只做一次刷新）
    async fn close(&self) -> Result<()> {
        self.flush().await
    }
}
