use thiserror::Error;

/// 存储后端统一错误类型
///
/// 重试器不区分错误种类，所有变体都按可重试处理。
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("资源不存在: {0}")]
    NotFound(String),

    #[error("实体已存在: {partition_key}/{row_key}")]
    Conflict {
        partition_key: String,
        row_key: String,
    },

    #[error("无效批次: {0}")]
    InvalidBatch(String),

    #[error("服务不可用: {0}")]
    Unavailable(String),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}
