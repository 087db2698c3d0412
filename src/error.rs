use thiserror::Error;

use crate::storage::StorageError;

/// appender 统一错误类型
///
/// 配置类错误只会在激活阶段出现；运行期的存储失败在重试器内部消化，
/// 不会通过这个类型返回给调用方。
#[derive(Error, Debug)]
pub enum AppenderError {
    #[error("缺少必填配置: {0}")]
    MissingSetting(&'static str),

    #[error("找不到连接字符串: {0}")]
    ConnectionStringNotFound(String),

    #[error("无效连接字符串: {0}")]
    InvalidConnectionString(String),

    #[error("无效配置: {0}")]
    InvalidConfig(String),

    #[error("无法识别的实体结构: {0}")]
    UnsupportedEntityShape(String),

    #[error("格式化失败: {0}")]
    Format(#[from] anyhow::Error),

    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
}

impl From<garde::Report> for AppenderError {
    fn from(report: garde::Report) -> Self {
        AppenderError::InvalidConfig(report.to_string())
    }
}

impl AppenderError {
    /// 是否属于激活阶段的配置错误
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppenderError::MissingSetting(_)
                | AppenderError::ConnectionStringNotFound(_)
                | AppenderError::InvalidConnectionString(_)
                | AppenderError::InvalidConfig(_)
        )
    }
}
