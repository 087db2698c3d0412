//! azlog - 面向表存储和 blob 存储的日志输出器
//!
//! 日志记录先缓冲在内存中，再按分区键分批写入存储；发送失败时带抖动地线性退避重试，
//! 关闭时等待所有在途发送完成。
//!
//! ## 模块
//!
//! - **cfg**: 配置基础设施（TypeOptions、trait 注册表、时长格式）
//! - **log**: 日志记录、格式化器与输出器
//! - **table**: 表实体、分区键/行键、批次划分与超长消息拆分
//! - **flush**: 带重试的发送、在途任务跟踪、异步刷新协调与定时触发
//! - **storage**: 表存储 / blob 存储接口及内存、本地文件系统实现

pub mod cfg;
pub mod error;
pub mod flush;
pub mod log;
pub mod storage;
pub mod table;

// 重新导出主要的公共 API
pub use cfg::{create_trait_from_type_options, register_trait, TypeOptions};

pub use error::AppenderError;

pub use flush::{FlushCoordinator, FlushStats, PeriodicFlushTimer, RetryPolicy, RetrySender, SendOutcome};

pub use log::{
    create_appender_from_options, AppendBlobAppender, AsyncTableAppender, BlobAppender,
    LogAppender, LogFormatter, LogLevel, LogRecord, TableAppender,
};

pub use storage::{BlobStore, StorageAccount, StorageError, TableStore};

pub use table::{partition_chunks, Chunk, EntityFactory, PartitionKeyType, StorageEntity};
