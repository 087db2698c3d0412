//! 刷新引擎：带重试的发送、在途任务跟踪、异步刷新协调与定时触发

pub mod coordinator;
pub mod retry;
pub mod stats;
pub mod timer;
pub mod tracker;

pub use coordinator::FlushCoordinator;
pub use retry::{JitterSource, LinearBackoff, RetryPolicy, RetrySender, SendOutcome};
pub use stats::FlushStats;
pub use timer::PeriodicFlushTimer;
pub use tracker::InFlightTasks;
