//! cfg 模块 - 配置基础设施
//!
//! 提供可插拔组件的 `TypeOptions` 描述、按 trait 划分的注册表，
//! 以及配置里常用的时长格式。

pub mod macros;
pub mod registry;
pub mod serde_duration;
pub mod type_options;

// 重新导出公共 API
pub use registry::{create_trait_from_type_options, is_registered, register_trait};
pub use serde_duration::HumanDur;
pub use type_options::TypeOptions;
