//! 注册表配套的宏
//!
//! `register_trait` 要求 `T: From<Config>` 且 `Box<T>: Into<Box<dyn Trait>>`，
//! 这两个宏分别生成这两个实现。

/// 为配置类型实现 `From<Config> for Type`，调用 `Type::new(config)`
#[macro_export]
macro_rules! impl_from {
    ($config_type:ty => $target_type:ty) => {
        impl From<$config_type> for $target_type {
            fn from(config: $config_type) -> Self {
                <$target_type>::new(config)
            }
        }
    };
}

/// 为 `Box<Type>` 实现到 `Box<dyn Trait>` 的转换
///
/// 用法：`impl_box_from!(Type => dyn TraitName)`
#[macro_export]
macro_rules! impl_box_from {
    ($source_type:ty => dyn $trait_name:path) => {
        impl From<Box<$source_type>> for Box<dyn $trait_name> {
            fn from(source: Box<$source_type>) -> Self {
                source as Box<dyn $trait_name>
            }
        }
    };
}
