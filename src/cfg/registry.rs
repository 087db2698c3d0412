// 按名称注册的 trait 工厂

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::RwLock;

use super::type_options::TypeOptions;

// 构造函数返回 Box<dyn Any>，内部实际装的是 Box<dyn Trait>
type TraitConstructor = Box<dyn Fn(JsonValue) -> Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

// 外层 key 是 trait 的 TypeId，内层 key 是配置里写的类型名
static TRAIT_REGISTRY: Lazy<RwLock<HashMap<TypeId, HashMap<String, TraitConstructor>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// 为实现某个 trait 的类型注册构造函数
///
/// 同名重复注册会覆盖之前的构造函数。
///
/// # 示例
/// ```ignore
/// register_trait::<XmlFormatter, dyn LogFormatter, XmlFormatterConfig>("XmlFormatter")?;
/// let formatter: Box<dyn LogFormatter> = create_trait_from_type_options(&options)?;
/// ```
pub fn register_trait<T, Trait, Config>(type_name: &str) -> Result<()>
where
    T: Send + Sync + 'static,
    Trait: ?Sized + Send + Sync + 'static,
    Config: DeserializeOwned + Clone + Send + Sync + 'static,
    T: From<Config>,
    Box<T>: Into<Box<Trait>>,
{
    let constructor: TraitConstructor = Box::new(|value| {
        let config: Config = serde_json::from_value(value)?;
        let trait_object: Box<Trait> = Box::new(T::from(config)).into();
        Ok(Box::new(trait_object) as Box<dyn Any + Send + Sync>)
    });

    let mut registry = TRAIT_REGISTRY
        .write()
        .map_err(|_| anyhow!("Failed to acquire write lock"))?;
    registry
        .entry(TypeId::of::<Trait>())
        .or_default()
        .insert(type_name.to_string(), constructor);

    Ok(())
}

/// 判断某个类型名是否已经为该 trait 注册
pub fn is_registered<Trait>(type_name: &str) -> bool
where
    Trait: ?Sized + 'static,
{
    TRAIT_REGISTRY
        .read()
        .map(|registry| {
            registry
                .get(&TypeId::of::<Trait>())
                .is_some_and(|types| types.contains_key(type_name))
        })
        .unwrap_or(false)
}

/// 根据 TypeOptions 创建 trait object
pub fn create_trait_from_type_options<Trait>(type_options: &TypeOptions) -> Result<Box<Trait>>
where
    Trait: ?Sized + Send + Sync + 'static,
{
    let registry = TRAIT_REGISTRY
        .read()
        .map_err(|_| anyhow!("Failed to acquire read lock"))?;

    let constructor = registry
        .get(&TypeId::of::<Trait>())
        .and_then(|types| types.get(&type_options.type_name))
        .ok_or_else(|| {
            anyhow!(
                "Type '{}' not registered for this trait",
                type_options.type_name
            )
        })?;

    let any_box = constructor(type_options.options.clone())?;

    any_box
        .downcast::<Box<Trait>>()
        .map(|boxed| *boxed)
        .map_err(|_| anyhow!("Failed to downcast to target trait type"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    trait Renderer: Send + Sync {
        fn render(&self, input: &str) -> String;
    }

    #[derive(Debug, Clone, Deserialize, Default)]
    #[serde(default)]
    struct UpperConfig {
        suffix: String,
    }

    struct Upper {
        suffix: String,
    }

    impl From<UpperConfig> for Upper {
        fn from(config: UpperConfig) -> Self {
            Self {
                suffix: config.suffix,
            }
        }
    }

    impl Renderer for Upper {
        fn render(&self, input: &str) -> String {
            format!("{}{}", input.to_uppercase(), self.suffix)
        }
    }

    crate::impl_box_from!(Upper => dyn Renderer);

    #[test]
    fn test_register_and_create() -> Result<()> {
        register_trait::<Upper, dyn Renderer, UpperConfig>("Upper")?;
        assert!(is_registered::<dyn Renderer>("Upper"));

        let options = TypeOptions::from_json(r#"{ type: "Upper", options: { suffix: "!" } }"#)?;
        let renderer: Box<dyn Renderer> = create_trait_from_type_options(&options)?;
        assert_eq!(renderer.render("abc"), "ABC!");
        Ok(())
    }

    #[test]
    fn test_unregistered_type() {
        let options = TypeOptions {
            type_name: "Missing".to_string(),
            options: serde_json::json!({}),
        };

        let err = create_trait_from_type_options::<dyn Renderer>(&options)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Missing"));
        assert!(!is_registered::<dyn Renderer>("Missing"));
    }

    #[test]
    fn test_invalid_options() -> Result<()> {
        register_trait::<Upper, dyn Renderer, UpperConfig>("Upper")?;

        let options = TypeOptions {
            type_name: "Upper".to_string(),
            options: serde_json::json!({ "suffix": 42 }),
        };
        assert!(create_trait_from_type_options::<dyn Renderer>(&options).is_err());
        Ok(())
    }
}
