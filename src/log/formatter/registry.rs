use crate::cfg::{create_trait_from_type_options, register_trait, TypeOptions};
use crate::log::formatter::LogFormatter;
use crate::log::formatter::{
    json_formatter::{JsonFormatter, JsonFormatterConfig},
    text_formatter::{TextFormatter, TextFormatterConfig},
    xml_formatter::{XmlFormatter, XmlFormatterConfig},
};
use anyhow::Result;
use std::sync::Once;

static REGISTER_ONCE: Once = Once::new();

/// 注册所有 Formatter 实现
pub fn register_formatters() -> Result<()> {
    register_trait::<XmlFormatter, dyn LogFormatter, XmlFormatterConfig>("XmlFormatter")?;
    register_trait::<JsonFormatter, dyn LogFormatter, JsonFormatterConfig>("JsonFormatter")?;
    register_trait::<TextFormatter, dyn LogFormatter, TextFormatterConfig>("TextFormatter")?;
    Ok(())
}

/// 从 TypeOptions 创建 Formatter（内置实现只注册一次）
pub fn create_formatter_from_options(options: &TypeOptions) -> Result<Box<dyn LogFormatter>> {
    REGISTER_ONCE.call_once(|| {
        let _ = register_formatters();
    });
    create_trait_from_type_options(options)
}
