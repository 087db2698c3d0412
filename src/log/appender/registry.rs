use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::cfg::TypeOptions;
use crate::error::AppenderError;
use crate::log::appender::{
    AppendBlobAppender, AsyncTableAppender, BlobAppender, LogAppender, TableAppender,
};

/// 支持按名称创建的 appender 类型
pub const APPENDER_TYPES: [&str; 4] = [
    "AsyncTableAppender",
    "TableAppender",
    "BlobAppender",
    "AppendBlobAppender",
];

fn parse_options<T: DeserializeOwned>(options: &JsonValue) -> Result<T, AppenderError> {
    serde_json::from_value(options.clone()).map_err(|err| AppenderError::InvalidConfig(err.to_string()))
}

/// 从 TypeOptions 创建并激活 appender
///
/// 激活需要连接存储，所以不走同步的 trait 注册表，而是按类型名分发。
pub async fn create_appender_from_options(
    options: &TypeOptions,
) -> Result<Box<dyn LogAppender>, AppenderError> {
    let appender: Box<dyn LogAppender> = match options.type_name.as_str() {
        "AsyncTableAppender" => Box::new(
            AsyncTableAppender::activate(parse_options(&options.options)?).await?,
        ),
        "TableAppender" => {
            Box::new(TableAppender::activate(parse_options(&options.options)?).await?)
        }
        "BlobAppender" => Box::new(BlobAppender::activate(parse_options(&options.options)?).await?),
        "AppendBlobAppender" => {
            Box::new(AppendBlobAppender::activate(parse_options(&options.options)?).await?)
        }
        other => {
            return Err(AppenderError::InvalidConfig(format!(
                "unknown appender type '{}', expected one of {:?}",
                other, APPENDER_TYPES
            )))
        }
    };
    Ok(appender)
}
