use crate::log::formatter::core::format_timestamp;
use crate::log::formatter::LogFormatter;
use crate::log::record::LogRecord;
use anyhow::Result;
use chrono::Utc;
use quick_xml::events::BytesText;
use quick_xml::Writer;
use serde::Deserialize;
use smart_default::SmartDefault;

/// 记录上带有该属性时，所有属性都会输出为 XML 元素
pub const ADD_PROPERTIES_TO_XML: &str = "AddPropertiesToXml";

/// XmlFormatter 配置
#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default)]
pub struct XmlFormatterConfig {
    /// 缩进空格数，0 表示单行输出
    #[default = 2]
    pub indent: usize,
}

/// XML 格式化器
///
/// 每条记录输出一个 `<LogEntry>` 元素
pub struct XmlFormatter {
    config: XmlFormatterConfig,
}

impl XmlFormatter {
    pub fn new(config: XmlFormatterConfig) -> Self {
        Self { config }
    }

    fn elements(record: &LogRecord) -> Vec<(String, String)> {
        let mut elements = vec![
            ("UserName".to_string(), record.user_name.clone()),
            ("TimeStamp".to_string(), format_timestamp(record)),
            ("ThreadName".to_string(), record.thread_name.clone()),
            ("LoggerName".to_string(), record.logger_name.clone()),
            ("Level".to_string(), record.level.to_string()),
            ("Identity".to_string(), record.identity.clone()),
            ("Domain".to_string(), record.domain.clone()),
            (
                "CreatedOn".to_string(),
                Utc::now().format("%m/%d/%Y %H:%M:%S").to_string(),
            ),
            (
                "RenderedMessage".to_string(),
                format!("{}\n{}", record.message, record.exception_text()),
            ),
            ("Location".to_string(), record.location_text()),
        ];

        if record.has_property(ADD_PROPERTIES_TO_XML) {
            for (key, value) in &record.properties {
                elements.push((element_name(key), value.to_string()));
            }
        }

        if let Some(exception) = &record.exception {
            elements.push(("Exception".to_string(), exception.clone()));
        }

        elements
    }
}

/// 属性名里的 `:` `@` `.` 不能出现在元素名中
fn element_name(key: &str) -> String {
    key.replace([':', '@', '.'], "_")
}

impl LogFormatter for XmlFormatter {
    fn format(&self, record: &LogRecord) -> Result<String> {
        let mut writer = if self.config.indent > 0 {
            Writer::new_with_indent(Vec::new(), b' ', self.config.indent)
        } else {
            Writer::new(Vec::new())
        };

        let elements = Self::elements(record);
        writer
            .create_element("LogEntry")
            .write_inner_content(|w| {
                for (name, value) in &elements {
                    w.create_element(name)
                        .write_text_content(BytesText::new(value))?;
                }
                Ok::<(), quick_xml::Error>(())
            })?;

        Ok(String::from_utf8(writer.into_inner())?)
    }
}

crate::impl_from!(XmlFormatterConfig => XmlFormatter);
crate::impl_box_from!(XmlFormatter => dyn LogFormatter);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::record::{LocationInfo, LogLevel};

    #[test]
    fn test_xml_formatter_format() {
        let formatter = XmlFormatter::new(XmlFormatterConfig::default());
        let record = LogRecord::new(LogLevel::Info, "app.web", "a < b")
            .with_user_name("alice")
            .with_domain("shop")
            .with_location(LocationInfo::new("Handler", "serve", "web.rs", "12"));

        let xml = formatter.format(&record).unwrap();
        assert!(xml.starts_with("<LogEntry>"));
        assert!(xml.trim_end().ends_with("</LogEntry>"));
        assert!(xml.contains("<UserName>alice</UserName>"));
        assert!(xml.contains("<LoggerName>app.web</LoggerName>"));
        assert!(xml.contains("<Level>INFO</Level>"));
        assert!(xml.contains("a &lt; b"));
        assert!(xml.contains("<Location>Handler.serve(web.rs:12)</Location>"));
        assert!(!xml.contains("<Exception>"));
    }

    #[test]
    fn test_xml_formatter_properties_and_exception() {
        let formatter = XmlFormatter::new(XmlFormatterConfig { indent: 0 });
        let record = LogRecord::new(LogLevel::Error, "app", "failed")
            .with_property(ADD_PROPERTIES_TO_XML, true)
            .with_property("request.id", "r-1")
            .with_property("user@host", "bob")
            .with_exception("boom");

        let xml = formatter.format(&record).unwrap();
        assert!(xml.contains("<RenderedMessage>failed\nboom</RenderedMessage>"));
        assert!(xml.contains("<request_id>r-1</request_id>"));
        assert!(xml.contains("<user_host>bob</user_host>"));
        assert!(xml.contains("<Exception>boom</Exception>"));
    }

    #[test]
    fn test_xml_formatter_skips_properties_without_marker() {
        let formatter = XmlFormatter::new(XmlFormatterConfig::default());
        let record = LogRecord::new(LogLevel::Info, "app", "ok").with_property("request.id", "r-1");

        let xml = formatter.format(&record).unwrap();
        assert!(!xml.contains("request_id"));
    }
}
