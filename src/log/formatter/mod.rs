mod core;
mod json_formatter;
mod registry;
mod text_formatter;
mod xml_formatter;

pub use self::core::{LogFormatter, OutputFormat};
pub use json_formatter::{JsonFormatter, JsonFormatterConfig};
pub use registry::{create_formatter_from_options, register_formatters};
pub use text_formatter::{TextFormatter, TextFormatterConfig};
pub use xml_formatter::{XmlFormatter, XmlFormatterConfig, ADD_PROPERTIES_TO_XML};
