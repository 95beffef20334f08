//! xml2json - XML document to JSON conversion
//!
//! # Quick Start
//!
//! ```
//! use xml2json::xml_to_json;
//! # fn main() -> Result<(), xml2json::Error> {
//! let json = xml_to_json(r#"<root id="123" type="test">Content</root>"#)?;
//! assert_eq!(
//!     json,
//!     "{\n  \"root\": {\n    \"@id\": \"123\",\n    \"@type\": \"test\",\n    \"#text\": \"Content\"\n  }\n}\n"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! The pipeline stages are available on their own as well:
//!
//! ```
//! use xml2json::{ConvertConfig, convert, from_xml_str, serialize};
//! # fn main() -> Result<(), xml2json::Error> {
//! let document = from_xml_str("<list><item>a</item><item>b</item></list>")?;
//! let config = ConvertConfig {
//!     preserve_root: false,
//!     ..ConvertConfig::default()
//! };
//! let value = convert(&document.root, &config);
//! assert_eq!(serialize(&value, false), r#"{"item":["a","b"]}"#);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod input;
pub use input::Input;

pub mod value;
pub use value::{Array, Object, Value};

pub mod xml;
pub use xml::{
    Config as XmlConfig, Content as XmlContent, Document as XmlDocument, Element as XmlElement,
    Parser as XmlParser, QName,
};

pub mod convert;
pub use convert::{Config as ConvertConfig, ConvertOptions, convert, xml_to_json_with_options};

pub mod json;
pub use json::{Config as JsonConfig, serialize, to_string_with_config};

pub mod file;
pub use file::{FileError, FileReport, OutputTarget, convert_file, convert_path};

pub mod batch;
pub use batch::{BatchReport, FileOutcome, convert_dir};

/// Parse XML from string
pub fn from_xml_str(s: &str) -> Result<XmlDocument> {
    from_xml_bytes(s.as_bytes())
}

/// Parse XML from bytes
pub fn from_xml_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    let input = Input::from_bytes(bytes);
    let mut parser = XmlParser::new(input.as_bytes());
    parser.parse()
}

/// Convert an XML document to pretty-printed JSON with default options
pub fn xml_to_json(s: &str) -> Result<String> {
    xml_to_json_with_options(s, &ConvertOptions::default())
}
