//! Namespace-aware XML parser

pub mod cursor;
pub mod model;
pub mod parser;

pub use model::{Content, Document, Element, QName, XML_NAMESPACE};
pub use parser::{Config, Parser};
