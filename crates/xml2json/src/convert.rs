//! XML tree to JSON value conversion
//!
//! Shape rules for a single element:
//!
//! | attributes | child elements | text      | result                                  |
//! |------------|----------------|-----------|-----------------------------------------|
//! | none       | none           | none      | `{}`, or `null` with `empty_as_null`    |
//! | none       | none           | some      | the text as a string                    |
//! | any        | any            | any       | object: `@attr`s, `#text`, child keys   |
//!
//! Text is only kept next to attributes or children when
//! `preserve_mixed_content` is set. Repeated child keys collapse into arrays.

use indexmap::IndexMap;
use tracing::debug;

use crate::error::Result;
use crate::input::Input;
use crate::json;
use crate::value::{Object, Value};
use crate::xml;
use crate::xml::model::{Content, Element, QName};

/// Key under which mixed text content is stored
pub const TEXT_KEY: &str = "#text";

/// Prefix marking attribute keys
pub const ATTRIBUTE_PREFIX: char = '@';

/// Conversion rules
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Wrap the result in an object keyed by the root tag
    pub preserve_root: bool,
    /// Drop namespace URIs from element and attribute keys
    pub strip_namespaces: bool,
    /// Keep text next to attributes or child elements under `#text`
    pub preserve_mixed_content: bool,
    /// Represent empty elements as `null` instead of `{}`
    pub empty_as_null: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            preserve_root: true,
            strip_namespaces: false,
            preserve_mixed_content: true,
            empty_as_null: false,
        }
    }
}

/// Options for every stage of the XML to JSON pipeline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub xml: xml::Config,
    pub convert: Config,
    pub json: json::Config,
}

/// Parse XML, convert it and serialize the result
pub fn xml_to_json_with_options<'a>(
    input: impl Into<Input<'a>>,
    options: &ConvertOptions,
) -> Result<String> {
    let input = input.into();
    debug!(
        bytes = input.len(),
        file = input.filename().unwrap_or("<memory>"),
        bom = input.has_bom(),
        "parsing xml"
    );
    let document = xml::Parser::with_config(input.as_bytes(), options.xml).parse()?;
    let value = convert(&document.root, &options.convert);
    Ok(json::to_string_with_config(&value, &options.json))
}

/// Convert a document's root element to its JSON value, applying the root wrapper
pub fn convert(root: &Element, config: &Config) -> Value {
    let value = build_value(root, config);
    wrap_root(output_key(&root.name, config.strip_namespaces), value, config)
}

/// Output key for an element name: `{uri}local`, or `local` when there is no
/// namespace or namespaces are stripped
pub fn output_key(name: &QName, strip_namespaces: bool) -> String {
    match &name.namespace {
        Some(uri) if !strip_namespaces => format!("{{{uri}}}{}", name.local),
        _ => name.local.clone(),
    }
}

/// Output key for an attribute name: the element rule plus the `@` prefix
pub fn attribute_key(name: &QName, strip_namespaces: bool) -> String {
    let mut key = String::with_capacity(name.local.len() + 1);
    key.push(ATTRIBUTE_PREFIX);
    key.push_str(&output_key(name, strip_namespaces));
    key
}

/// Wrap `value` as `{ key: value }` when the root is preserved
pub fn wrap_root(key: String, value: Value, config: &Config) -> Value {
    if config.preserve_root {
        let mut object = Object::with_capacity(1);
        object.insert(key, value);
        Value::Object(object)
    } else {
        value
    }
}

/// Merge child entries into unique keys
///
/// Distinct keys keep first-occurrence order. A key seen once maps to its
/// value, a key seen more than once to an array of all its values in
/// document order.
pub fn aggregate(entries: Vec<(String, Value)>) -> Object {
    let mut groups: IndexMap<String, Vec<Value>> = IndexMap::with_capacity(entries.len());
    for (key, value) in entries {
        groups.entry(key).or_default().push(value);
    }

    groups
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                values.pop().unwrap_or_default()
            } else {
                Value::Array(values.into())
            };
            (key, value)
        })
        .collect()
}

/// Trimmed text fragments joined by single spaces, `None` if all are blank
pub fn merge_text<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut merged = String::new();
    for fragment in fragments {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }
        if !merged.is_empty() {
            merged.push(' ');
        }
        merged.push_str(fragment);
    }
    (!merged.is_empty()).then_some(merged)
}

/// Build the JSON value of one element without the root wrapper
///
/// Descendants are visited with an explicit work-stack, so arbitrarily deep
/// trees do not grow the call stack.
pub fn build_value(root: &Element, config: &Config) -> Value {
    let mut stack = vec![Frame::new(root)];

    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.next_child() {
            stack.push(Frame::new(child));
            continue;
        }

        let Some(done) = stack.pop() else {
            break;
        };
        let element = done.element;
        let value = done.finish(config);
        match stack.last_mut() {
            Some(parent) => parent
                .entries
                .push((output_key(&element.name, config.strip_namespaces), value)),
            None => return value,
        }
    }

    Value::Null
}

/// An element being converted, with the values of its finished children
struct Frame<'a> {
    element: &'a Element,
    pending: std::slice::Iter<'a, Content>,
    entries: Vec<(String, Value)>,
}

impl<'a> Frame<'a> {
    fn new(element: &'a Element) -> Self {
        Self {
            element,
            pending: element.children.iter(),
            entries: Vec::new(),
        }
    }

    fn next_child(&mut self) -> Option<&'a Element> {
        self.pending.find_map(|content| match content {
            Content::Element(child) => Some(child),
            Content::Text(_) => None,
        })
    }

    fn finish(self, config: &Config) -> Value {
        let element = self.element;
        let text = merge_text(element.text_fragments());

        if element.attributes.is_empty() && self.entries.is_empty() {
            return match text {
                Some(text) => Value::String(text),
                None if config.empty_as_null => Value::Null,
                None => Value::Object(Object::new()),
            };
        }

        let mut object = Object::with_capacity(element.attributes.len() + self.entries.len() + 1);
        for (name, value) in &element.attributes {
            object.insert(attribute_key(name, config.strip_namespaces), value.as_str());
        }
        if config.preserve_mixed_content {
            if let Some(text) = text {
                object.insert(TEXT_KEY, text);
            }
        }
        object.extend(aggregate(self.entries));

        Value::Object(object)
    }
}
