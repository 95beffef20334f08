//! XML parser implementation
//!
//! Open elements are kept on an explicit stack, so nesting depth is bounded by
//! [`Config::max_depth`] rather than by the call stack.

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::xml::cursor::{Cursor, is_whitespace};
use crate::xml::model::{Content, Document, Element, QName, XML_NAMESPACE};

/// Configuration for the XML parser
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum element nesting depth (0 means unlimited)
    pub max_depth: u16,
    /// Maximum input size in bytes (0 means unlimited)
    pub max_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_size: 64 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Create a new config with unlimited depth and size
    pub const fn unlimited() -> Self {
        Self {
            max_depth: 0,
            max_size: 0,
        }
    }

    /// Create a new config with specific limits
    pub const fn new(max_depth: u16, max_size: usize) -> Self {
        Self {
            max_depth,
            max_size,
        }
    }
}

/// XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    cursor: Cursor<'a>,
    config: Config,
}

/// An element whose end tag has not been seen yet
#[derive(Debug)]
struct OpenElement {
    raw_name: String,
    element: Element,
    /// Namespace bindings in scope before this element's declarations
    scope: usize,
}

#[derive(Debug)]
struct Binding {
    /// Empty for the default namespace
    prefix: String,
    /// `None` when `xmlns=""` undeclares the default namespace
    uri: Option<String>,
}

#[derive(Debug, Default)]
struct Namespaces {
    bindings: Vec<Binding>,
}

impl Namespaces {
    fn resolve(&self, prefix: &str) -> Option<Option<&str>> {
        if prefix == "xml" {
            return Some(Some(XML_NAMESPACE));
        }
        self.bindings
            .iter()
            .rev()
            .find(|binding| binding.prefix == prefix)
            .map(|binding| binding.uri.as_deref())
    }

    fn default_namespace(&self) -> Option<&str> {
        self.resolve("").flatten()
    }

    fn len(&self) -> usize {
        self.bindings.len()
    }

    fn truncate(&mut self, len: usize) {
        self.bindings.truncate(len);
    }
}

/// Raw attribute as written in a start tag
#[derive(Debug)]
struct RawAttribute {
    name: String,
    value: String,
    pos: Pos,
}

enum Markup {
    Start(OpenElement, bool),
    End(String, Pos),
    Text(String),
    Skipped,
}

impl<'a> Parser<'a> {
    /// Create a new parser with default configuration
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a new parser with custom configuration
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
        }
    }

    /// Parse an XML document
    pub fn parse(&mut self) -> Result<Document> {
        let input = self.cursor.remaining();
        if self.config.max_size > 0 && input.len() > self.config.max_size {
            return Err(Error::at(
                ErrorKind::MaxSizeExceeded {
                    max: self.config.max_size,
                },
                self.cursor.position(),
            ));
        }
        if let Err(err) = std::str::from_utf8(input) {
            return Err(Error::at(
                ErrorKind::InvalidUtf8,
                position_of(input, err.valid_up_to()),
            ));
        }

        self.skip_prolog()?;
        match self.cursor.current() {
            None => return Err(Error::at(ErrorKind::MissingRoot, self.cursor.position())),
            Some(b'<') => {}
            Some(_) => return Err(self.expected("'<'")),
        }

        let root = self.parse_root()?;
        self.skip_epilog()?;

        if !self.cursor.is_eof() {
            return Err(Error::at(ErrorKind::TrailingContent, self.cursor.position()));
        }

        Ok(Document { root })
    }

    fn parse_root(&mut self) -> Result<Element> {
        let mut stack: Vec<OpenElement> = Vec::new();
        let mut namespaces = Namespaces::default();

        loop {
            let markup = if stack.is_empty() {
                let (open, self_closing) = self.parse_start_tag(&mut namespaces)?;
                Markup::Start(open, self_closing)
            } else {
                self.parse_content(&mut namespaces)?
            };

            let finished = match markup {
                Markup::Start(open, self_closing) => {
                    let max = self.config.max_depth;
                    if max > 0 && stack.len() >= usize::from(max) {
                        return Err(Error::at(
                            ErrorKind::MaxDepthExceeded { max },
                            self.cursor.position(),
                        ));
                    }
                    if self_closing {
                        namespaces.truncate(open.scope);
                        attach(&mut stack, open.element)
                    } else {
                        stack.push(open);
                        None
                    }
                }
                Markup::End(name, pos) => {
                    let Some(open) = stack.pop() else {
                        return Err(Error::at(ErrorKind::InvalidToken, pos));
                    };
                    if open.raw_name != name {
                        return Err(Error::at(
                            ErrorKind::MismatchedTag {
                                expected: open.raw_name,
                                found: name,
                            },
                            pos,
                        ));
                    }
                    namespaces.truncate(open.scope);
                    attach(&mut stack, open.element)
                }
                Markup::Text(text) => {
                    if let Some(open) = stack.last_mut() {
                        push_text(&mut open.element, text);
                    }
                    None
                }
                Markup::Skipped => None,
            };

            if let Some(root) = finished {
                return Ok(root);
            }

            if self.cursor.is_eof() {
                let name = stack
                    .last()
                    .map(|open| open.raw_name.clone())
                    .unwrap_or_default();
                return Err(Error::with_message(
                    ErrorKind::UnexpectedEof,
                    Span::at(self.cursor.position()),
                    format!("unclosed element <{name}>"),
                ));
            }
        }
    }

    /// Parse the next piece of element content: a tag, text, CDATA, or skipped markup
    fn parse_content(&mut self, namespaces: &mut Namespaces) -> Result<Markup> {
        if self.cursor.current() != Some(b'<') {
            return self.parse_text().map(Markup::Text);
        }

        if self.cursor.starts_with(b"</") {
            let pos = self.cursor.position();
            self.cursor.advance_by(2);
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'>')?;
            return Ok(Markup::End(name, pos));
        }

        if self.cursor.starts_with(b"<!--") {
            self.skip_comment()?;
            return Ok(Markup::Skipped);
        }

        if self.cursor.consume_bytes(b"<![CDATA[") {
            let raw = self.take_until(b"]]>", "unterminated CDATA section")?;
            return Ok(Markup::Text(normalize_newlines(&raw)));
        }

        if self.cursor.starts_with(b"<?") {
            self.skip_processing_instruction()?;
            return Ok(Markup::Skipped);
        }

        if self.cursor.peek(1) == Some(b'!') {
            return Err(self.error_here(ErrorKind::InvalidToken, "unexpected declaration"));
        }

        let (open, self_closing) = self.parse_start_tag(namespaces)?;
        Ok(Markup::Start(open, self_closing))
    }

    fn parse_start_tag(&mut self, namespaces: &mut Namespaces) -> Result<(OpenElement, bool)> {
        let tag_pos = self.cursor.position();
        self.expect_byte(b'<')?;
        let raw_name = self.parse_name()?;
        let attributes = self.parse_attributes()?;

        let self_closing = self.cursor.consume(b'/');
        self.expect_byte(b'>')?;

        let scope = namespaces.len();
        let mut plain = Vec::with_capacity(attributes.len());
        for attr in attributes {
            if attr.name == "xmlns" {
                namespaces.bindings.push(Binding {
                    prefix: String::new(),
                    uri: (!attr.value.is_empty()).then_some(attr.value),
                });
            } else if let Some(prefix) = attr.name.strip_prefix("xmlns:") {
                if attr.value.is_empty() {
                    return Err(Error::with_message(
                        ErrorKind::InvalidToken,
                        Span::at(attr.pos),
                        format!("empty namespace for prefix {prefix}"),
                    ));
                }
                namespaces.bindings.push(Binding {
                    prefix: prefix.to_string(),
                    uri: Some(attr.value),
                });
            } else {
                plain.push(attr);
            }
        }

        let name = resolve_name(&raw_name, namespaces, true, tag_pos)?;
        let mut resolved = IndexMap::with_capacity(plain.len());
        for attr in plain {
            let key = resolve_name(&attr.name, namespaces, false, attr.pos)?;
            if resolved.contains_key(&key) {
                return Err(Error::at(
                    ErrorKind::DuplicateAttribute { name: attr.name },
                    attr.pos,
                ));
            }
            resolved.insert(key, attr.value);
        }

        let element = Element {
            name,
            attributes: resolved,
            children: Vec::new(),
        };
        Ok((
            OpenElement {
                raw_name,
                element,
                scope,
            },
            self_closing,
        ))
    }

    fn parse_attributes(&mut self) -> Result<Vec<RawAttribute>> {
        let mut attrs: Vec<RawAttribute> = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => break,
                Some(_) if !had_space => return Err(self.expected("whitespace")),
                Some(_) => {}
                None => return Err(Error::at(ErrorKind::UnexpectedEof, self.cursor.position())),
            }

            let pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.iter().any(|attr| attr.name == name) {
                return Err(Error::at(ErrorKind::DuplicateAttribute { name }, pos));
            }
            attrs.push(RawAttribute { name, value, pos });
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.expected("quoted attribute value")),
        };
        self.cursor.advance();

        let pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = bytes_to_string(self.cursor.slice_from(start), pos)?;
                self.cursor.advance();
                let normalized: String = normalize_newlines(&raw)
                    .chars()
                    .map(|ch| if matches!(ch, '\n' | '\t') { ' ' } else { ch })
                    .collect();
                return decode_entities(&normalized, pos);
            }
            if b == b'<' {
                return Err(self.error_here(ErrorKind::InvalidToken, "'<' in attribute value"));
            }
            self.cursor.advance();
        }

        Err(Error::with_message(
            ErrorKind::UnexpectedEof,
            Span::at(pos),
            "unterminated attribute value",
        ))
    }

    fn parse_text(&mut self) -> Result<String> {
        let pos = self.cursor.position();
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = bytes_to_string(self.cursor.slice_from(start), pos)?;
        decode_entities(&normalize_newlines(&raw), pos)
    }

    fn parse_name(&mut self) -> Result<String> {
        let pos = self.cursor.position();
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(b) if is_name_start(b) => self.cursor.advance(),
            Some(_) => return Err(Error::at(ErrorKind::InvalidName, pos)),
            None => return Err(Error::at(ErrorKind::UnexpectedEof, pos)),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        bytes_to_string(self.cursor.slice_from(start), pos)
    }

    /// Skip whitespace, comments, processing instructions, the XML
    /// declaration and the doctype before the root element
    fn skip_prolog(&mut self) -> Result<()> {
        let mut first = true;
        loop {
            self.skip_whitespace();
            if self.cursor.starts_with(b"<?xml")
                && self.cursor.peek(5).is_some_and(|b| is_whitespace(b) || b == b'?')
            {
                if !first {
                    return Err(self.error_here(
                        ErrorKind::InvalidToken,
                        "xml declaration not at start of document",
                    ));
                }
                self.parse_declaration()?;
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.skip_doctype()?;
            } else {
                return Ok(());
            }
            first = false;
        }
    }

    fn skip_epilog(&mut self) -> Result<()> {
        loop {
            self.skip_whitespace();
            if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else {
                return Ok(());
            }
        }
    }

    fn parse_declaration(&mut self) -> Result<()> {
        let pos = self.cursor.position();
        self.cursor.advance_by(5);
        let body = self.take_until(b"?>", "unterminated xml declaration")?;
        if let Some(encoding) = pseudo_attribute(&body, "encoding") {
            let normalized = encoding.to_ascii_lowercase();
            if !matches!(normalized.as_str(), "utf-8" | "utf8" | "us-ascii" | "ascii") {
                return Err(Error::at(
                    ErrorKind::UnsupportedEncoding {
                        encoding: encoding.to_string(),
                    },
                    pos,
                ));
            }
        }
        Ok(())
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.cursor.advance_by(4);
        self.take_until(b"-->", "unterminated comment").map(drop)
    }

    fn skip_processing_instruction(&mut self) -> Result<()> {
        self.cursor.advance_by(2);
        self.take_until(b"?>", "unterminated processing instruction")
            .map(drop)
    }

    /// Skip `<!DOCTYPE ...>`, including a bracketed internal subset
    fn skip_doctype(&mut self) -> Result<()> {
        let pos = self.cursor.position();
        let mut brackets = 0usize;
        let mut quote: Option<u8> = None;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match (quote, b) {
                (Some(q), _) if b == q => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => brackets += 1,
                (None, b']') => brackets = brackets.saturating_sub(1),
                (None, b'>') if brackets == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(Error::with_message(
            ErrorKind::UnexpectedEof,
            Span::at(pos),
            "unterminated doctype",
        ))
    }

    /// Consume input up to and including `pattern`, returning what came before it
    fn take_until(&mut self, pattern: &[u8], message: &str) -> Result<String> {
        let pos = self.cursor.position();
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                let body = bytes_to_string(self.cursor.slice_from(start), pos)?;
                self.cursor.advance_by(pattern.len());
                return Ok(body);
            }
            self.cursor.advance();
        }
        Err(Error::with_message(
            ErrorKind::UnexpectedEof,
            Span::at(pos),
            message,
        ))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else {
            Err(self.expected(&format!("'{}'", char::from(expected))))
        }
    }

    /// Returns whether any whitespace was skipped
    fn skip_whitespace(&mut self) -> bool {
        let start = self.cursor.pos();
        self.cursor.skip_whitespace();
        self.cursor.pos() > start
    }

    fn expected(&self, expected: &str) -> Error {
        let found = match self.cursor.current() {
            Some(b) if b.is_ascii_graphic() => format!("'{}'", char::from(b)),
            Some(_) => "non-ascii byte".to_string(),
            None => "end of input".to_string(),
        };
        Error::at(
            ErrorKind::Expected {
                expected: expected.to_string(),
                found,
            },
            self.cursor.position(),
        )
    }

    fn error_here(&self, kind: ErrorKind, message: &str) -> Error {
        Error::with_message(kind, Span::at(self.cursor.position()), message)
    }
}

/// Hand a finished element to its parent, or return it if it is the root
fn attach(stack: &mut [OpenElement], element: Element) -> Option<Element> {
    match stack.last_mut() {
        Some(parent) => {
            parent.element.children.push(Content::Element(element));
            None
        }
        None => Some(element),
    }
}

/// Append text, merging with a preceding text node split only by a comment or PI
fn push_text(element: &mut Element, text: String) {
    if text.is_empty() {
        return;
    }
    match element.children.last_mut() {
        Some(Content::Text(previous)) => previous.push_str(&text),
        _ => element.children.push(Content::Text(text)),
    }
}

fn resolve_name(raw: &str, namespaces: &Namespaces, is_element: bool, pos: Pos) -> Result<QName> {
    match raw.split_once(':') {
        Some((prefix, local)) => {
            if prefix.is_empty() || local.is_empty() || local.contains(':') {
                return Err(Error::with_message(
                    ErrorKind::InvalidName,
                    Span::at(pos),
                    format!("invalid qualified name: {raw}"),
                ));
            }
            match namespaces.resolve(prefix) {
                Some(Some(uri)) => Ok(QName::namespaced(uri, local)),
                _ => Err(Error::at(
                    ErrorKind::UnboundPrefix {
                        prefix: prefix.to_string(),
                    },
                    pos,
                )),
            }
        }
        None if is_element => Ok(QName {
            namespace: namespaces.default_namespace().map(str::to_string),
            local: raw.to_string(),
        }),
        None => Ok(QName::local(raw)),
    }
}

/// Value of `name="..."` inside an XML declaration body
fn pseudo_attribute<'s>(body: &'s str, name: &str) -> Option<&'s str> {
    let (_, rest) = body.split_once(name)?;
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|q| matches!(q, '"' | '\''))?;
    let rest = rest.get(1..)?;
    rest.split_once(quote).map(|(value, _)| value)
}

fn position_of(input: &[u8], offset: usize) -> Pos {
    let mut cursor = Cursor::new(input);
    cursor.advance_by(offset);
    cursor.position()
}

fn bytes_to_string(bytes: &[u8], pos: Pos) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::at(ErrorKind::InvalidUtf8, pos))
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// `\r\n` and lone `\r` become `\n`
fn normalize_newlines(input: &str) -> String {
    if input.contains('\r') {
        input.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        input.to_string()
    }
}

fn decode_entities(input: &str, pos: Pos) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_string());
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        result.push_str(before);
        let after = after.get(1..).unwrap_or_default();

        let Some((entity, tail)) = after.split_once(';') else {
            return Err(Error::at(
                ErrorKind::InvalidEntity {
                    entity: after.chars().take(16).collect(),
                },
                pos,
            ));
        };

        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => decode_numeric_entity(entity),
        };

        match decoded {
            Some(ch) => result.push(ch),
            None => {
                return Err(Error::at(
                    ErrorKind::InvalidEntity {
                        entity: entity.to_string(),
                    },
                    pos,
                ));
            }
        }
        rest = tail;
    }
    result.push_str(rest);

    Ok(result)
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Document> {
        Parser::new(input.as_bytes()).parse()
    }

    fn first_element(element: &Element) -> Option<&Element> {
        element.elements().next()
    }

    #[test]
    fn test_parse_simple_element() -> Result<()> {
        let doc = parse("<root></root>")?;
        assert_eq!(doc.root.name, QName::local("root"));
        assert!(doc.root.children.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_with_attributes() -> Result<()> {
        let doc = parse("<root id=\"1\" name='test'></root>")?;
        assert_eq!(
            doc.root.attributes.get(&QName::local("id")),
            Some(&"1".to_string())
        );
        assert_eq!(
            doc.root.attributes.get(&QName::local("name")),
            Some(&"test".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_parse_nested_with_tail_text() -> Result<()> {
        let doc = parse("<root>a<child>text</child>b</root>")?;
        let fragments: Vec<_> = doc.root.text_fragments().collect();
        assert_eq!(fragments, vec!["a", "b"]);
        let child = first_element(&doc.root);
        assert_eq!(child.map(|c| c.name.local.as_str()), Some("child"));
        Ok(())
    }

    #[test]
    fn test_parse_self_closing() -> Result<()> {
        let doc = parse("<root><child /></root>")?;
        let child = first_element(&doc.root);
        assert_eq!(child.map(|c| c.children.len()), Some(0));
        Ok(())
    }

    #[test]
    fn test_prolog_and_epilog_are_skipped() -> Result<()> {
        let input = "\u{feff}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                     <!DOCTYPE root [<!ENTITY x \"y\">]>\n\
                     <!-- header -->\n<root/>\n<!-- trailer -->\n";
        let doc = Parser::new(crate::Input::from_str(input).as_bytes()).parse()?;
        assert_eq!(doc.root.name.local, "root");
        Ok(())
    }

    #[test]
    fn test_comment_does_not_split_text() -> Result<()> {
        let doc = parse("<root>ab<!-- c -->cd<?pi x?>ef</root>")?;
        let fragments: Vec<_> = doc.root.text_fragments().collect();
        assert_eq!(fragments, vec!["abcdef"]);
        Ok(())
    }

    #[test]
    fn test_cdata_is_text() -> Result<()> {
        let doc = parse("<root><![CDATA[<b>&amp;</b>]]></root>")?;
        let fragments: Vec<_> = doc.root.text_fragments().collect();
        assert_eq!(fragments, vec!["<b>&amp;</b>"]);
        Ok(())
    }

    #[test]
    fn test_entities_decoded() -> Result<()> {
        let doc = parse("<r a=\"&lt;&#65;&#x42;\">&amp;&quot;&apos;&gt;</r>")?;
        assert_eq!(
            doc.root.attributes.get(&QName::local("a")),
            Some(&"<AB".to_string())
        );
        let fragments: Vec<_> = doc.root.text_fragments().collect();
        assert_eq!(fragments, vec!["&\"'>"]);
        Ok(())
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let err = parse("<r>&nbsp;</r>").err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::InvalidEntity { entity }) if entity == "nbsp"
        ));
    }

    #[test]
    fn test_line_endings_normalized() -> Result<()> {
        let doc = parse("<r a=\"x\r\ny\">1\r\n2\r3</r>")?;
        assert_eq!(
            doc.root.attributes.get(&QName::local("a")),
            Some(&"x y".to_string())
        );
        let fragments: Vec<_> = doc.root.text_fragments().collect();
        assert_eq!(fragments, vec!["1\n2\n3"]);
        Ok(())
    }

    #[test]
    fn test_namespaces_resolved() -> Result<()> {
        let input = r#"<root xmlns="urn:d" xmlns:p="urn:p" p:a="1" b="2"><p:x/><y xmlns=""/></root>"#;
        let doc = parse(input)?;
        assert_eq!(doc.root.name, QName::namespaced("urn:d", "root"));
        let keys: Vec<_> = doc.root.attributes.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![QName::namespaced("urn:p", "a"), QName::local("b")]
        );
        let names: Vec<_> = doc.root.elements().map(|e| e.name.clone()).collect();
        assert_eq!(
            names,
            vec![QName::namespaced("urn:p", "x"), QName::local("y")]
        );
        Ok(())
    }

    #[test]
    fn test_namespace_scope_ends_with_element() {
        let err = parse(r#"<r><a xmlns:p="urn:p"/><p:b/></r>"#).err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::UnboundPrefix { prefix }) if prefix == "p"
        ));
    }

    #[test]
    fn test_xml_prefix_is_prebound() -> Result<()> {
        let doc = parse(r#"<r xml:lang="en"/>"#)?;
        assert!(doc
            .root
            .attributes
            .contains_key(&QName::namespaced(XML_NAMESPACE, "lang")));
        Ok(())
    }

    #[test]
    fn test_duplicate_resolved_attribute_rejected() {
        let input = r#"<r xmlns:a="urn:x" xmlns:b="urn:x" a:k="1" b:k="2"/>"#;
        let err = parse(input).err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn test_mismatched_tag_reports_position() {
        let err = parse("<root>\n  <a></b>\n</root>").err();
        let Some(err) = err else {
            unreachable!("mismatched tags must fail");
        };
        assert!(matches!(err.kind(), ErrorKind::MismatchedTag { .. }));
        assert_eq!(err.span().start.line, 2);
    }

    #[test]
    fn test_structural_errors() {
        for input in [
            "",
            "   ",
            "text",
            "<root>",
            "<root><a></root>",
            "<root></root><extra/>",
            "<root a=\"1\" a=\"2\"/>",
            "<root a=1/>",
            "<root a=\"<\"/>",
            "<1root/>",
            "<root>&amp</root>",
            "<root><!-- never closed </root>",
        ] {
            assert!(parse(input).is_err(), "expected failure for {input:?}");
        }
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = Parser::new(b"<r>\xff</r>").parse().err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::InvalidUtf8)
        ));
    }

    #[test]
    fn test_unsupported_encoding_rejected() {
        let err = parse("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r/>").err();
        assert!(matches!(
            err.map(|e| e.kind().clone()),
            Some(ErrorKind::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_max_depth_enforced() {
        let input = format!("{}{}", "<a>".repeat(5), "</a>".repeat(5));
        let mut shallow = Parser::with_config(input.as_bytes(), Config::new(4, 0));
        assert!(matches!(
            shallow.parse().map_err(|e| e.kind().clone()),
            Err(ErrorKind::MaxDepthExceeded { max: 4 })
        ));

        let mut exact = Parser::with_config(input.as_bytes(), Config::new(5, 0));
        assert!(exact.parse().is_ok());
    }

    #[test]
    fn test_deep_nesting_without_limit() {
        let depth = 100_000;
        let input = format!("{}{}", "<a>".repeat(depth), "</a>".repeat(depth));
        let mut parser = Parser::with_config(input.as_bytes(), Config::unlimited());
        let doc = parser.parse();
        assert!(doc.is_ok());
    }

    #[test]
    fn test_max_size_enforced() {
        let mut parser = Parser::with_config(b"<root>abcdef</root>", Config::new(0, 8));
        assert!(matches!(
            parser.parse().map_err(|e| e.kind().clone()),
            Err(ErrorKind::MaxSizeExceeded { max: 8 })
        ));
    }

    #[test]
    fn test_pseudo_attribute() {
        assert_eq!(
            pseudo_attribute(" version=\"1.0\" encoding='utf-8'", "encoding"),
            Some("utf-8")
        );
        assert_eq!(pseudo_attribute(" version=\"1.0\"", "encoding"), None);
    }
}
