//! JSON serializer for converted values

use crate::value::Value;

/// Serializer configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Indent nested values, one entry per line, with a trailing newline
    pub pretty: bool,
    /// Spaces per nesting level in pretty mode
    pub indent: usize,
    /// Escape every non-ASCII character as `\uXXXX`
    pub ensure_ascii: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
            ensure_ascii: false,
        }
    }
}

impl Config {
    /// Single-line output without whitespace
    pub const fn compact() -> Self {
        Self {
            pretty: false,
            indent: 0,
            ensure_ascii: false,
        }
    }

    /// Indented output with `indent` spaces per level
    pub const fn pretty(indent: usize) -> Self {
        Self {
            pretty: true,
            indent,
            ensure_ascii: false,
        }
    }
}

/// Render a value as pretty (2-space indent) or compact JSON
pub fn serialize(value: &Value, pretty: bool) -> String {
    let config = if pretty {
        Config::default()
    } else {
        Config::compact()
    };
    to_string_with_config(value, &config)
}

/// Render a value with explicit serializer settings
pub fn to_string_with_config(value: &Value, config: &Config) -> String {
    let mut serializer = Serializer::new(config);
    serializer.write(value);
    serializer.finish()
}

enum Items<'a> {
    Array(std::slice::Iter<'a, Value>),
    Object(indexmap::map::Iter<'a, String, Value>),
}

/// A container whose items are still being written
struct Level<'a> {
    items: Items<'a>,
    close: char,
    first: bool,
}

struct Serializer<'c> {
    config: &'c Config,
    out: String,
}

impl<'c> Serializer<'c> {
    fn new(config: &'c Config) -> Self {
        Self {
            config,
            out: String::new(),
        }
    }

    fn finish(mut self) -> String {
        if self.config.pretty {
            self.out.push('\n');
        }
        self.out
    }

    /// Write `root`, keeping open containers on an explicit stack
    fn write(&mut self, root: &Value) {
        let mut stack: Vec<Level<'_>> = Vec::new();
        self.begin(root, &mut stack);

        while let Some(level) = stack.last_mut() {
            let next = match &mut level.items {
                Items::Array(items) => items.next().map(|value| (None, value)),
                Items::Object(entries) => entries.next().map(|(key, value)| (Some(key), value)),
            };

            match next {
                Some((key, value)) => {
                    if !level.first {
                        self.out.push(',');
                    }
                    level.first = false;
                    let depth = stack.len();
                    self.newline(depth);
                    if let Some(key) = key {
                        self.write_string(key);
                        self.out.push(':');
                        if self.config.pretty {
                            self.out.push(' ');
                        }
                    }
                    self.begin(value, &mut stack);
                }
                None => {
                    let close = level.close;
                    stack.pop();
                    self.newline(stack.len());
                    self.out.push(close);
                }
            }
        }
    }

    /// Write a scalar or empty container, or open a non-empty container
    fn begin<'v>(&mut self, value: &'v Value, stack: &mut Vec<Level<'v>>) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::String(s) => self.write_string(s),
            Value::Array(arr) if arr.is_empty() => self.out.push_str("[]"),
            Value::Array(arr) => {
                self.out.push('[');
                stack.push(Level {
                    items: Items::Array(arr.iter()),
                    close: ']',
                    first: true,
                });
            }
            Value::Object(obj) if obj.is_empty() => self.out.push_str("{}"),
            Value::Object(obj) => {
                self.out.push('{');
                stack.push(Level {
                    items: Items::Object(obj.iter()),
                    close: '}',
                    first: true,
                });
            }
        }
    }

    fn newline(&mut self, depth: usize) {
        if self.config.pretty {
            self.out.push('\n');
            self.out
                .extend(std::iter::repeat_n(' ', depth * self.config.indent));
        }
    }

    fn write_string(&mut self, s: &str) {
        self.out.push('"');
        escape_into(&mut self.out, s, self.config.ensure_ascii);
        self.out.push('"');
    }
}

/// Escape `input` as the body of a JSON string
pub fn escape_into(out: &mut String, input: &str, ensure_ascii: bool) {
    for ch in input.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if c < '\u{20}' => push_unicode_escape(out, u32::from(c)),
            c if ensure_ascii && !c.is_ascii() => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    push_unicode_escape(out, u32::from(*unit));
                }
            }
            c => out.push(c),
        }
    }
}

fn push_unicode_escape(out: &mut String, unit: u32) {
    out.push_str(&format!("\\u{unit:04x}"));
}
