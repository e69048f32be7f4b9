//! Text encoder shared by both configuration dialects
//!
//! Document-level entries are written one per line with no indentation.
//! Nested mappings open a brace on the key's line, put each entry on its own
//! line indented one level deeper and close at the parent's indentation.
//! Chained mappings collapse into a single multi-key line.

use std::fmt;

use crate::parser::{Map, MapStyle, Value};

/// Serializes template mappings back to configuration text
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    indent: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

impl Encoder {
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }

    /// Encode a whole document; every top-level line ends with `\n`
    pub fn encode(&self, doc: &Map) -> String {
        let mut out = String::new();
        self.encode_into(&mut out, doc);
        out
    }

    pub fn encode_into(&self, out: &mut String, doc: &Map) {
        for (key, value) in flatten(doc) {
            self.write_item(out, &key, value, 0);
            out.push('\n');
        }
    }

    fn write_item(&self, out: &mut String, key: &str, value: &Value, level: usize) {
        out.push_str(key);
        if !matches!(value, Value::Toggle) {
            out.push(' ');
            self.write_value(out, value, level);
        }
    }

    fn write_value(&self, out: &mut String, value: &Value, level: usize) {
        match value {
            Value::Toggle => {}
            Value::None => out.push_str("none"),
            Value::Bool(true) => out.push_str("true"),
            Value::Bool(false) => out.push_str("false"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Str(s) => out.push_str(&quote(s)),
            Value::Raw(s) => out.push_str(s),
            Value::Set(items) if items.is_empty() => out.push_str("{}"),
            Value::Set(items) => {
                out.push_str("{ ");
                let words: Vec<String> = items.iter().map(|s| quote(s)).collect();
                out.push_str(&words.join(" "));
                out.push_str(" }");
            }
            Value::Map(map) => self.write_map(out, map, level),
        }
    }

    fn write_map(&self, out: &mut String, map: &Map, level: usize) {
        if map.is_empty() {
            out.push_str("{}");
            return;
        }
        let braces = map.style() != MapStyle::Bare;
        if braces {
            out.push('{');
        }
        let inner = " ".repeat(self.indent * (level + 1));
        for (key, value) in flatten(map) {
            out.push('\n');
            out.push_str(&inner);
            self.write_item(out, &key, value, level + 1);
        }
        out.push('\n');
        out.push_str(&" ".repeat(self.indent * level));
        if braces {
            out.push('}');
        }
    }
}

/// Expand chained mappings into `(multi key, value)` pairs
fn flatten(map: &Map) -> Vec<(String, &Value)> {
    let mut items = Vec::with_capacity(map.len());
    for (key, value) in map.iter() {
        push_flat(&mut items, key.to_string(), value);
    }
    items
}

fn push_flat<'m>(items: &mut Vec<(String, &'m Value)>, key: String, value: &'m Value) {
    match value {
        Value::Map(chain) if chain.style() == MapStyle::Chained && !chain.is_empty() => {
            for (next, inner) in chain.iter() {
                push_flat(items, format!("{} {}", key, next), inner);
            }
        }
        _ => items.push((key, value)),
    }
}

/// Quote a string value when it contains whitespace (or is empty)
pub fn quote(s: &str) -> String {
    if !s.is_empty() && !s.chars().any(char::is_whitespace) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Encoder::default().encode(self))
    }
}
