//! Ordered nested mapping produced by the template grammar

use indexmap::map::Entry;
use indexmap::IndexMap;

/// How a mapping is written back out by the encoder.
///
/// The style is a presentation hint only: two mappings with the same
/// entries compare equal regardless of style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapStyle {
    /// `key { ... }` with one entry per line
    #[default]
    Braced,
    /// `a b c { ... }` written as a single multi-key line
    Chained,
    /// Entries on their own lines with no surrounding braces (old bigpipe)
    Bare,
}

/// A single value in a template mapping
#[derive(Debug, Clone)]
pub enum Value {
    /// Bare key at end of line, meaning "present"
    Toggle,
    /// The `none` literal
    None,
    Bool(bool),
    Int(i64),
    /// Text value, quoted on output when it contains whitespace
    Str(String),
    /// Text value emitted verbatim, never quoted
    Raw(String),
    /// Inline set of bare tokens: `{ a b c }`
    Set(Vec<String>),
    Map(Map),
}

impl Value {
    /// Interpret an unquoted word in value position
    pub fn from_word(word: String) -> Self {
        match word.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Str(word),
        }
    }

    /// Interpret a run of digits; values that overflow stay textual
    pub fn from_digits(digits: String) -> Self {
        match digits.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::Str(digits),
        }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Value::Raw(text.into())
    }

    pub fn set<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) | Value::Raw(s) => Some(s),
            _ => None,
        }
    }

    /// True for values that carry no content (`none`, `{}` sets and maps)
    pub fn is_empty(&self) -> bool {
        match self {
            Value::None => true,
            Value::Set(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Toggle, Value::Toggle) | (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) | (Value::Raw(a), Value::Raw(b)) => a == b,
            // sets are unordered
            (Value::Set(a), Value::Set(b)) => {
                let mut a: Vec<_> = a.iter().collect();
                let mut b: Vec<_> = b.iter().collect();
                a.sort();
                b.sort();
                a == b
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

/// Insertion-ordered mapping with unique keys
#[derive(Debug, Clone, Default)]
pub struct Map {
    entries: IndexMap<String, Value>,
    style: MapStyle,
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
    }
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: MapStyle) -> Self {
        Self {
            entries: IndexMap::new(),
            style,
        }
    }

    pub fn style(&self) -> MapStyle {
        self.style
    }

    pub fn set_style(&mut self, style: MapStyle) {
        self.style = style;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Insert or overwrite; an existing key keeps its position
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Remove a key, preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Rename a key in place. Returns false when `old` is missing or `new`
    /// already names another entry.
    pub fn rename(&mut self, old: &str, new: impl Into<String>) -> bool {
        let new = new.into();
        let Some(index) = self.entries.get_index_of(old) else {
            return false;
        };
        if new == old {
            return true;
        }
        if self.entries.contains_key(&new) {
            return false;
        }
        let Some((_, value)) = self.entries.shift_remove_index(index) else {
            return false;
        };
        self.entries.shift_insert(index, new, value);
        true
    }

    /// Follow a path of keys through nested mappings
    pub fn entry_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            current = current.get_mut(segment)?.as_map_mut()?;
        }
        current.get_mut(last)
    }

    /// Nested mapping at `path`
    pub fn block_mut(&mut self, path: &[&str]) -> Option<&mut Map> {
        self.entry_mut(path)?.as_map_mut()
    }

    /// Rename the last key of `path` and return its value
    pub fn rename_entry(&mut self, path: &[&str], new: &str) -> Option<&mut Value> {
        let (last, parents) = path.split_last()?;
        let mut current = self;
        for segment in parents {
            current = current.get_mut(segment)?.as_map_mut()?;
        }
        if !current.rename(last, new) {
            return None;
        }
        current.get_mut(new)
    }

    /// Insert following the grammar's collision rule: chained mappings
    /// merge key by key, anything else replaces the earlier value in place.
    pub fn merge_entry(&mut self, key: String, value: Value) {
        match self.entries.entry(key) {
            Entry::Occupied(mut slot) => match (slot.get_mut(), value) {
                (Value::Map(existing), Value::Map(incoming))
                    if existing.style == MapStyle::Chained && incoming.style == MapStyle::Chained =>
                {
                    existing.merge(incoming)
                }
                (current, value) => *current = value,
            },
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }

    pub fn merge(&mut self, other: Map) {
        for (key, value) in other.entries {
            self.merge_entry(key, value);
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Map {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Map {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_keeps_position() {
        let mut map: Map = [("a", 1i64), ("b", 2), ("c", 3)].into_iter().collect();
        assert!(map.rename("b", "x"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "x", "c"]);
        assert_eq!(map.get("x"), Some(&Value::Int(2)));
        assert!(!map.rename("missing", "y"));
    }

    #[test]
    fn test_rename_onto_existing_key_is_refused() {
        let mut map: Map = [("a", 1i64), ("b", 2)].into_iter().collect();
        assert!(!map.rename("a", "b"));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.get("b"), Some(&Value::Int(2)));

        assert!(map.rename("b", "b"));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_style_ignored_by_equality() {
        let mut chained = Map::with_style(MapStyle::Chained);
        chained.insert("b", 1i64);
        let mut braced = Map::new();
        braced.insert("b", 1i64);
        assert_eq!(chained, braced);
    }

    #[test]
    fn test_sets_compare_unordered() {
        assert_eq!(Value::set(["a", "b"]), Value::set(["b", "a"]));
        assert_ne!(Value::set(["a"]), Value::set(["a", "b"]));
    }

    #[test]
    fn test_merge_chained() {
        let mut left = Map::with_style(MapStyle::Chained);
        left.insert("node", Value::Map(Map::new()));
        let mut right = Map::with_style(MapStyle::Chained);
        right.insert("pool", Value::Map(Map::new()));

        let mut doc = Map::new();
        doc.merge_entry("ltm".to_string(), Value::Map(left));
        doc.merge_entry("ltm".to_string(), Value::Map(right));

        let ltm = doc.get("ltm").and_then(Value::as_map).unwrap();
        assert_eq!(ltm.keys().collect::<Vec<_>>(), vec!["node", "pool"]);
    }

    #[test]
    fn test_merge_last_wins_first_position() {
        let mut doc = Map::new();
        doc.merge_entry("a".to_string(), Value::Int(1));
        doc.merge_entry("b".to_string(), Value::Int(2));
        doc.merge_entry("a".to_string(), Value::Int(3));
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_rename_entry_nested() {
        let mut inner = Map::new();
        inner.insert("$key", Value::Map(Map::new()));
        let mut doc = Map::new();
        doc.insert("node", Value::Map(inner));

        let value = doc.rename_entry(&["node", "$key"], "/Common/n1").unwrap();
        value.as_map_mut().unwrap().insert("address", "10.0.0.1");

        let node = doc.block_mut(&["node", "/Common/n1"]).unwrap();
        assert_eq!(node.get("address"), Some(&Value::from("10.0.0.1")));
    }
}
