//! Typed values and the evaluation context

use std::collections::BTreeMap;

/// A context value: the typed union conditions operate on
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Build a map value from key/value pairs
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Boolean coercion.
    ///
    /// Numbers are true when non-zero; the strings `"true"`/`"false"` map to
    /// their boolean in any case; other strings, lists and maps are true when
    /// non-empty; `null` is false.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => {
                if s.eq_ignore_ascii_case("true") {
                    true
                } else if s.eq_ignore_ascii_case("false") {
                    false
                } else {
                    !s.is_empty()
                }
            }
            Self::List(items) => !items.is_empty(),
            Self::Map(entries) => !entries.is_empty(),
        }
    }

    /// Numeric view: numbers, and strings that parse as numbers
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Walk a dotted path; any missing segment yields `Null`
    pub fn lookup<S: AsRef<str>>(&self, path: &[S]) -> &Value {
        static NULL: Value = Value::Null;
        let mut current = self;
        for segment in path {
            current = match current {
                Self::Map(entries) => match entries.get(segment.as_ref()) {
                    Some(v) => v,
                    None => return &NULL,
                },
                Self::List(items) => match segment
                    .as_ref()
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i))
                {
                    Some(v) => v,
                    None => return &NULL,
                },
                _ => return &NULL,
            };
        }
        current
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number).unwrap_or(Self::Null),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => {
                Self::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Value {
    fn from(entries: serde_json::Map<String, serde_json::Value>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "'{}'", s),
            Self::List(items) => write!(f, "[{} items]", items.len()),
            Self::Map(entries) => write!(f, "{{{} entries}}", entries.len()),
        }
    }
}

// ── Context ──────────────────────────────────────────────────────────

/// Root namespace of an evaluation: top-level names to values
#[derive(Clone, Debug, PartialEq)]
pub struct Context {
    root: Value,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            root: Value::Map(BTreeMap::new()),
        }
    }

    /// Bind `name`, replacing any previous binding
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        if let Value::Map(entries) = &mut self.root {
            entries.insert(name.into(), value);
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind every entry of `map` at the top level, without overwriting
    /// names that are already bound.
    pub fn flatten(&mut self, map: &Value) {
        let (Value::Map(root), Value::Map(entries)) = (&mut self.root, map) else {
            return;
        };
        for (k, v) in entries {
            root.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        !matches!(self.root.lookup(&[name]), Value::Null)
    }

    pub fn get(&self, name: &str) -> &Value {
        self.root.lookup(&[name])
    }

    /// Resolve a dotted path from the root
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> &Value {
        self.root.lookup(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.truthy());
        assert!(Value::from(2).truthy());
        assert!(!Value::from(0).truthy());
        assert!(Value::from("TRUE").truthy());
        assert!(!Value::from("False").truthy());
        assert!(Value::from("yes").truthy());
        assert!(!Value::from("").truthy());
        assert!(!Value::List(vec![]).truthy());
    }

    #[test]
    fn test_numeric_strings() {
        assert_eq!(Value::from(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Value::from("abc").as_number(), None);
        assert_eq!(Value::from("NaN").as_number(), None);
        assert_eq!(Value::Bool(true).as_number(), None);
    }

    #[test]
    fn test_from_json_and_lookup() {
        let v = Value::from(json!({
            "entity": {"estimated_cost": 5000, "tags": ["a", "b"]},
            "title": "x"
        }));
        assert_eq!(v.lookup(&["entity", "estimated_cost"]), &Value::Number(5000.0));
        assert_eq!(v.lookup(&["entity", "tags", "1"]), &Value::from("b"));
        assert_eq!(v.lookup(&["entity", "missing"]), &Value::Null);
        assert_eq!(v.lookup(&["title", "deeper"]), &Value::Null);
    }

    #[test]
    fn test_flatten_keeps_existing_bindings() {
        let mut ctx = Context::new().with("instance", Value::from("reserved"));
        let form = Value::map([("amount", Value::from(10)), ("instance", Value::from("spoof"))]);
        ctx.flatten(&form);
        assert_eq!(ctx.get("amount"), &Value::Number(10.0));
        assert_eq!(ctx.get("instance"), &Value::from("reserved"));
        assert!(ctx.contains("amount"));
        assert!(!ctx.contains("nope"));
    }
}
