//! The recursive manifest document value: a union of scalar, ordered
//! string-keyed map, and list, shared by the serializer, importer and
//! comparator.
//!
//! Kept as an explicit enum rather than reused from `serde_yaml::Value`
//! directly so that zero-value elision and numeric normalization
//! are ordinary, testable match arms instead of reflection over a
//! third-party type — elision must not rely on language-specific
//! reflection semantics for zero-value.

use std::collections::BTreeMap;
use std::fmt;

/// An ordered string-keyed map. Insertion order is preserved for the
/// emit path; the compare/normalize path sorts keys separately where
/// it needs determinism (see `serialize::canonicalize`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedMap(pub Vec<(String, Value)>);

impl OrderedMap {
    pub fn new() -> Self {
        OrderedMap(Vec::new())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, Value)> {
        self.0.iter()
    }

    /// A copy of this map with entries sorted alphabetically by key,
    /// used by the compare/normalize path.
    pub fn sorted(&self) -> BTreeMap<String, Value> {
        self.0.iter().cloned().collect()
    }
}

/// A manifest document value: scalar, ordered map, or list.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(OrderedMap),
}

impl Value {
    pub fn map() -> Value {
        Value::Map(OrderedMap::new())
    }

    pub fn as_map(&self) -> Option<&OrderedMap> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The emptiness predicate used for zero-value elision: nil, empty
    /// string, zero int, zero float, false, empty map, empty list.
    /// Defined explicitly as match arms, not derived via reflection.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(m) => m.is_empty(),
        }
    }

    /// Numeric-then-string-then-deep equality: an
    /// integer-valued float is coerced to its integer form for
    /// comparison, so `2` and `2.0` compare equal.
    pub fn numerically_equal(&self, other: &Value) -> bool {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
            Value::List(_) => write!(f, "[list]"),
            Value::Map(_) => write!(f, "{{map}}"),
        }
    }
}

// --- conversions to/from serde_yaml/serde_json, used at the I/O edges ---

impl From<&serde_yaml::Value> for Value {
    fn from(v: &serde_yaml::Value) -> Self {
        match v {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(*b),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_yaml::Value::String(s) => Value::String(s.clone()),
            serde_yaml::Value::Sequence(seq) => Value::List(seq.iter().map(Value::from).collect()),
            serde_yaml::Value::Mapping(map) => {
                let mut m = OrderedMap::new();
                for (k, v) in map {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        other => serde_yaml::to_string(other).unwrap_or_default(),
                    };
                    m.insert(key, Value::from(v));
                }
                Value::Map(m)
            }
        }
    }
}

impl From<&Value> for serde_yaml::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_yaml::Value::Null,
            Value::Bool(b) => serde_yaml::Value::Bool(*b),
            Value::Int(i) => serde_yaml::Value::Number((*i).into()),
            Value::Float(x) => serde_yaml::Value::Number(
                serde_yaml::Number::from(*x),
            ),
            Value::String(s) => serde_yaml::Value::String(s.clone()),
            Value::List(l) => serde_yaml::Value::Sequence(l.iter().map(serde_yaml::Value::from).collect()),
            Value::Map(m) => {
                let mut map = serde_yaml::Mapping::new();
                for (k, v) in m.iter() {
                    map.insert(serde_yaml::Value::String(k.clone()), v.into());
                }
                serde_yaml::Value::Mapping(map)
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(a) => Value::List(a.iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                let mut m = OrderedMap::new();
                for (k, v) in o {
                    m.insert(k.clone(), Value::from(v));
                }
                Value::Map(m)
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(l) => serde_json::Value::Array(l.iter().map(serde_json::Value::from).collect()),
            Value::Map(m) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in m.iter() {
                    obj.insert(k.clone(), v.into());
                }
                serde_json::Value::Object(obj)
            }
        }
    }
}
