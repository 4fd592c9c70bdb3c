use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Property a foreign producer sets on a plain map to mark it as an immutable collection.
pub const SENTINEL_ITERABLE: &str = "@@__IMMUTABLE_ITERABLE__@@";
/// Property a foreign producer sets on a plain map to mark it as an immutable record.
pub const SENTINEL_RECORD: &str = "@@__IMMUTABLE_RECORD__@@";

/// A dynamically shaped state value.
///
/// Plain variants (`List`, `Map`) are owned and compared by value. `Immutable` values are
/// shared collections: cloning one is cheap and keeps its identity, which is what the
/// connector relies on to detect "nothing changed" without a deep comparison.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Immutable(Immutable),
}

#[derive(Debug, Clone, PartialEq)]
enum Collection {
    Map(BTreeMap<String, Value>),
    List(Vec<Value>),
}

/// A persistent collection with reference identity.
///
/// Every update returns a new `Immutable`; children that were not touched are carried over
/// by clone, so nested immutable children keep their identity across updates.
#[derive(Clone)]
pub struct Immutable(Arc<Collection>);

impl Immutable {
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Immutable(Arc::new(Collection::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )))
    }

    pub fn list<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Immutable(Arc::new(Collection::List(
            items.into_iter().map(Into::into).collect(),
        )))
    }

    pub fn empty_map() -> Self {
        Immutable(Arc::new(Collection::Map(BTreeMap::new())))
    }

    /// True when both handles point at the same collection.
    pub fn ptr_eq(&self, other: &Immutable) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_list(&self) -> bool {
        matches!(*self.0, Collection::List(_))
    }

    pub fn len(&self) -> usize {
        match &*self.0 {
            Collection::Map(map) => map.len(),
            Collection::List(list) => list.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match &*self.0 {
            Collection::Map(map) => map.get(key),
            Collection::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
        }
    }

    pub fn get_in<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first.as_ref())?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.get_in(rest)
        }
    }

    /// Returns a copy with `key` set. Setting a list index past the end appends.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Immutable {
        let key = key.into();
        let value = value.into();
        let collection = match &*self.0 {
            Collection::Map(map) => {
                let mut map = map.clone();
                map.insert(key, value);
                Collection::Map(map)
            }
            Collection::List(list) => {
                let mut list = list.clone();
                match key.parse::<usize>() {
                    Ok(i) if i < list.len() => list[i] = value,
                    _ => list.push(value),
                }
                Collection::List(list)
            }
        };
        Immutable(Arc::new(collection))
    }

    /// Returns a copy with the value at `path` replaced, creating empty maps along the way.
    ///
    /// Plain maps and lists on the path become immutable, keeping their other entries.
    pub fn set_in<S: AsRef<str>>(&self, path: &[S], value: impl Into<Value>) -> Immutable {
        let Some((first, rest)) = path.split_first() else {
            return self.clone();
        };
        let key = first.as_ref();
        if rest.is_empty() {
            return self.set(key, value);
        }
        let child = match self.get(key) {
            Some(Value::Immutable(child)) => child.clone(),
            Some(Value::Map(map)) => Immutable(Arc::new(Collection::Map(map.clone()))),
            Some(Value::List(list)) => Immutable(Arc::new(Collection::List(list.clone()))),
            _ => Immutable::empty_map(),
        };
        self.set(key, child.set_in(rest, value))
    }

    /// Returns a copy with `f` applied to the value at `key` (`Null` when absent).
    pub fn update<F>(&self, key: &str, f: F) -> Immutable
    where
        F: FnOnce(&Value) -> Value,
    {
        let current = self.get(key).cloned().unwrap_or_default();
        self.set(key, f(&current))
    }

    pub fn push(&self, value: impl Into<Value>) -> Immutable {
        let len = self.len();
        self.set(len.to_string(), value)
    }

    pub fn keys(&self) -> Vec<String> {
        match &*self.0 {
            Collection::Map(map) => map.keys().cloned().collect(),
            Collection::List(list) => (0..list.len()).map(|i| i.to_string()).collect(),
        }
    }

    /// Deep conversion into plain maps and lists.
    pub fn to_plain(&self) -> Value {
        match &*self.0 {
            Collection::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain()))
                    .collect(),
            ),
            Collection::List(list) => Value::List(list.iter().map(Value::to_plain).collect()),
        }
    }
}

impl PartialEq for Immutable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl fmt::Debug for Immutable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.0 {
            Collection::Map(map) => fmt::Debug::fmt(map, f),
            Collection::List(list) => fmt::Debug::fmt(list, f),
        }
    }
}

impl Value {
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// JavaScript-style truthiness, used for sentinel properties.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Immutable(_) => true,
        }
    }

    pub fn as_immutable(&self) -> Option<&Immutable> {
        match self {
            Value::Immutable(im) => Some(im),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            // i64::MAX as f64 rounds up to 2^63, which is out of range.
            Value::Float(f)
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Some(*f as i64)
            }
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
            Value::Immutable(im) => im.get(key),
            _ => None,
        }
    }

    pub fn get_in<S: AsRef<str>>(&self, path: &[S]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        let value = self.get(first.as_ref())?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.get_in(rest)
        }
    }

    /// Identity for immutable values, equality for everything else.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Immutable(a), Value::Immutable(b)) => a.ptr_eq(b),
            (Value::Immutable(_), _) | (_, Value::Immutable(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Deep conversion of immutable collections into plain maps and lists.
    pub fn to_plain(&self) -> Value {
        match self {
            Value::Immutable(im) => im.to_plain(),
            Value::List(list) => Value::List(list.iter().map(Value::to_plain).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain()))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Deep conversion of plain maps and lists into immutable collections.
    pub fn into_immutable(self) -> Value {
        match self {
            Value::Map(map) => Value::Immutable(Immutable::map(
                map.into_iter().map(|(k, v)| (k, v.into_immutable())),
            )),
            Value::List(list) => {
                Value::Immutable(Immutable::list(list.into_iter().map(Value::into_immutable)))
            }
            other => other,
        }
    }
}

/// `a` and `b` hold the same value, treating two absent values as the same.
pub(crate) fn same_opt(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.same(b),
        (None, None) => true,
        _ => false,
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl From<Immutable> for Value {
    fn from(value: Immutable) -> Self {
        Value::Immutable(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

#[cfg(feature = "serde")]
mod json {
    use super::Value;
    use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Value::Null => serializer.serialize_unit(),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Int(i) => serializer.serialize_i64(*i),
                Value::Float(f) => serializer.serialize_f64(*f),
                Value::Str(s) => serializer.serialize_str(s),
                Value::List(list) => {
                    let mut seq = serializer.serialize_seq(Some(list.len()))?;
                    for item in list {
                        seq.serialize_element(item)?;
                    }
                    seq.end()
                }
                Value::Map(map) => {
                    let mut out = serializer.serialize_map(Some(map.len()))?;
                    for (k, v) in map {
                        out.serialize_entry(k, v)?;
                    }
                    out.end()
                }
                Value::Immutable(im) => im.to_plain().serialize(serializer),
            }
        }
    }

    impl From<serde_json::Value> for Value {
        fn from(value: serde_json::Value) -> Self {
            match value {
                serde_json::Value::Null => Value::Null,
                serde_json::Value::Bool(b) => Value::Bool(b),
                serde_json::Value::Number(n) => match n.as_i64() {
                    Some(i) => Value::Int(i),
                    None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                serde_json::Value::String(s) => Value::Str(s),
                serde_json::Value::Array(items) => {
                    Value::List(items.into_iter().map(Value::from).collect())
                }
                serde_json::Value::Object(map) => {
                    Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
                }
            }
        }
    }

    impl From<&Value> for serde_json::Value {
        fn from(value: &Value) -> Self {
            match value {
                Value::Null => serde_json::Value::Null,
                Value::Bool(b) => serde_json::Value::Bool(*b),
                Value::Int(i) => serde_json::Value::from(*i),
                Value::Float(f) => serde_json::Value::from(*f),
                Value::Str(s) => serde_json::Value::String(s.clone()),
                Value::List(list) => {
                    serde_json::Value::Array(list.iter().map(serde_json::Value::from).collect())
                }
                Value::Map(map) => serde_json::Value::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                        .collect(),
                ),
                Value::Immutable(im) => serde_json::Value::from(&im.to_plain()),
            }
        }
    }
}
