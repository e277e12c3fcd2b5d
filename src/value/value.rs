use crate::error::{StoreError, StoreResult};
use crate::value::{Path, Seg};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Object members, sorted by key.
pub type Map = BTreeMap<String, Value>;

static NULL: Value = Value::Null;

/// A node of an immutable state tree.
///
/// Containers live behind `Arc` and are only ever mutated through
/// copy-on-write (`Arc::make_mut`), so a `Value` that has been handed out
/// can never change underneath its holder. Cloning is O(1) and shares the
/// whole tree.
///
/// Equality (`==`) is structural. Use [`Value::ptr_eq`] for the cheap
/// identity check consumers rely on to skip work.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
}

impl Value {
    /// An empty object.
    pub fn object() -> Self {
        Value::Object(Arc::new(Map::new()))
    }

    /// An empty array.
    pub fn array() -> Self {
        Value::Array(Arc::new(Vec::new()))
    }

    /// Name of this value's kind, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Identity check.
    ///
    /// Containers are identical when they are the same allocation; leaves
    /// are identical when they hold the same value.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => same_number(a, b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable access to array elements, detaching this node from any
    /// snapshot that still shares it.
    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(Arc::make_mut(items)),
            _ => None,
        }
    }

    /// Mutable access to object members, detaching this node from any
    /// snapshot that still shares it.
    pub fn as_object_mut(&mut self) -> Option<&mut Map> {
        match self {
            Value::Object(map) => Some(Arc::make_mut(map)),
            _ => None,
        }
    }

    /// Member lookup on an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    fn child(&self, seg: &Seg) -> Option<&Value> {
        match (self, seg) {
            (Value::Object(map), Seg::Key(k)) => map.get(k),
            (Value::Array(items), Seg::Index(i)) => items.get(*i),
            _ => None,
        }
    }

    fn child_mut(&mut self, seg: &Seg) -> Option<&mut Value> {
        match (self, seg) {
            (Value::Object(map), Seg::Key(k)) => Arc::make_mut(map).get_mut(k),
            (Value::Array(items), Seg::Index(i)) => Arc::make_mut(items).get_mut(*i),
            _ => None,
        }
    }

    /// Look up the value at `path`.
    pub fn pointer(&self, path: &Path) -> Option<&Value> {
        path.iter().try_fold(self, |cur, seg| cur.child(seg))
    }

    /// Mutable lookup at `path`, copying only the nodes along the way.
    ///
    /// Returns `None` without touching anything when the path does not
    /// resolve.
    pub fn pointer_mut(&mut self, path: &Path) -> Option<&mut Value> {
        self.pointer(path)?;
        path.iter().try_fold(self, |cur, seg| cur.child_mut(seg))
    }

    /// Slot for `seg`, created if missing.
    ///
    /// `Null` turns into an object when addressed by key. An index equal to
    /// the array length appends a slot.
    fn entry(&mut self, seg: &Seg, here: &Path) -> StoreResult<&mut Value> {
        if self.is_null() && matches!(seg, Seg::Key(_)) {
            *self = Value::object();
        }
        match (self, seg) {
            (Value::Object(map), Seg::Key(k)) => {
                Ok(Arc::make_mut(map).entry(k.clone()).or_default())
            }
            (Value::Array(items), Seg::Index(i)) => {
                let items = Arc::make_mut(items);
                let len = items.len();
                if *i > len {
                    return Err(StoreError::index_out_of_bounds(here.clone(), *i, len));
                }
                if *i == len {
                    items.push(Value::Null);
                }
                Ok(&mut items[*i])
            }
            (other, Seg::Key(_)) => Err(StoreError::type_mismatch(
                here.clone(),
                "object",
                other.type_name(),
            )),
            (other, Seg::Index(_)) => Err(StoreError::type_mismatch(
                here.clone(),
                "array",
                other.type_name(),
            )),
        }
    }

    /// Write `value` at `path`, creating intermediate objects.
    pub(crate) fn set_path(&mut self, path: &Path, value: Value) -> StoreResult<()> {
        let mut cur = self;
        for (depth, seg) in path.iter().enumerate() {
            cur = cur.entry(seg, &path.prefix(depth))?;
        }
        *cur = value;
        Ok(())
    }

    /// Remove the value at `path`. Array elements after it shift left.
    pub(crate) fn remove_path(&mut self, path: &Path) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        self.pointer(path)?;
        let parent = parents
            .iter()
            .try_fold(self, |cur, seg| cur.child_mut(seg))?;
        match (parent, last) {
            (Value::Object(map), Seg::Key(k)) => Arc::make_mut(map).remove(k),
            (Value::Array(items), Seg::Index(i)) => Some(Arc::make_mut(items).remove(*i)),
            _ => None,
        }
    }

    /// Thaw into a plain `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => items.iter().map(Value::to_json).collect(),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Freeze any serializable value into a state tree.
    pub fn from_serializable<T: Serialize>(value: &T) -> StoreResult<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Read this tree back as a concrete type.
    pub fn deserialize_as<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

/// `1` and `1.0` are the same number; only integer-vs-integer comparisons
/// stay exact.
fn same_number(a: &serde_json::Number, b: &serde_json::Number) -> bool {
    if a.is_f64() || b.is_f64() {
        a.as_f64() == b.as_f64()
    } else {
        a == b
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl std::ops::Index<&str> for Value {
    type Output = Value;

    /// Missing members read as `Null`.
    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

impl std::ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        self.as_array()
            .and_then(|items| items.get(index))
            .unwrap_or(&NULL)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::Array(Arc::new(items.into_iter().map(Value::from).collect()))
            }
            serde_json::Value::Object(map) => Value::Object(Arc::new(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            )),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n.into())
                }
            }
        )*
    };
}

from_integer!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    /// Non-finite floats become `Null`.
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::Array(Arc::new(iter.into_iter().collect()))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => serializer.collect_seq(items.iter()),
            Value::Object(map) => serializer.collect_map(map.iter()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
