use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::CmisError;

/// Value stored under a session attribute key. The closed set keeps the
/// store snapshot-capable for everything except `Opaque` handles.
#[derive(Clone)]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Json(Value),
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl AttributeValue {
    /// Whether the value can appear in a durable snapshot of the session.
    pub fn is_snapshot_capable(&self) -> bool {
        !matches!(self, AttributeValue::Opaque(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Lenient integer view: integers pass through, strings are parsed,
    /// anything else is `None`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Option<Value> {
        match self {
            AttributeValue::String(s) => Some(Value::String(s.clone())),
            AttributeValue::Integer(i) => Some(Value::from(*i)),
            AttributeValue::Boolean(b) => Some(Value::Bool(*b)),
            AttributeValue::Json(v) => Some(v.clone()),
            AttributeValue::Opaque(_) => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (AttributeValue::String(a), AttributeValue::String(b)) => a == b,
            (AttributeValue::Integer(a), AttributeValue::Integer(b)) => a == b,
            (AttributeValue::Boolean(a), AttributeValue::Boolean(b)) => a == b,
            (AttributeValue::Json(a), AttributeValue::Json(b)) => a == b,
            (AttributeValue::Opaque(a), AttributeValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "String({:?})", s),
            AttributeValue::Integer(i) => write!(f, "Integer({})", i),
            AttributeValue::Boolean(b) => write!(f, "Boolean({})", b),
            AttributeValue::Json(v) => write!(f, "Json({})", v),
            AttributeValue::Opaque(_) => write!(f, "Opaque"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<Value> for AttributeValue {
    fn from(value: Value) -> Self {
        AttributeValue::Json(value)
    }
}

#[derive(Clone, Debug)]
struct AttributeEntry {
    value: AttributeValue,
    transient: bool,
}

/// Per-connection attribute store. Any number of concurrent readers, one
/// exclusive writer; lock scope is exactly the map access. Multi-step
/// read-modify-write sequences go through [`Session::write`].
#[derive(Default)]
pub struct Session {
    data: RwLock<HashMap<String, AttributeEntry>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Transient wrapping is transparent on read.
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.data.read().get(key).map(|e| e.value.clone())
    }

    pub fn get_or(&self, key: &str, default: AttributeValue) -> AttributeValue {
        self.get(key).unwrap_or(default)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(str::to_string))
    }

    /// Lenient integer getter: a stored string is coerced if it parses;
    /// coercion failure silently yields the default. Deliberate fail-soft.
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(|v| v.as_int()).unwrap_or(default)
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.data.write().insert(
            key.into(),
            AttributeEntry {
                value: value.into(),
                transient: false,
            },
        );
    }

    /// Stores a value, optionally marked transient. A transient value is
    /// excluded from durable snapshots but reads back like a plain one.
    pub fn put_with(
        &self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
        transient: bool,
    ) -> Result<(), CmisError> {
        let value = value.into();
        if transient && !value.is_snapshot_capable() {
            return Err(CmisError::invalid_argument(
                "Value must be snapshot-capable!",
            ));
        }
        self.data.write().insert(
            key.into(),
            AttributeEntry { value, transient },
        );
        Ok(())
    }

    pub fn remove(&self, key: &str) {
        self.data.write().remove(key);
    }

    /// Scoped shared acquisition; the guard releases on drop.
    pub fn read(&self) -> SessionReadGuard<'_> {
        SessionReadGuard {
            data: self.data.read(),
        }
    }

    /// Scoped exclusive acquisition for multi-step read-modify-write
    /// sequences; the guard releases on drop, error paths included.
    pub fn write(&self) -> SessionWriteGuard<'_> {
        SessionWriteGuard {
            data: self.data.write(),
        }
    }

    /// Durable view of the session: all non-transient, snapshot-capable
    /// entries as JSON.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data
            .read()
            .iter()
            .filter(|(_, entry)| !entry.transient)
            .filter_map(|(key, entry)| entry.value.to_json().map(|v| (key.clone(), v)))
            .collect()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("keys", &self.keys())
            .finish()
    }
}

pub struct SessionReadGuard<'a> {
    data: RwLockReadGuard<'a, HashMap<String, AttributeEntry>>,
}

impl SessionReadGuard<'_> {
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.data.get(key).map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }
}

pub struct SessionWriteGuard<'a> {
    data: RwLockWriteGuard<'a, HashMap<String, AttributeEntry>>,
}

impl SessionWriteGuard<'_> {
    pub fn get(&self, key: &str) -> Option<AttributeValue> {
        self.data.get(key).map(|e| e.value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.data.keys().cloned().collect()
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.data.insert(
            key.into(),
            AttributeEntry {
                value: value.into(),
                transient: false,
            },
        );
    }

    pub fn put_with(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
        transient: bool,
    ) -> Result<(), CmisError> {
        let value = value.into();
        if transient && !value.is_snapshot_capable() {
            return Err(CmisError::invalid_argument(
                "Value must be snapshot-capable!",
            ));
        }
        self.data.insert(
            key.into(),
            AttributeEntry { value, transient },
        );
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }
}
