//! Observable records: keyed reactive state over JSON-like values.
//!
//! An [`ObservableRecord`] tracks each key separately, so an effect that reads
//! `title` is not rerun when `count` changes. Object values are wrapped into
//! child records the first time they are read, giving nested keys their own
//! edges too. Reading the key set (`keys`, `len`) subscribes to structural
//! changes: a key being added or removed.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::runtime::{Runtime, Source, WeakRuntime};

enum Slot {
    Plain(Value),
    Nested(ObservableRecord),
}

impl Slot {
    fn equals(&self, value: &Value) -> bool {
        match self {
            Slot::Plain(current) => current == value,
            Slot::Nested(record) => record.snapshot() == *value,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Slot::Plain(value) => value.clone(),
            Slot::Nested(record) => record.snapshot(),
        }
    }
}

struct RecordInner {
    runtime: WeakRuntime,
    fields: RefCell<BTreeMap<String, Slot>>,
    /// Per-key sources, created on the first tracked read of each key.
    sources: RefCell<HashMap<String, Source>>,
    shape: Source,
}

/// A value read from an [`ObservableRecord`].
#[derive(Debug, Clone)]
pub enum Field {
    Value(Value),
    Record(ObservableRecord),
}

impl Field {
    /// Plain value, or an untracked snapshot of a nested record.
    pub fn into_value(self) -> Value {
        match self {
            Field::Value(value) => value,
            Field::Record(record) => record.snapshot(),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            Field::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&ObservableRecord> {
        match self {
            Field::Record(record) => Some(record),
            Field::Value(_) => None,
        }
    }
}

/// Keyed reactive container. Clones share the same record.
#[derive(Clone)]
pub struct ObservableRecord {
    inner: Rc<RecordInner>,
}

impl fmt::Debug for ObservableRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObservableRecord")
            .field(&self.snapshot())
            .finish()
    }
}

impl Runtime {
    /// Wrap `record` so that reads and writes of its keys are tracked.
    pub fn observe(&self, record: Map<String, Value>) -> ObservableRecord {
        ObservableRecord::with_runtime(&self.downgrade(), record)
    }

    /// Like [`Runtime::observe`] for an arbitrary JSON value. Returns `None`
    /// unless `value` is an object.
    pub fn observe_value(&self, value: Value) -> Option<ObservableRecord> {
        match value {
            Value::Object(map) => Some(self.observe(map)),
            _ => None,
        }
    }
}

impl ObservableRecord {
    fn with_runtime(runtime: &WeakRuntime, record: Map<String, Value>) -> Self {
        let fields = record
            .into_iter()
            .map(|(key, value)| (key, Slot::Plain(value)))
            .collect();
        Self {
            inner: Rc::new(RecordInner {
                runtime: runtime.clone(),
                fields: RefCell::new(fields),
                sources: RefCell::new(HashMap::new()),
                shape: Source::new(runtime),
            }),
        }
    }

    /// Read `key`, subscribing the running effect to it.
    ///
    /// Object values come back as nested records; the wrapper is created once
    /// and reused by later reads.
    pub fn get(&self, key: &str) -> Option<Field> {
        self.track_key(key);
        let mut fields = self.inner.fields.borrow_mut();
        let slot = fields.get_mut(key)?;
        let unwrapped = match &mut *slot {
            Slot::Plain(Value::Object(map)) => Some(std::mem::take(map)),
            _ => None,
        };
        if let Some(map) = unwrapped {
            *slot = Slot::Nested(Self::with_runtime(&self.inner.runtime, map));
        }
        Some(match &*slot {
            Slot::Plain(value) => Field::Value(value.clone()),
            Slot::Nested(record) => Field::Record(record.clone()),
        })
    }

    /// Read `key` as a plain value (nested records are snapshotted).
    pub fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key).map(Field::into_value)
    }

    /// Read a nested record under `key`.
    pub fn record(&self, key: &str) -> Option<ObservableRecord> {
        match self.get(key)? {
            Field::Record(record) => Some(record),
            Field::Value(_) => None,
        }
    }

    /// Write `key`. Returns `false` when the value is unchanged, in which case
    /// no effect is notified.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        let added = {
            let mut fields = self.inner.fields.borrow_mut();
            let added = match fields.get(key) {
                Some(slot) if slot.equals(&value) => return false,
                Some(_) => false,
                None => true,
            };
            fields.insert(key.to_owned(), Slot::Plain(value));
            added
        };
        self.trigger_key(key);
        if added {
            self.trigger_shape();
        }
        true
    }

    /// Remove `key`, returning its last value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.inner.fields.borrow_mut().remove(key)?;
        self.trigger_key(key);
        self.trigger_shape();
        Some(removed.to_value())
    }

    /// Whether `key` is present. Subscribes to `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.track_key(key);
        self.inner.fields.borrow().contains_key(key)
    }

    /// Sorted key list. Subscribes to structural changes.
    pub fn keys(&self) -> Vec<String> {
        self.inner.shape.track();
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Number of keys. Subscribes to structural changes.
    pub fn len(&self) -> usize {
        self.inner.shape.track();
        self.inner.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deep, untracked copy of the current contents.
    pub fn snapshot(&self) -> Value {
        let fields = self.inner.fields.borrow();
        Value::Object(
            fields
                .iter()
                .map(|(key, slot)| (key.clone(), slot.to_value()))
                .collect(),
        )
    }

    fn track_key(&self, key: &str) {
        let tracking = self
            .inner
            .runtime
            .upgrade()
            .is_some_and(|rt| rt.is_tracking());
        if !tracking {
            return;
        }
        let mut sources = self.inner.sources.borrow_mut();
        sources
            .entry(key.to_owned())
            .or_insert_with(|| Source::new(&self.inner.runtime))
            .track();
    }

    fn trigger_key(&self, key: &str) {
        // Copy the id out first: the runtime borrows sources while queueing.
        let id = self.inner.sources.borrow().get(key).map(Source::id);
        if let (Some(id), Some(rt)) = (id, self.inner.runtime.upgrade()) {
            rt.trigger(id);
        }
    }

    fn trigger_shape(&self) {
        self.inner.shape.trigger();
    }
}
