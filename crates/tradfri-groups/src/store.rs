//! Persisted state store
//!
//! The aggregator persists group objects and their states through the
//! [`StateStore`] trait. [`MemoryStore`] is the in-process implementation
//! used by the CLI and the tests; it can publish every write as a
//! [`StateChange`] so the aggregator sees its own writes come back the way a
//! real event source would deliver them.

use crate::error::StoreError;
use crate::event::StateChange;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;
use tracing::{debug, trace};
use tradfri_core::Value;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Node type of a persisted object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Channel,
    State,
}

/// Descriptive part of a persisted object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectCommon {
    pub name: String,
    pub role: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
}

/// Protocol-side part of a persisted object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectNative {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ids: Option<Vec<i64>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Property of the group definition this state mirrors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredObject {
    pub id: String,
    pub kind: ObjectKind,
    pub common: ObjectCommon,
    pub native: ObjectNative,
}

/// Partial update for [`StateStore::extend_object`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPatch {
    pub common: Option<ObjectCommon>,
    pub native: Option<ObjectNative>,
}

/// Persisted state store
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current value of a state, `None` if it has none
    async fn get_state(&self, id: &str) -> StoreResult<Option<Value>>;

    async fn set_state(&self, id: &str, value: Value, ack: bool) -> StoreResult<()>;

    async fn delete_state(&self, id: &str) -> StoreResult<()>;

    /// Create an object, and set its initial value if one is given.
    /// Existing objects are left untouched; returns false in that case.
    async fn create_if_absent(
        &self,
        object: StoredObject,
        initial: Option<Value>,
    ) -> StoreResult<bool>;

    /// Replace the parts of an existing object present in `patch`
    async fn extend_object(&self, id: &str, patch: ObjectPatch) -> StoreResult<()>;

    async fn get_object(&self, id: &str) -> StoreResult<Option<StoredObject>>;

    async fn list_objects(
        &self,
        predicate: &(dyn for<'o> Fn(&'o StoredObject) -> bool + Send + Sync),
    ) -> StoreResult<Vec<StoredObject>>;
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// One write performed on a [`MemoryStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    Set { id: String, value: Value, ack: bool },
    Delete { id: String },
}

impl StoreWrite {
    pub fn id(&self) -> &str {
        match self {
            StoreWrite::Set { id, .. } | StoreWrite::Delete { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct StoredState {
    value: Value,
    ack: bool,
}

/// In-process [`StateStore`]
#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<HashMap<String, StoredState>>,
    objects: RwLock<BTreeMap<String, StoredObject>>,
    writes: Mutex<Vec<StoreWrite>>,
    events: Option<mpsc::UnboundedSender<StateChange>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that publishes every `set_state` to the returned receiver
    pub fn with_events() -> (Self, mpsc::UnboundedReceiver<StateChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let store = Self {
            events: Some(tx),
            ..Self::default()
        };
        (store, rx)
    }

    pub fn state(&self, id: &str) -> Option<Value> {
        self.states.read().get(id).map(|s| s.value.clone())
    }

    /// Ack flag of the last write to a state
    pub fn is_acknowledged(&self, id: &str) -> Option<bool> {
        self.states.read().get(id).map(|s| s.ack)
    }

    /// All states, sorted by id
    pub fn states(&self) -> BTreeMap<String, Value> {
        self.states
            .read()
            .iter()
            .map(|(id, s)| (id.clone(), s.value.clone()))
            .collect()
    }

    pub fn object(&self, id: &str) -> Option<StoredObject> {
        self.objects.read().get(id).cloned()
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.read().values().cloned().collect()
    }

    /// Every write so far, oldest first
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().clone()
    }

    pub fn writes_for(&self, id: &str) -> Vec<StoreWrite> {
        self.writes
            .lock()
            .iter()
            .filter(|w| w.id() == id)
            .cloned()
            .collect()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().clear();
    }

    fn write_state(&self, id: &str, value: Value, ack: bool) {
        self.states.write().insert(
            id.to_string(),
            StoredState {
                value: value.clone(),
                ack,
            },
        );
        self.writes.lock().push(StoreWrite::Set {
            id: id.to_string(),
            value: value.clone(),
            ack,
        });

        if let Some(events) = &self.events {
            // a closed receiver just means nobody listens anymore
            let _ = events.send(StateChange {
                id: id.to_string(),
                value: Some(value),
                ack,
            });
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get_state(&self, id: &str) -> StoreResult<Option<Value>> {
        Ok(self.state(id))
    }

    async fn set_state(&self, id: &str, value: Value, ack: bool) -> StoreResult<()> {
        trace!("set {} = {:?} (ack={})", id, value, ack);
        self.write_state(id, value, ack);
        Ok(())
    }

    async fn delete_state(&self, id: &str) -> StoreResult<()> {
        trace!("delete {}", id);
        self.states.write().remove(id);
        self.writes.lock().push(StoreWrite::Delete { id: id.to_string() });
        Ok(())
    }

    async fn create_if_absent(
        &self,
        object: StoredObject,
        initial: Option<Value>,
    ) -> StoreResult<bool> {
        let id = object.id.clone();
        {
            let mut objects = self.objects.write();
            if objects.contains_key(&id) {
                debug!("object {} already exists", id);
                return Ok(false);
            }
            objects.insert(id.clone(), object);
        }

        if let Some(initial) = initial {
            self.write_state(&id, initial, true);
        }
        Ok(true)
    }

    async fn extend_object(&self, id: &str, patch: ObjectPatch) -> StoreResult<()> {
        let mut objects = self.objects.write();
        let object = objects
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let Some(common) = patch.common {
            object.common = common;
        }
        if let Some(native) = patch.native {
            object.native = native;
        }
        Ok(())
    }

    async fn get_object(&self, id: &str) -> StoreResult<Option<StoredObject>> {
        Ok(self.object(id))
    }

    async fn list_objects(
        &self,
        predicate: &(dyn for<'o> Fn(&'o StoredObject) -> bool + Send + Sync),
    ) -> StoreResult<Vec<StoredObject>> {
        Ok(self
            .objects
            .read()
            .values()
            .filter(|obj| predicate(obj))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn state_object(id: &str) -> StoredObject {
        StoredObject {
            id: id.to_string(),
            kind: ObjectKind::State,
            common: ObjectCommon {
                name: "test".to_string(),
                role: "value".to_string(),
                ..Default::default()
            },
            native: ObjectNative::default(),
        }
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get_state("a").await.unwrap(), None);

        store.set_state("a", Value::Int(1), true).await.unwrap();
        assert_eq!(store.get_state("a").await.unwrap(), Some(Value::Int(1)));
        assert_eq!(store.is_acknowledged("a"), Some(true));

        store.delete_state("a").await.unwrap();
        assert_eq!(store.state("a"), None);
        assert_eq!(
            store.writes(),
            vec![
                StoreWrite::Set {
                    id: "a".to_string(),
                    value: Value::Int(1),
                    ack: true
                },
                StoreWrite::Delete { id: "a".to_string() },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_if_absent_keeps_existing() {
        let store = MemoryStore::new();
        assert!(store
            .create_if_absent(state_object("x"), Some(Value::Bool(true)))
            .await
            .unwrap());
        assert!(!store
            .create_if_absent(state_object("x"), Some(Value::Bool(false)))
            .await
            .unwrap());
        assert_eq!(store.state("x"), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_extend_and_list() {
        let store = MemoryStore::new();
        store.create_if_absent(state_object("G-1.state"), None).await.unwrap();
        store.create_if_absent(state_object("G-2.state"), None).await.unwrap();

        let patch = ObjectPatch {
            native: Some(ObjectNative {
                path: Some("onOff".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        store.extend_object("G-1.state", patch).await.unwrap();
        assert_eq!(
            store.object("G-1.state").unwrap().native.path.as_deref(),
            Some("onOff")
        );

        let listed = store
            .list_objects(&|obj: &StoredObject| obj.id.starts_with("G-1"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let missing = store.extend_object("nope", ObjectPatch::default()).await;
        assert_eq!(missing, Err(StoreError::NotFound("nope".to_string())));
    }

    #[tokio::test]
    async fn test_list_through_shared_store() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        for id in ["VG-3.state", "VG-3.brightness", "VG-30.state"] {
            store.create_if_absent(state_object(id), None).await.unwrap();
        }

        let prefix = format!("{}.", "VG-3");
        let mut listed: Vec<String> = store
            .list_objects(&|obj: &StoredObject| obj.id.starts_with(&prefix))
            .await
            .unwrap()
            .into_iter()
            .map(|obj| obj.id)
            .collect();
        listed.sort();
        assert_eq!(listed, ["VG-3.brightness", "VG-3.state"]);
    }

    #[tokio::test]
    async fn test_events() {
        let (store, mut rx) = MemoryStore::with_events();
        store.set_state("L-1.lightbulb.state", Value::Bool(true), true).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change, StateChange::ack("L-1.lightbulb.state", true));
    }
}
