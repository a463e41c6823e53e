//! State change events

use serde::{Deserialize, Serialize};
use tradfri_core::Value;

/// A state was written to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    /// Full state id, e.g. `L-65537.lightbulb.brightness`
    pub id: String,
    /// New value; `None` if the state was deleted
    pub value: Option<Value>,
    /// Set for values confirmed by the device (or written by the aggregator),
    /// clear for commands that still have to reach a device
    pub ack: bool,
}

impl StateChange {
    pub fn ack(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            value: Some(value.into()),
            ack: true,
        }
    }

    pub fn command(id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            value: Some(value.into()),
            ack: false,
        }
    }
}
