//! Persisted group objects
//!
//! Every group is persisted as a channel object (`G-<id>` for gateway
//! groups, `VG-<id>` for virtual groups) with one state object per
//! attribute below it (`G-<id>.brightness`, ...). States whose definition
//! carries a `path` mirror that property of the group definition.

use crate::store::{ObjectCommon, ObjectKind, ObjectNative, StoredObject};
use serde::{Deserialize, Serialize};
use tradfri_core::{IpsoObject, Value};
use tracing::warn;
use tradfri_devices::Group;

// ============================================================================
// IDS
// ============================================================================

/// Instance id of the device a state id belongs to.
///
/// Accepts fully qualified ids (`tradfri.0.L-65537.lightbulb.state`) as
/// well as bare ones (`L-65537.lightbulb.state`). Group ids yield `None`.
pub fn device_instance_id(state_id: &str) -> Option<i64> {
    state_id
        .split('.')
        .find_map(|segment| segment.strip_prefix("L-"))
        .and_then(|digits| digits.parse().ok())
}

/// Rounds to `digits` decimal places
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}

// ============================================================================
// AGGREGATED ATTRIBUTES
// ============================================================================

/// Group attributes derived from the member lights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupAttribute {
    State,
    Brightness,
    ColorTemperature,
    Color,
    Hue,
    Saturation,
}

impl GroupAttribute {
    pub const ALL: [GroupAttribute; 6] = [
        GroupAttribute::State,
        GroupAttribute::Brightness,
        GroupAttribute::ColorTemperature,
        GroupAttribute::Color,
        GroupAttribute::Hue,
        GroupAttribute::Saturation,
    ];

    /// Name of the state, both below the group and below `lightbulb` on devices
    pub fn state_name(&self) -> &'static str {
        match self {
            GroupAttribute::State => "state",
            GroupAttribute::Brightness => "brightness",
            GroupAttribute::ColorTemperature => "colorTemperature",
            GroupAttribute::Color => "color",
            GroupAttribute::Hue => "hue",
            GroupAttribute::Saturation => "saturation",
        }
    }

    /// Attribute addressed by a device state id ending in `lightbulb.<name>`
    pub fn from_device_state(state_id: &str) -> Option<Self> {
        let (_, name) = state_id.rsplit_once("lightbulb.")?;
        Self::ALL.into_iter().find(|attr| attr.state_name() == name)
    }
}

// ============================================================================
// STATE DEFINITIONS
// ============================================================================

/// State objects created below a group channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    ActiveScene,
    State,
    TransitionDuration,
    Brightness,
    ColorTemperature,
    Color,
    Hue,
    Saturation,
}

impl GroupState {
    pub const GATEWAY: [GroupState; 8] = [
        GroupState::ActiveScene,
        GroupState::State,
        GroupState::TransitionDuration,
        GroupState::Brightness,
        GroupState::ColorTemperature,
        GroupState::Color,
        GroupState::Hue,
        GroupState::Saturation,
    ];

    pub const VIRTUAL: [GroupState; 7] = [
        GroupState::State,
        GroupState::TransitionDuration,
        GroupState::Brightness,
        GroupState::ColorTemperature,
        GroupState::Color,
        GroupState::Hue,
        GroupState::Saturation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GroupState::ActiveScene => "activeScene",
            GroupState::State => "state",
            GroupState::TransitionDuration => "transitionDuration",
            GroupState::Brightness => "brightness",
            GroupState::ColorTemperature => "colorTemperature",
            GroupState::Color => "color",
            GroupState::Hue => "hue",
            GroupState::Saturation => "saturation",
        }
    }

    /// Property of the group definition the state mirrors
    pub fn path(&self) -> &'static str {
        match self {
            GroupState::ActiveScene => "sceneId",
            GroupState::State => "onOff",
            GroupState::TransitionDuration => "transitionTime",
            GroupState::Brightness => "dimmer",
            GroupState::ColorTemperature => "colorTemperature",
            GroupState::Color => "color",
            GroupState::Hue => "hue",
            GroupState::Saturation => "saturation",
        }
    }

    /// State object definition below `channel_id`; `kind` is used in the display name
    pub fn definition(&self, channel_id: &str, kind: &str) -> StoredObject {
        let (role, value_type, unit, min, max, description) = match self {
            GroupState::ActiveScene => ("value", "number", None, None, None, "active scene"),
            GroupState::State => ("switch", "boolean", None, None, None, "on/off"),
            GroupState::TransitionDuration => {
                ("level", "number", Some("s"), Some(0.0), Some(100_000.0), "transition duration")
            }
            GroupState::Brightness => ("level.dimmer", "number", None, Some(0.0), Some(254.0), "brightness"),
            GroupState::ColorTemperature => (
                "level.color.temperature",
                "number",
                Some("%"),
                Some(0.0),
                Some(100.0),
                "color temperature",
            ),
            GroupState::Color => ("level.color", "string", None, None, None, "color"),
            GroupState::Hue => ("level.color.hue", "number", Some("°"), Some(0.0), Some(360.0), "hue"),
            GroupState::Saturation => (
                "level.color.saturation",
                "number",
                Some("%"),
                Some(0.0),
                Some(100.0),
                "saturation",
            ),
        };

        StoredObject {
            id: format!("{}.{}", channel_id, self.name()),
            kind: ObjectKind::State,
            common: ObjectCommon {
                name: format!("{} of the {}", description, kind),
                role: role.to_string(),
                value_type: Some(value_type.to_string()),
                unit: unit.map(str::to_string),
                min,
                max,
                read: true,
                write: true,
            },
            native: ObjectNative {
                path: Some(self.path().to_string()),
                ..Default::default()
            },
        }
    }
}

// ============================================================================
// GROUP DEFINITIONS
// ============================================================================

/// A group that exists only on this side, not on the gateway
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualGroup {
    pub instance_id: i64,
    pub name: String,
    #[serde(default)]
    pub device_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_off: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimmer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_duration: Option<f64>,
}

impl VirtualGroup {
    pub fn new(instance_id: i64, name: impl Into<String>, device_ids: Vec<i64>) -> Self {
        Self {
            instance_id,
            name: name.into(),
            device_ids,
            ..Self::default()
        }
    }

    /// Value of the property named by a state path
    pub fn dig(&self, path: &str) -> Option<Value> {
        match path {
            "onOff" => self.on_off.map(Value::Bool),
            "dimmer" => self.dimmer.map(Value::Int),
            "colorTemperature" => self.color_temperature.map(Value::Float),
            "color" => self.color.clone().map(Value::String),
            "hue" => self.hue.map(Value::Float),
            "saturation" => self.saturation.map(Value::Float),
            "transitionTime" => self.transition_duration.map(Value::Float),
            _ => None,
        }
    }
}

/// Key of a group in the aggregator's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Gateway(i64),
    Virtual(i64),
}

impl GroupKey {
    pub fn object_id(&self) -> String {
        match self {
            GroupKey::Gateway(id) => format!("G-{}", id),
            GroupKey::Virtual(id) => format!("VG-{}", id),
        }
    }

    pub fn state_id(&self, state: &str) -> String {
        format!("{}.{}", self.object_id(), state)
    }

    /// Used in object names
    pub fn kind(&self) -> &'static str {
        match self {
            GroupKey::Gateway(_) => "group",
            GroupKey::Virtual(_) => "virtual group",
        }
    }
}

/// Value of a gateway group property named by a state path
pub fn dig_group(group: &Group, path: &str) -> Option<Value> {
    match group.get(path)?.to_wire() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Failed to read {} of group {}: {}", path, group.instance_id(), e);
            None
        }
    }
}

pub fn group_common(name: &str) -> ObjectCommon {
    ObjectCommon {
        name: name.to_string(),
        role: "group".to_string(),
        ..Default::default()
    }
}

pub fn group_native(key: GroupKey, device_ids: &[i64]) -> ObjectNative {
    let instance_id = match key {
        GroupKey::Gateway(id) | GroupKey::Virtual(id) => id,
    };
    ObjectNative {
        instance_id: Some(instance_id),
        device_ids: Some(device_ids.to_vec()),
        kind: Some(key.kind().to_string()),
        path: None,
    }
}

/// Channel object of a group
pub fn group_channel(key: GroupKey, name: &str, device_ids: &[i64]) -> StoredObject {
    StoredObject {
        id: key.object_id(),
        kind: ObjectKind::Channel,
        common: group_common(name),
        native: group_native(key, device_ids),
    }
}
