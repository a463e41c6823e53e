//! Gateway groups
//!
//! Membership travels as `{"9018": {"15002": {"9003": [ids]}}}`, modelled as
//! two small nested objects so the codec's nested-object rules apply to it
//! unchanged.

use crate::conversions;
use crate::device::DeviceHeader;
use std::any::Any;
use std::sync::OnceLock;
use tradfri_core::{
    IpsoObject, IpsoObjectExt, PropertyDescriptor, PropertyRef, PropertyTable, PropertyValue,
    Value, ValueKind,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub header: DeviceHeader,
    /// `None` when the members disagree
    pub on_off: Option<bool>,
    /// `None` when the members disagree
    pub dimmer: Option<i64>,
    pub scene_id: i64,
    pub transition_time: f64,
    pub device_links: Option<AccessoryLink>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            header: DeviceHeader::default(),
            on_off: Some(false),
            dimmer: Some(0),
            scene_id: 0,
            transition_time: 0.5,
            device_links: None,
        }
    }
}

impl Group {
    pub fn new(instance_id: i64, name: impl Into<String>) -> Self {
        Self {
            header: DeviceHeader::new(instance_id, name),
            ..Self::default()
        }
    }

    pub fn instance_id(&self) -> i64 {
        self.header.instance_id
    }

    /// Instance ids of the member accessories
    pub fn device_ids(&self) -> &[i64] {
        self.device_links
            .as_ref()
            .and_then(|link| link.devices.as_ref())
            .map(|devices| devices.instance_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_device_ids(&mut self, ids: Vec<i64>) {
        self.device_links = Some(AccessoryLink {
            devices: Some(LinkedDevices { instance_ids: ids }),
        });
    }

    pub fn with_device_ids(mut self, ids: Vec<i64>) -> Self {
        self.set_device_ids(ids);
        self
    }

    fn deserialize_links(raw: &Value) -> Option<PropertyValue> {
        raw.as_object()
            .map(|obj| PropertyValue::object(AccessoryLink::default().parsed(obj)))
    }
}

impl IpsoObject for Group {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            DeviceHeader::register(PropertyTable::builder("Group"))
                .property(PropertyDescriptor::new("onOff", "5850", ValueKind::Bool))
                .property(PropertyDescriptor::new("dimmer", "5851", ValueKind::Int))
                .property(PropertyDescriptor::new("sceneId", "9039", ValueKind::Int))
                .property(
                    PropertyDescriptor::new("transitionTime", "5712", ValueKind::Float)
                        .required()
                        .serialize_with(conversions::serialize_transition_time)
                        .deserialize_with(conversions::deserialize_transition_time),
                )
                .property(
                    PropertyDescriptor::new("deviceIds", "9018", ValueKind::Object)
                        .deserialize_with(Group::deserialize_links),
                )
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "onOff" => self.on_off.map(PropertyRef::Bool),
            "dimmer" => self.dimmer.map(PropertyRef::Int),
            "sceneId" => Some(PropertyRef::Int(self.scene_id)),
            "transitionTime" => Some(PropertyRef::Float(self.transition_time)),
            "deviceIds" => self
                .device_links
                .as_ref()
                .map(|link| PropertyRef::Object(link)),
            other => self.header.get(other),
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "onOff" => value.as_bool().map(|v| self.on_off = Some(v)).is_some(),
            "dimmer" => value.as_i64().map(|v| self.dimmer = Some(v)).is_some(),
            "sceneId" => value.as_i64().map(|v| self.scene_id = v).is_some(),
            "transitionTime" => value.as_f64().map(|v| self.transition_time = v).is_some(),
            "deviceIds" => value
                .into_object::<AccessoryLink>()
                .map(|v| self.device_links = Some(v))
                .is_some(),
            other => self.header.set(other, value).unwrap_or(false),
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(Group::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

// ============================================================================
// MEMBERSHIP
// ============================================================================

/// `9018` wrapper around the linked accessories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessoryLink {
    pub devices: Option<LinkedDevices>,
}

/// `15002`: the member instance ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedDevices {
    pub instance_ids: Vec<i64>,
}

fn deserialize_linked_devices(raw: &Value) -> Option<PropertyValue> {
    raw.as_object()
        .map(|obj| PropertyValue::object(LinkedDevices::default().parsed(obj)))
}

impl IpsoObject for AccessoryLink {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder("AccessoryLink")
                .property(
                    PropertyDescriptor::new("devices", "15002", ValueKind::Object)
                        .deserialize_with(deserialize_linked_devices),
                )
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "devices" => self.devices.as_ref().map(|d| PropertyRef::Object(d)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "devices" => value
                .into_object::<LinkedDevices>()
                .map(|v| self.devices = Some(v))
                .is_some(),
            _ => false,
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(AccessoryLink::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl IpsoObject for LinkedDevices {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder("LinkedDevices")
                .property(PropertyDescriptor::new(
                    "instanceIds",
                    "9003",
                    ValueKind::array_of(ValueKind::Int),
                ))
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "instanceIds" => Some(PropertyRef::ints(&self.instance_ids)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "instanceIds" => value
                .into_array()
                .and_then(|items| items.iter().map(PropertyValue::as_i64).collect::<Option<Vec<_>>>())
                .map(|v| self.instance_ids = v)
                .is_some(),
            _ => false,
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(LinkedDevices::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
