//! Common header shared by every addressable gateway object

use tradfri_core::{PropertyDescriptor, PropertyRef, PropertyTableBuilder, PropertyValue, ValueKind};

/// Name, creation time and instance id of a scene, group or accessory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceHeader {
    pub name: String,
    pub created_at: i64,
    pub instance_id: i64,
}

impl DeviceHeader {
    pub fn new(instance_id: i64, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: 0,
            instance_id,
        }
    }

    /// Add the header properties to a property table
    pub fn register(builder: PropertyTableBuilder) -> PropertyTableBuilder {
        builder
            .property(PropertyDescriptor::new("name", "9001", ValueKind::String))
            .property(PropertyDescriptor::new("createdAt", "9002", ValueKind::Int))
            .property(PropertyDescriptor::new("instanceId", "9003", ValueKind::Int))
    }

    pub fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "name" => Some(PropertyRef::borrowed(&self.name)),
            "createdAt" => Some(PropertyRef::Int(self.created_at)),
            "instanceId" => Some(PropertyRef::Int(self.instance_id)),
            _ => None,
        }
    }

    /// `None` if `name` is not a header property
    pub fn set(&mut self, name: &str, value: PropertyValue) -> Option<bool> {
        let applied = match name {
            "name" => value.into_string().map(|v| self.name = v).is_some(),
            "createdAt" => value.as_i64().map(|v| self.created_at = v).is_some(),
            "instanceId" => value.as_i64().map(|v| self.instance_id = v).is_some(),
            _ => return None,
        };
        Some(applied)
    }
}
