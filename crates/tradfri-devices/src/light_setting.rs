//! Per-light entry stored in a scene (`15013`)

use std::any::Any;
use std::sync::OnceLock;
use tradfri_core::{
    IpsoObject, IpsoObjectExt, PropertyDescriptor, PropertyRef, PropertyTable, PropertyValue,
    Value, ValueKind,
};

#[derive(Debug, Clone, PartialEq)]
pub struct LightSetting {
    pub instance_id: i64,
    pub color: String,
    pub color_x: i64,
    pub color_y: i64,
    pub color_temperature: f64,
    pub dimmer: i64,
    pub on_off: bool,
}

impl Default for LightSetting {
    fn default() -> Self {
        Self {
            instance_id: 0,
            color: "f1e0b5".to_string(),
            color_x: 0,
            color_y: 0,
            color_temperature: 0.0,
            dimmer: 0,
            on_off: false,
        }
    }
}

impl LightSetting {
    pub fn new(instance_id: i64) -> Self {
        Self {
            instance_id,
            ..Self::default()
        }
    }

    /// Nested deserializer used by scene light lists
    pub fn deserialize(raw: &Value) -> Option<PropertyValue> {
        raw.as_object()
            .map(|obj| PropertyValue::object(LightSetting::default().parsed(obj)))
    }
}

impl IpsoObject for LightSetting {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder("LightSetting")
                .property(PropertyDescriptor::new("instanceId", "9003", ValueKind::Int).required())
                .property(PropertyDescriptor::new("color", "5706", ValueKind::String))
                .property(PropertyDescriptor::new("colorX", "5709", ValueKind::Int))
                .property(PropertyDescriptor::new("colorY", "5710", ValueKind::Int))
                .property(PropertyDescriptor::new("colorTemperature", "5711", ValueKind::Float))
                .property(PropertyDescriptor::new("dimmer", "5851", ValueKind::Int))
                .property(PropertyDescriptor::new("onOff", "5850", ValueKind::Bool))
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "instanceId" => Some(PropertyRef::Int(self.instance_id)),
            "color" => Some(PropertyRef::borrowed(&self.color)),
            "colorX" => Some(PropertyRef::Int(self.color_x)),
            "colorY" => Some(PropertyRef::Int(self.color_y)),
            "colorTemperature" => Some(PropertyRef::Float(self.color_temperature)),
            "dimmer" => Some(PropertyRef::Int(self.dimmer)),
            "onOff" => Some(PropertyRef::Bool(self.on_off)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "instanceId" => value.as_i64().map(|v| self.instance_id = v).is_some(),
            "color" => value.into_string().map(|v| self.color = v).is_some(),
            "colorX" => value.as_i64().map(|v| self.color_x = v).is_some(),
            "colorY" => value.as_i64().map(|v| self.color_y = v).is_some(),
            "colorTemperature" => value.as_f64().map(|v| self.color_temperature = v).is_some(),
            "dimmer" => value.as_i64().map(|v| self.dimmer = v).is_some(),
            "onOff" => value.as_bool().map(|v| self.on_off = v).is_some(),
            _ => false,
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(LightSetting::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
