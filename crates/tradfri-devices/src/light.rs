//! Light entry of a lightbulb accessory (`3311`)

use crate::conversions;
use crate::device::DeviceHeader;
use std::any::Any;
use std::sync::OnceLock;
use tradfri_core::{
    codec, IpsoObject, PropertyDescriptor, PropertyRef, PropertyTable, PropertyValue, ValueKind,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub header: DeviceHeader,
    /// Hex string, `rrggbb`
    pub color: String,
    /// Degrees, 0-360
    pub hue: f64,
    /// Percent, 0-100
    pub saturation: f64,
    pub color_x: i64,
    pub color_y: i64,
    pub color_temperature: f64,
    /// Seconds
    pub transition_time: f64,
    pub cumulative_active_power: f64,
    /// 0..=254
    pub dimmer: i64,
    pub on_off: bool,
    pub on_time: i64,
    pub power_factor: f64,
    pub unit: String,
    model_name: Option<String>,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            header: DeviceHeader::default(),
            color: "f1e0b5".to_string(),
            hue: 0.0,
            saturation: 0.0,
            color_x: 0,
            color_y: 0,
            color_temperature: 0.0,
            transition_time: 0.5,
            cumulative_active_power: 0.0,
            dimmer: 0,
            on_off: false,
            on_time: 0,
            power_factor: 0.0,
            unit: String::new(),
            model_name: None,
        }
    }
}

impl Light {
    pub fn new() -> Self {
        Self::default()
    }

    /// A light belonging to an accessory with the given model number.
    /// Empty model numbers are treated as unknown.
    pub fn with_model(model_name: impl Into<String>) -> Self {
        let mut light = Self::default();
        light.set_model_name(model_name);
        light
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model_name.as_deref()
    }

    pub fn set_model_name(&mut self, model_name: impl Into<String>) {
        let model_name = model_name.into();
        self.model_name = if model_name.is_empty() {
            None
        } else {
            Some(model_name)
        };
    }

    /// Deep copy that keeps the model name, which never travels on the wire
    pub fn duplicate(&self) -> tradfri_core::Result<Self> {
        let mut copy = codec::duplicate(self)?;
        copy.model_name = self.model_name.clone();
        Ok(copy)
    }

    pub(crate) fn table() -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            DeviceHeader::register(PropertyTable::builder("Light"))
                .property(PropertyDescriptor::new("color", "5706", ValueKind::String))
                .property(
                    PropertyDescriptor::new("hue", "5707", ValueKind::Float)
                        .serialize_with(conversions::serialize_hue)
                        .deserialize_with(conversions::deserialize_hue),
                )
                .property(
                    PropertyDescriptor::new("saturation", "5708", ValueKind::Float)
                        .serialize_with(conversions::serialize_saturation)
                        .deserialize_with(conversions::deserialize_saturation),
                )
                .property(PropertyDescriptor::new("colorX", "5709", ValueKind::Int))
                .property(PropertyDescriptor::new("colorY", "5710", ValueKind::Int))
                .property(PropertyDescriptor::new("colorTemperature", "5711", ValueKind::Float))
                .property(
                    PropertyDescriptor::new("transitionTime", "5712", ValueKind::Float)
                        .required()
                        .serialize_with(conversions::serialize_transition_time)
                        .deserialize_with(conversions::deserialize_transition_time),
                )
                .property(PropertyDescriptor::new("cumulativeActivePower", "5805", ValueKind::Float))
                .property(PropertyDescriptor::new("dimmer", "5851", ValueKind::Int))
                .property(PropertyDescriptor::new("onOff", "5850", ValueKind::Bool))
                .property(PropertyDescriptor::new("onTime", "5852", ValueKind::Int))
                .property(PropertyDescriptor::new("powerFactor", "5820", ValueKind::Float))
                .property(PropertyDescriptor::new("unit", "5701", ValueKind::String))
                .build()
        })
    }
}

impl IpsoObject for Light {
    fn metadata(&self) -> &'static PropertyTable {
        Self::table()
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "color" => Some(PropertyRef::borrowed(&self.color)),
            "hue" => Some(PropertyRef::Float(self.hue)),
            "saturation" => Some(PropertyRef::Float(self.saturation)),
            "colorX" => Some(PropertyRef::Int(self.color_x)),
            "colorY" => Some(PropertyRef::Int(self.color_y)),
            "colorTemperature" => Some(PropertyRef::Float(self.color_temperature)),
            "transitionTime" => Some(PropertyRef::Float(self.transition_time)),
            "cumulativeActivePower" => Some(PropertyRef::Float(self.cumulative_active_power)),
            "dimmer" => Some(PropertyRef::Int(self.dimmer)),
            "onOff" => Some(PropertyRef::Bool(self.on_off)),
            "onTime" => Some(PropertyRef::Int(self.on_time)),
            "powerFactor" => Some(PropertyRef::Float(self.power_factor)),
            "unit" => Some(PropertyRef::borrowed(&self.unit)),
            other => self.header.get(other),
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "color" => value.into_string().map(|v| self.color = v).is_some(),
            "hue" => value.as_f64().map(|v| self.hue = v).is_some(),
            "saturation" => value.as_f64().map(|v| self.saturation = v).is_some(),
            "colorX" => value.as_i64().map(|v| self.color_x = v).is_some(),
            "colorY" => value.as_i64().map(|v| self.color_y = v).is_some(),
            "colorTemperature" => value.as_f64().map(|v| self.color_temperature = v).is_some(),
            "transitionTime" => value.as_f64().map(|v| self.transition_time = v).is_some(),
            "cumulativeActivePower" => value
                .as_f64()
                .map(|v| self.cumulative_active_power = v)
                .is_some(),
            "dimmer" => value.as_i64().map(|v| self.dimmer = v).is_some(),
            "onOff" => value.as_bool().map(|v| self.on_off = v).is_some(),
            "onTime" => value.as_i64().map(|v| self.on_time = v).is_some(),
            "powerFactor" => value.as_f64().map(|v| self.power_factor = v).is_some(),
            "unit" => value.into_string().map(|v| self.unit = v).is_some(),
            other => self.header.set(other, value).unwrap_or(false),
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        let mut fresh = Light::default();
        fresh.model_name = self.model_name.clone();
        Box::new(fresh)
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
