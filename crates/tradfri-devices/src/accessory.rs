//! Accessories (bulbs, remotes, sensors, ...) and their device info

use crate::device::DeviceHeader;
use crate::light::Light;
use std::any::Any;
use std::sync::OnceLock;
use tradfri_core::{
    IpsoObject, IpsoObjectExt, PropertyDescriptor, PropertyRef, PropertyTable, PropertyValue,
    Value, ValueKind, WireObject,
};

/// Accessory type reported under `5750`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessoryType {
    Remote,
    SlaveRemote,
    Lightbulb,
    Plug,
    MotionSensor,
    SignalRepeater,
    Blind,
    Unknown(i64),
}

impl From<i64> for AccessoryType {
    fn from(code: i64) -> Self {
        match code {
            0 => AccessoryType::Remote,
            1 => AccessoryType::SlaveRemote,
            2 => AccessoryType::Lightbulb,
            3 => AccessoryType::Plug,
            4 => AccessoryType::MotionSensor,
            6 => AccessoryType::SignalRepeater,
            7 => AccessoryType::Blind,
            other => AccessoryType::Unknown(other),
        }
    }
}

impl From<AccessoryType> for i64 {
    fn from(kind: AccessoryType) -> Self {
        match kind {
            AccessoryType::Remote => 0,
            AccessoryType::SlaveRemote => 1,
            AccessoryType::Lightbulb => 2,
            AccessoryType::Plug => 3,
            AccessoryType::MotionSensor => 4,
            AccessoryType::SignalRepeater => 6,
            AccessoryType::Blind => 7,
            AccessoryType::Unknown(code) => code,
        }
    }
}

// ============================================================================
// DEVICE INFO
// ============================================================================

/// Manufacturer data under key `3`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model_number: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub power_source: i64,
    pub battery: i64,
}

fn deserialize_device_info(raw: &Value) -> Option<PropertyValue> {
    raw.as_object()
        .map(|obj| PropertyValue::object(DeviceInfo::default().parsed(obj)))
}

impl IpsoObject for DeviceInfo {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            PropertyTable::builder("DeviceInfo")
                .property(PropertyDescriptor::new("manufacturer", "0", ValueKind::String))
                .property(PropertyDescriptor::new("modelNumber", "1", ValueKind::String))
                .property(PropertyDescriptor::new("serialNumber", "2", ValueKind::String))
                .property(PropertyDescriptor::new("firmwareVersion", "3", ValueKind::String))
                .property(PropertyDescriptor::new("power", "6", ValueKind::Int))
                .property(PropertyDescriptor::new("battery", "9", ValueKind::Int))
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "manufacturer" => Some(PropertyRef::borrowed(&self.manufacturer)),
            "modelNumber" => Some(PropertyRef::borrowed(&self.model_number)),
            "serialNumber" => Some(PropertyRef::borrowed(&self.serial_number)),
            "firmwareVersion" => Some(PropertyRef::borrowed(&self.firmware_version)),
            "power" => Some(PropertyRef::Int(self.power_source)),
            "battery" => Some(PropertyRef::Int(self.battery)),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "manufacturer" => value.into_string().map(|v| self.manufacturer = v).is_some(),
            "modelNumber" => value.into_string().map(|v| self.model_number = v).is_some(),
            "serialNumber" => value.into_string().map(|v| self.serial_number = v).is_some(),
            "firmwareVersion" => value.into_string().map(|v| self.firmware_version = v).is_some(),
            "power" => value.as_i64().map(|v| self.power_source = v).is_some(),
            "battery" => value.as_i64().map(|v| self.battery = v).is_some(),
            _ => false,
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(DeviceInfo::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

// ============================================================================
// ACCESSORY
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Accessory {
    pub header: DeviceHeader,
    pub accessory_type: AccessoryType,
    pub device_info: Option<DeviceInfo>,
    pub alive: bool,
    pub last_seen: i64,
    pub light_list: Option<Vec<Light>>,
}

impl Default for Accessory {
    fn default() -> Self {
        Self {
            header: DeviceHeader::default(),
            accessory_type: AccessoryType::Remote,
            device_info: None,
            alive: false,
            last_seen: 0,
            light_list: None,
        }
    }
}

fn deserialize_light(raw: &Value) -> Option<PropertyValue> {
    raw.as_object()
        .map(|obj| PropertyValue::object(Light::default().parsed(obj)))
}

impl Accessory {
    /// Parse an accessory and hand its model number to every light, so the
    /// lights know which color capabilities they have
    pub fn from_wire(obj: &WireObject) -> Self {
        let mut accessory = Accessory::default().parsed(obj);
        accessory.propagate_model_name();
        accessory
    }

    pub fn instance_id(&self) -> i64 {
        self.header.instance_id
    }

    pub fn is_lightbulb(&self) -> bool {
        self.accessory_type == AccessoryType::Lightbulb
    }

    pub fn model_number(&self) -> Option<&str> {
        self.device_info
            .as_ref()
            .map(|info| info.model_number.as_str())
            .filter(|model| !model.is_empty())
    }

    /// The light of a single-light bulb
    pub fn first_light(&self) -> Option<&Light> {
        self.light_list.as_deref()?.first()
    }

    fn propagate_model_name(&mut self) {
        let Some(model) = self.model_number().map(str::to_string) else {
            return;
        };
        for light in self.light_list.iter_mut().flatten() {
            light.set_model_name(model.clone());
        }
    }
}

impl IpsoObject for Accessory {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            DeviceHeader::register(PropertyTable::builder("Accessory"))
                .property(PropertyDescriptor::new("type", "5750", ValueKind::Int))
                .property(
                    PropertyDescriptor::new("deviceInfo", "3", ValueKind::Object)
                        .deserialize_with(deserialize_device_info),
                )
                .property(PropertyDescriptor::new("alive", "9019", ValueKind::Bool))
                .property(PropertyDescriptor::new("lastSeen", "9020", ValueKind::Int))
                .property(
                    PropertyDescriptor::new("lightList", "3311", ValueKind::array_of(ValueKind::Object))
                        .deserialize_with(deserialize_light),
                )
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "type" => Some(PropertyRef::Int(self.accessory_type.into())),
            "deviceInfo" => self.device_info.as_ref().map(|info| PropertyRef::Object(info)),
            "alive" => Some(PropertyRef::Bool(self.alive)),
            "lastSeen" => Some(PropertyRef::Int(self.last_seen)),
            "lightList" => self.light_list.as_deref().map(PropertyRef::objects),
            other => self.header.get(other),
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "type" => value
                .as_i64()
                .map(|v| self.accessory_type = AccessoryType::from(v))
                .is_some(),
            "deviceInfo" => value
                .into_object::<DeviceInfo>()
                .map(|v| self.device_info = Some(v))
                .is_some(),
            "alive" => value.as_bool().map(|v| self.alive = v).is_some(),
            "lastSeen" => value.as_i64().map(|v| self.last_seen = v).is_some(),
            "lightList" => value
                .into_objects::<Light>()
                .map(|v| self.light_list = Some(v))
                .is_some(),
            other => self.header.set(other, value).unwrap_or(false),
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(Accessory::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradfri_core::codec;

    const BULB: &[u8] = br#"{
        "9001": "Desk lamp", "9003": 65537, "9002": 1500000000, "9019": 1, "9020": 1500000100,
        "5750": 2,
        "3": {"0": "IKEA of Sweden", "1": "TRADFRI bulb E27 WS opal 980lm", "2": "", "3": "1.2.217", "6": 1},
        "3311": [{"5850": 1, "5851": 254, "5709": 30140, "5710": 26909, "9003": 0}]
    }"#;

    #[test]
    fn test_from_wire() {
        let accessory = Accessory::from_wire(&codec::decode(BULB).unwrap());

        assert_eq!(accessory.instance_id(), 65537);
        assert!(accessory.is_lightbulb());
        assert!(accessory.alive);
        assert_eq!(accessory.model_number(), Some("TRADFRI bulb E27 WS opal 980lm"));

        let light = accessory.first_light().unwrap();
        assert!(light.on_off);
        assert_eq!(light.dimmer, 254);
        assert_eq!(light.model_name(), Some("TRADFRI bulb E27 WS opal 980lm"));
    }

    #[test]
    fn test_plain_parse_does_not_propagate() {
        let accessory = Accessory::default().parsed(&codec::decode(BULB).unwrap());
        assert_eq!(accessory.first_light().unwrap().model_name(), None);
    }

    #[test]
    fn test_accessory_type_codes() {
        assert_eq!(AccessoryType::from(2), AccessoryType::Lightbulb);
        assert_eq!(AccessoryType::from(42), AccessoryType::Unknown(42));
        assert_eq!(i64::from(AccessoryType::Blind), 7);
    }
}
