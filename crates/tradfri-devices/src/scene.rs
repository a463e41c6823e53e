//! Scenes stored on the gateway

use crate::device::DeviceHeader;
use crate::light_setting::LightSetting;
use std::any::Any;
use std::sync::OnceLock;
use tradfri_core::{
    IpsoObject, PropertyDescriptor, PropertyRef, PropertyTable, PropertyValue, ValueKind,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub header: DeviceHeader,
    pub is_active: bool,
    pub is_predefined: bool,
    pub light_settings: Option<Vec<LightSetting>>,
    pub scene_index: i64,
    pub use_current_light_settings: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            header: DeviceHeader::default(),
            is_active: false,
            is_predefined: true,
            light_settings: None,
            scene_index: 0,
            use_current_light_settings: false,
        }
    }
}

impl Scene {
    pub fn new(instance_id: i64, name: impl Into<String>) -> Self {
        Self {
            header: DeviceHeader::new(instance_id, name),
            ..Self::default()
        }
    }

    pub fn light_setting(&self, instance_id: i64) -> Option<&LightSetting> {
        self.light_settings
            .as_deref()?
            .iter()
            .find(|setting| setting.instance_id == instance_id)
    }
}

impl IpsoObject for Scene {
    fn metadata(&self) -> &'static PropertyTable {
        static TABLE: OnceLock<PropertyTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            DeviceHeader::register(PropertyTable::builder("Scene"))
                .property(PropertyDescriptor::new("isActive", "9058", ValueKind::Bool))
                .property(PropertyDescriptor::new("isPredefined", "9068", ValueKind::Bool))
                .property(
                    PropertyDescriptor::new("lightSettings", "15013", ValueKind::array_of(ValueKind::Object))
                        .deserialize_with(LightSetting::deserialize),
                )
                .property(PropertyDescriptor::new("sceneIndex", "9057", ValueKind::Int))
                .property(PropertyDescriptor::new("useCurrentLightSettings", "9070", ValueKind::Bool))
                .build()
        })
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match name {
            "isActive" => Some(PropertyRef::Bool(self.is_active)),
            "isPredefined" => Some(PropertyRef::Bool(self.is_predefined)),
            "lightSettings" => self.light_settings.as_deref().map(PropertyRef::objects),
            "sceneIndex" => Some(PropertyRef::Int(self.scene_index)),
            "useCurrentLightSettings" => Some(PropertyRef::Bool(self.use_current_light_settings)),
            other => self.header.get(other),
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match name {
            "isActive" => value.as_bool().map(|v| self.is_active = v).is_some(),
            "isPredefined" => value.as_bool().map(|v| self.is_predefined = v).is_some(),
            "lightSettings" => value
                .into_objects::<LightSetting>()
                .map(|v| self.light_settings = Some(v))
                .is_some(),
            "sceneIndex" => value.as_i64().map(|v| self.scene_index = v).is_some(),
            "useCurrentLightSettings" => value
                .as_bool()
                .map(|v| self.use_current_light_settings = v)
                .is_some(),
            other => self.header.set(other, value).unwrap_or(false),
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        Box::new(Scene::default())
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
