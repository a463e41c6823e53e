//! Tradfri Devices
//!
//! Concrete model types for everything a Tradfri gateway reports, defined
//! against the property tables of `tradfri-core`:
//! - Accessories and their device info ([`Accessory`], [`DeviceInfo`])
//! - Lights, and the light settings stored in scenes ([`Light`], [`LightSetting`])
//! - Gateway groups and scenes ([`Group`], [`Scene`])
//! - Capability-aware light access ([`SpectrumLight`])
//!
//! Color math lives in [`conversions`], the gateway's named colors in
//! [`predefined_colors`].

pub mod accessory;
pub mod conversions;
pub mod device;
pub mod error;
pub mod group;
pub mod light;
pub mod light_setting;
pub mod predefined_colors;
pub mod scene;
pub mod spectrum;

pub use accessory::{Accessory, AccessoryType, DeviceInfo};
pub use error::{DeviceError, Result};
pub use group::Group;
pub use light::Light;
pub use light_setting::LightSetting;
pub use scene::Scene;
pub use spectrum::{Spectrum, SpectrumLight};
