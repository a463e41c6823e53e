//! Capability-aware light access
//!
//! White spectrum and color bulbs don't expose color temperature or RGB
//! directly; the gateway only understands CIE xy coordinates for them.
//! [`SpectrumLight`] wraps a [`Light`] and redirects the affected properties
//! according to the bulb's capabilities:
//!
//! | Spectrum | Redirected property | Backing properties |
//! |----------|---------------------|--------------------|
//! | `White`  | `colorTemperature` (0-100 %) | `colorX`, `colorY` |
//! | `Rgb`    | `color` (hex `rrggbb`) | `colorX`, `colorY` |
//! | `None`   | nothing | |
//!
//! The capability is derived from the accessory's model number the first
//! time it is needed and cached afterwards.

use crate::conversions::{self, WHITE_SPECTRUM_COLOR_Y};
use crate::error::{DeviceError, Result};
use crate::light::Light;
use crate::predefined_colors;
use regex_lite::Regex;
use std::any::Any;
use std::sync::OnceLock;
use tracing::{debug, warn};
use tradfri_core::{IpsoObject, PropertyRef, PropertyTable, PropertyValue};

/// Color capabilities of a bulb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spectrum {
    None,
    White,
    Rgb,
}

impl Spectrum {
    /// Detect the spectrum from an IKEA model number, e.g.
    /// `TRADFRI bulb E27 WS opal 980lm` (white) or `TRADFRI bulb E27 CWS opal 600lm` (rgb)
    pub fn detect(model_name: Option<&str>) -> Self {
        match model_name {
            Some(model) if model.contains(" WS ") => Spectrum::White,
            Some(model) if model.contains(" C/WS ") || model.contains(" CWS ") => Spectrum::Rgb,
            _ => Spectrum::None,
        }
    }
}

fn hex_color_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new("^[0-9A-Fa-f]{6}$").ok())
        .as_ref()
}

fn is_hex_color(value: &str) -> bool {
    hex_color_pattern().is_some_and(|re| re.is_match(value))
}

/// A light seen through its color capabilities
#[derive(Debug, Clone)]
pub struct SpectrumLight {
    light: Light,
    spectrum: OnceLock<Spectrum>,
}

impl SpectrumLight {
    pub fn new(light: Light) -> Self {
        Self {
            light,
            spectrum: OnceLock::new(),
        }
    }

    pub fn spectrum(&self) -> Spectrum {
        *self
            .spectrum
            .get_or_init(|| Spectrum::detect(self.light.model_name()))
    }

    pub fn inner(&self) -> &Light {
        &self.light
    }

    /// Direct access to the raw properties. Changing the model name
    /// afterwards does not change the detected spectrum.
    pub fn inner_mut(&mut self) -> &mut Light {
        &mut self.light
    }

    pub fn into_inner(self) -> Light {
        self.light
    }

    /// Color temperature in percent. White spectrum bulbs derive it from colorX.
    pub fn color_temperature(&self) -> f64 {
        match self.spectrum() {
            Spectrum::White => conversions::white_spectrum_from_color_x(self.light.color_x),
            _ => self.light.color_temperature,
        }
    }

    pub fn set_color_temperature(&mut self, percent: f64) {
        match self.spectrum() {
            Spectrum::White => {
                self.light.color_x = conversions::white_spectrum_to_color_x(percent);
                self.light.color_y = WHITE_SPECTRUM_COLOR_Y;
            }
            _ => self.light.color_temperature = percent,
        }
    }

    /// Hex color. Color bulbs derive it from the xy coordinates, preferring
    /// the gateway's named presets.
    pub fn color(&self) -> String {
        match self.spectrum() {
            Spectrum::Rgb => {
                let (x, y) = (self.light.color_x, self.light.color_y);
                if let Some(preset) = predefined_colors::by_coordinates(x, y) {
                    return preset.hex.to_string();
                }
                let (r, g, b) = conversions::rgb_from_cie_xy(x, y);
                conversions::rgb_to_hex(r, g, b)
            }
            _ => self.light.color.clone(),
        }
    }

    /// Set a hex color. On color bulbs only `rrggbb` is accepted; anything
    /// else leaves the light unchanged.
    pub fn set_color(&mut self, hex: &str) -> Result<()> {
        if self.spectrum() != Spectrum::Rgb {
            self.light.color = hex.to_string();
            return Ok(());
        }

        if let Some(preset) = predefined_colors::by_hex(hex) {
            debug!("using predefined color {} for {}", preset.name, hex);
            self.light.color_x = preset.color_x;
            self.light.color_y = preset.color_y;
            return Ok(());
        }

        if !is_hex_color(hex) {
            warn!("rejecting invalid color {:?}", hex);
            return Err(DeviceError::InvalidColor(hex.to_string()));
        }

        let (r, g, b) =
            conversions::rgb_from_hex(hex).ok_or_else(|| DeviceError::InvalidColor(hex.to_string()))?;
        let (x, y) = conversions::rgb_to_cie_xy(r, g, b);
        self.light.color_x = x;
        self.light.color_y = y;
        Ok(())
    }

    /// Deep copy keeping the capability of the original
    pub fn duplicate(&self) -> Result<Self> {
        Ok(Self::new(self.light.duplicate()?))
    }
}

impl From<Light> for SpectrumLight {
    fn from(light: Light) -> Self {
        Self::new(light)
    }
}

impl IpsoObject for SpectrumLight {
    fn metadata(&self) -> &'static PropertyTable {
        Light::table()
    }

    fn get(&self, name: &str) -> Option<PropertyRef<'_>> {
        match (self.spectrum(), name) {
            (Spectrum::White, "colorTemperature") => Some(PropertyRef::Float(self.color_temperature())),
            (Spectrum::Rgb, "color") => Some(PropertyRef::owned(self.color())),
            _ => self.light.get(name),
        }
    }

    fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match (self.spectrum(), name) {
            (Spectrum::White, "colorTemperature") => match value.as_f64() {
                Some(percent) => {
                    self.set_color_temperature(percent);
                    true
                }
                None => false,
            },
            (Spectrum::Rgb, "color") => match value.as_str() {
                Some(hex) => self.set_color(hex).is_ok(),
                None => false,
            },
            _ => self.light.set(name, value),
        }
    }

    fn new_instance(&self) -> Box<dyn IpsoObject> {
        let mut fresh = Light::default();
        if let Some(model) = self.light.model_name() {
            fresh.set_model_name(model);
        }
        Box::new(SpectrumLight::new(fresh))
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        assert_eq!(Spectrum::detect(Some("TRADFRI bulb E27 WS opal 980lm")), Spectrum::White);
        assert_eq!(Spectrum::detect(Some("TRADFRI bulb E27 C/WS opal 600")), Spectrum::Rgb);
        assert_eq!(Spectrum::detect(Some("TRADFRI bulb E27 CWS opal 600lm")), Spectrum::Rgb);
        assert_eq!(Spectrum::detect(Some("TRADFRI bulb E27 opal 1000lm")), Spectrum::None);
        assert_eq!(Spectrum::detect(Some("WS at start")), Spectrum::None);
        assert_eq!(Spectrum::detect(None), Spectrum::None);
    }

    #[test]
    fn test_hex_pattern() {
        assert!(is_hex_color("A0b1C2"));
        assert!(!is_hex_color("a0b1c"));
        assert!(!is_hex_color("#a0b1c2"));
        assert!(!is_hex_color("a0b1c2d"));
    }

    #[test]
    fn test_detection_is_cached() {
        let mut light = SpectrumLight::new(Light::with_model("TRADFRI bulb E27 WS opal 980lm"));
        assert_eq!(light.spectrum(), Spectrum::White);
        light.inner_mut().set_model_name("TRADFRI bulb E27 CWS opal 600lm");
        assert_eq!(light.spectrum(), Spectrum::White);
    }
}
