//! Value conversions between model units and gateway units
//!
//! The gateway encodes hue, saturation and CIE xy coordinates on a
//! 0..=65279 scale and transition times in tenths of a second. White
//! spectrum bulbs have no color temperature property of their own; their
//! temperature is carried by the x coordinate.

use tradfri_core::{PropertyValue, Value};

/// Upper bound of the gateway's color scales
pub const COLOR_MAX: f64 = 65279.0;

/// colorX values of the coldest and warmest white a white spectrum bulb accepts
pub const WHITE_SPECTRUM_RANGE: (i64, i64) = (24930, 33135);

/// colorY written together with a white spectrum temperature
pub const WHITE_SPECTRUM_COLOR_Y: i64 = 27211;

// ============================================================================
// WHITE SPECTRUM
// ============================================================================

/// Color temperature in percent (0 = coldest, 100 = warmest) to colorX
pub fn white_spectrum_to_color_x(percent: f64) -> i64 {
    let (min, max) = WHITE_SPECTRUM_RANGE;
    let percent = percent.clamp(0.0, 100.0);
    (min as f64 + percent / 100.0 * (max - min) as f64).round() as i64
}

/// colorX to a color temperature in percent, clamped to 0..=100
pub fn white_spectrum_from_color_x(color_x: i64) -> f64 {
    let (min, max) = WHITE_SPECTRUM_RANGE;
    let percent = (color_x - min) as f64 / (max - min) as f64 * 100.0;
    percent.clamp(0.0, 100.0)
}

// ============================================================================
// RGB <-> CIE xy
// ============================================================================

fn gamma_expand(channel: f64) -> f64 {
    if channel > 0.04045 {
        ((channel + 0.055) / 1.055).powf(2.4)
    } else {
        channel / 12.92
    }
}

fn gamma_compress(channel: f64) -> f64 {
    if channel <= 0.0031308 {
        12.92 * channel
    } else {
        1.055 * channel.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB to gateway-scaled CIE xy coordinates. Black maps to (0, 0).
pub fn rgb_to_cie_xy(r: u8, g: u8, b: u8) -> (i64, i64) {
    let r = gamma_expand(r as f64 / 255.0);
    let g = gamma_expand(g as f64 / 255.0);
    let b = gamma_expand(b as f64 / 255.0);

    // wide gamut D65
    let x = r * 0.664511 + g * 0.154324 + b * 0.162028;
    let y = r * 0.283881 + g * 0.668433 + b * 0.047685;
    let z = r * 0.000088 + g * 0.072310 + b * 0.986039;

    let sum = x + y + z;
    if sum == 0.0 {
        return (0, 0);
    }

    (
        (x / sum * COLOR_MAX).round() as i64,
        (y / sum * COLOR_MAX).round() as i64,
    )
}

/// Gateway-scaled CIE xy coordinates to sRGB at full brightness
pub fn rgb_from_cie_xy(color_x: i64, color_y: i64) -> (u8, u8, u8) {
    let x = color_x as f64 / COLOR_MAX;
    let y = color_y as f64 / COLOR_MAX;
    if y <= 0.0 {
        return (0, 0, 0);
    }

    let z = 1.0 - x - y;
    let big_y = 1.0;
    let big_x = big_y / y * x;
    let big_z = big_y / y * z;

    let mut r = big_x * 1.656492 - big_y * 0.354851 - big_z * 0.255038;
    let mut g = -big_x * 0.707196 + big_y * 1.655397 + big_z * 0.036152;
    let mut b = big_x * 0.051713 - big_y * 0.121364 + big_z * 1.011530;

    let max = r.max(g).max(b);
    if max > 1.0 {
        r /= max;
        g /= max;
        b /= max;
    }

    let to_byte = |c: f64| (gamma_compress(c.max(0.0)).clamp(0.0, 1.0) * 255.0).round() as u8;
    (to_byte(r), to_byte(g), to_byte(b))
}

/// Parse "rrggbb"
pub fn rgb_from_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("{:02x}{:02x}{:02x}", r, g, b)
}

// ============================================================================
// PROPERTY TRANSFORMS
// ============================================================================

fn scale_out(value: Value, range: f64) -> Value {
    match value.as_f64() {
        Some(v) => Value::Int((v / range * COLOR_MAX).round() as i64),
        None => value,
    }
}

fn scale_in(raw: &Value, range: f64) -> Option<PropertyValue> {
    raw.as_f64().map(|v| PropertyValue::Float(v / COLOR_MAX * range))
}

/// Hue in degrees to the gateway scale
pub fn serialize_hue(value: Value) -> Value {
    scale_out(value, 360.0)
}

pub fn deserialize_hue(raw: &Value) -> Option<PropertyValue> {
    scale_in(raw, 360.0)
}

/// Saturation in percent to the gateway scale
pub fn serialize_saturation(value: Value) -> Value {
    scale_out(value, 100.0)
}

pub fn deserialize_saturation(raw: &Value) -> Option<PropertyValue> {
    scale_in(raw, 100.0)
}

/// Seconds to tenths of a second
pub fn serialize_transition_time(value: Value) -> Value {
    match value.as_f64() {
        Some(seconds) => Value::Int((seconds * 10.0).round() as i64),
        None => value,
    }
}

pub fn deserialize_transition_time(raw: &Value) -> Option<PropertyValue> {
    raw.as_f64().map(|ds| PropertyValue::Float(ds / 10.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_spectrum_bounds() {
        assert_eq!(white_spectrum_to_color_x(0.0), 24930);
        assert_eq!(white_spectrum_to_color_x(100.0), 33135);
        assert_eq!(white_spectrum_to_color_x(150.0), 33135);
        assert_eq!(white_spectrum_from_color_x(0), 0.0);
        assert_eq!(white_spectrum_from_color_x(40000), 100.0);
    }

    #[test]
    fn test_white_spectrum_monotonic() {
        let mut last = -1.0;
        for color_x in (24930..=33135).step_by(500) {
            let percent = white_spectrum_from_color_x(color_x);
            assert!(percent > last);
            last = percent;
        }
    }

    #[test]
    fn test_white_spectrum_inverse() {
        for percent in [0.0, 12.5, 50.0, 99.0] {
            let back = white_spectrum_from_color_x(white_spectrum_to_color_x(percent));
            assert!((back - percent).abs() < 0.01, "{} -> {}", percent, back);
        }
    }

    #[test]
    fn test_rgb_round_trip_is_close() {
        for (r, g, b) in [(255, 0, 0), (0, 255, 0), (0, 0, 255)] {
            let (x, y) = rgb_to_cie_xy(r, g, b);
            let (r2, g2, b2) = rgb_from_cie_xy(x, y);
            let dominant = |a: u8, b: u8, c: u8| if a >= b && a >= c { 0 } else if b >= c { 1 } else { 2 };
            assert_eq!(dominant(r, g, b), dominant(r2, g2, b2), "{:?}", (r2, g2, b2));
        }
    }

    #[test]
    fn test_black_and_degenerate() {
        assert_eq!(rgb_to_cie_xy(0, 0, 0), (0, 0));
        assert_eq!(rgb_from_cie_xy(0, 0), (0, 0, 0));
    }

    #[test]
    fn test_hex() {
        assert_eq!(rgb_from_hex("f1e0b5"), Some((0xf1, 0xe0, 0xb5)));
        assert_eq!(rgb_from_hex("F1E0B5"), Some((0xf1, 0xe0, 0xb5)));
        assert_eq!(rgb_from_hex("f1e0b"), None);
        assert_eq!(rgb_from_hex("zzzzzz"), None);
        assert_eq!(rgb_to_hex(1, 2, 255), "0102ff");
    }

    #[test]
    fn test_property_transforms() {
        assert_eq!(serialize_hue(Value::Float(360.0)), Value::Int(65279));
        assert_eq!(serialize_saturation(Value::Float(50.0)), Value::Int(32640));
        assert_eq!(serialize_transition_time(Value::Float(0.5)), Value::Int(5));
        assert_eq!(
            deserialize_transition_time(&Value::Int(5)).and_then(|v| v.as_f64()),
            Some(0.5)
        );

        let hue = deserialize_hue(&Value::Int(65279)).and_then(|v| v.as_f64()).unwrap();
        assert!((hue - 360.0).abs() < 1e-9);
    }
}
