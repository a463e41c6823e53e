//! Named colors built into the gateway
//!
//! The gateway app offers a fixed palette. Writing one of these hex codes
//! uses the exact coordinates the gateway expects instead of the
//! approximation from [`crate::conversions::rgb_to_cie_xy`].

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorDefinition {
    pub hex: &'static str,
    pub name: &'static str,
    pub color_x: i64,
    pub color_y: i64,
}

const fn color(hex: &'static str, name: &'static str, color_x: i64, color_y: i64) -> ColorDefinition {
    ColorDefinition {
        hex,
        name,
        color_x,
        color_y,
    }
}

pub static PREDEFINED_COLORS: &[ColorDefinition] = &[
    color("dcf0f8", "cold sky", 21109, 21738),
    color("eaf6fb", "cool daylight", 22584, 23272),
    color("f5faf6", "cool white", 24930, 24694),
    color("f2eccf", "sunrise", 28000, 26000),
    color("f1e0b5", "warm white", 30140, 26909),
    color("efd275", "warm glow", 33135, 27211),
    color("ebb63e", "warm amber", 38011, 29409),
    color("e78834", "dark peach", 40632, 26135),
    color("e57345", "candlelight", 42926, 23660),
    color("da5d41", "red", 45264, 19661),
    color("dc4b31", "saturated red", 45914, 19615),
    color("e491af", "light pink", 32768, 17369),
    color("e8bedd", "pink", 29000, 18000),
    color("d9337c", "saturated pink", 32886, 15729),
    color("c984bb", "light purple", 22102, 10493),
    color("8f2686", "saturated purple", 20316, 8520),
    color("4a418a", "blue", 11469, 3277),
    color("6c83ba", "light blue", 13107, 6554),
    color("a9d62b", "lime", 26870, 33423),
    color("d6e44b", "yellow", 29491, 30802),
];

/// Look up a preset by hex code, case-insensitive
pub fn by_hex(hex: &str) -> Option<&'static ColorDefinition> {
    PREDEFINED_COLORS
        .iter()
        .find(|def| def.hex.eq_ignore_ascii_case(hex))
}

/// Look up a preset whose coordinates match exactly
pub fn by_coordinates(color_x: i64, color_y: i64) -> Option<&'static ColorDefinition> {
    PREDEFINED_COLORS
        .iter()
        .find(|def| def.color_x == color_x && def.color_y == color_y)
}
