use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

/// Accent used for single-series charts.
pub const ACCENT: Color32 = Color32::from_rgb(0x4C, 0xAF, 0x50);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

/// Colour along a dark-blue → yellow ramp for `t` in `0..=1`, used to shade
/// RFM points by monetary value.
pub fn ramp(t: f64) -> Color32 {
    let t = t.clamp(0.0, 1.0) as f32;
    let hsl = Hsl::new(260.0 - 200.0 * t, 0.7, 0.3 + 0.3 * t);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

// ---------------------------------------------------------------------------
// Color mapping: country → Color32
// ---------------------------------------------------------------------------

/// Stable country colours, so a country keeps its colour across charts and
/// filter changes.
#[derive(Debug, Clone, Default)]
pub struct ColorMap {
    mapping: BTreeMap<String, Color32>,
}

impl ColorMap {
    /// Build a colour map from every country in the table.
    pub fn new(countries: &BTreeSet<String>) -> Self {
        let palette = generate_palette(countries.len());
        let mapping = countries.iter().cloned().zip(palette).collect();
        ColorMap { mapping }
    }

    /// Look up the colour for a country; grey for unknown labels such as "Others".
    pub fn color_for(&self, country: &str) -> Color32 {
        self.mapping.get(country).copied().unwrap_or(Color32::GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_requested_size_and_distinct_colours() {
        let p = generate_palette(6);
        assert_eq!(p.len(), 6);
        let unique: BTreeSet<_> = p.iter().map(|c| c.to_array()).collect();
        assert_eq!(unique.len(), 6);
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn unknown_country_is_grey() {
        let countries: BTreeSet<String> = ["France".to_string(), "UK".to_string()].into();
        let map = ColorMap::new(&countries);
        assert_ne!(map.color_for("France"), map.color_for("UK"));
        assert_eq!(map.color_for("Others"), Color32::GRAY);
    }
}
