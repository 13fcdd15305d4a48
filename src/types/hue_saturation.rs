//! Hue and Saturation color representation.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Hue and Saturation color representation.
///
/// - Hue: The color angle on the color wheel (0-360 degrees)
/// - Saturation: The intensity of the color (0-100 percent)
///
/// Serialized as a `[hue, saturation]` pair, the shape the platform uses for
/// its `hs_color` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(into = "(f32, f32)", try_from = "(f32, f32)")]
pub struct HueSaturation {
    hue: f32,
    saturation: f32,
}

impl HueSaturation {
    /// Create a new HueSaturation with the given values.
    ///
    /// Returns `None` if values are outside valid ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use relative_light_group::HueSaturation;
    ///
    /// assert!(HueSaturation::create(0.0, 100.0).is_some());
    /// assert!(HueSaturation::create(120.5, 50.0).is_some());
    /// assert!(HueSaturation::create(361.0, 50.0).is_none());
    /// assert!(HueSaturation::create(180.0, 101.0).is_none());
    /// ```
    pub fn create(hue: f32, saturation: f32) -> Option<Self> {
        if (0.0..=360.0).contains(&hue) && (0.0..=100.0).contains(&saturation) {
            Some(HueSaturation { hue, saturation })
        } else {
            None
        }
    }

    /// Get the hue value.
    pub fn hue(&self) -> f32 {
        self.hue
    }

    /// Get the saturation value.
    pub fn saturation(&self) -> f32 {
        self.saturation
    }
}

impl From<HueSaturation> for (f32, f32) {
    fn from(hs: HueSaturation) -> Self {
        (hs.hue, hs.saturation)
    }
}

impl TryFrom<(f32, f32)> for HueSaturation {
    type Error = String;

    fn try_from((hue, saturation): (f32, f32)) -> Result<Self, Self::Error> {
        HueSaturation::create(hue, saturation)
            .ok_or_else(|| format!("hs color out of range: ({hue}, {saturation})"))
    }
}

impl FromStr for HueSaturation {
    type Err = String;

    /// Parse from comma-separated string (e.g., "200,70").
    fn from_str(s: &str) -> Result<Self, String> {
        let parts: Vec<f32> = s
            .split(',')
            .map(|c| c.trim().parse().map_err(|_| format!("invalid number: {c}")))
            .collect::<Result<_, _>>()?;
        match parts[..] {
            [hue, saturation] => HueSaturation::try_from((hue, saturation)),
            _ => Err("Expected format: h,s".into()),
        }
    }
}
