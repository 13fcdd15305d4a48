//! Color temperature.

use serde::{Deserialize, Serialize};

/// Color temperature in Kelvin, with valid values from 1000K to 20000K.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. Typical values:
/// - 2700K: Warm white (incandescent-like)
/// - 4000K: Neutral white
/// - 6500K: Daylight
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Kelvin {
    const MIN: u16 = 1000;
    const MAX: u16 = 20000;

    /// Get the kelvin value.
    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the valid range (1000-20000).
    ///
    /// # Examples
    ///
    /// ```
    /// use relative_light_group::Kelvin;
    ///
    /// assert!(Kelvin::create(999).is_none());
    /// assert!(Kelvin::create(2700).is_some());
    /// assert!(Kelvin::create(20001).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&kelvin) {
            Some(Kelvin { kelvin })
        } else {
            None
        }
    }

    /// Convert a legacy mired value, `kelvin = round(1_000_000 / mireds)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use relative_light_group::Kelvin;
    ///
    /// assert_eq!(Kelvin::from_mireds(370.0).unwrap().kelvin(), 2703);
    /// assert_eq!(Kelvin::from_mireds(153.0).unwrap().kelvin(), 6536);
    /// assert!(Kelvin::from_mireds(0.0).is_none());
    /// ```
    pub fn from_mireds(mireds: f64) -> Option<Self> {
        if !mireds.is_finite() || mireds <= 0.0 {
            return None;
        }
        let kelvin = (1_000_000.0 / mireds).round();
        if kelvin > f64::from(u16::MAX) {
            return None;
        }
        Self::create(kelvin as u16)
    }

    /// Parse a JSON number into a Kelvin value, rounding fractions.
    pub(crate) fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 || value > f64::from(u16::MAX) {
            return None;
        }
        Self::create(value.round() as u16)
    }
}

/// An inclusive Kelvin range advertised by a light.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct KelvinRange {
    pub min: Kelvin,
    pub max: Kelvin,
}

impl KelvinRange {
    /// Range advertised when color temperature is exposed but no child
    /// reported bounds.
    pub const PLATFORM_DEFAULT: KelvinRange = KelvinRange {
        min: Kelvin { kelvin: 2000 },
        max: Kelvin { kelvin: 6535 },
    };

    pub fn new(min: Kelvin, max: Kelvin) -> Self {
        KelvinRange { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}
