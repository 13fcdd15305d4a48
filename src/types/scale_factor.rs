//! Per-child brightness multiplier.

use serde::{Deserialize, Serialize};

/// A non-negative multiplier applied to the master brightness for one child.
///
/// Configuration forms offer 0 to 5 in steps of 0.01; larger values are kept
/// as given.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct ScaleFactor {
    pub(crate) value: f64,
}

impl ScaleFactor {
    pub const DEFAULT: f64 = 1.0;

    /// The identity factor (1.0).
    pub fn new() -> Self {
        ScaleFactor {
            value: Self::DEFAULT,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Returns None for negative or non-finite values.
    ///
    /// ```
    /// use relative_light_group::ScaleFactor;
    ///
    /// assert!(ScaleFactor::create(0.0).is_some());
    /// assert!(ScaleFactor::create(2.5).is_some());
    /// assert!(ScaleFactor::create(-0.1).is_none());
    /// assert!(ScaleFactor::create(f64::NAN).is_none());
    /// ```
    pub fn create(value: f64) -> Option<Self> {
        if value.is_finite() && value >= 0.0 {
            Some(ScaleFactor { value })
        } else {
            None
        }
    }

    /// Returns the default (1.0) if value is invalid.
    pub fn create_or(value: f64) -> Self {
        Self::create(value).unwrap_or_default()
    }

    /// Scale a brightness level, `round(level * factor)`.
    ///
    /// Rounds half away from zero.
    ///
    /// ```
    /// use relative_light_group::ScaleFactor;
    ///
    /// assert_eq!(ScaleFactor::create(0.5).unwrap().scale(254), 127);
    /// assert_eq!(ScaleFactor::create(0.5).unwrap().scale(3), 2);
    /// assert_eq!(ScaleFactor::create(2.0).unwrap().scale(100), 200);
    /// ```
    pub fn scale(&self, level: u8) -> i64 {
        (f64::from(level) * self.value).round() as i64
    }
}

impl Default for ScaleFactor {
    fn default() -> Self {
        Self::new()
    }
}
