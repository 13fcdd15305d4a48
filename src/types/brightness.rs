//! Brightness values on the platform's 1-254 scale.

use serde::{Deserialize, Serialize};

/// Brightness level from 1 to 254.
///
/// The upper bound matches the Matter level range so groups can be bridged
/// without a rescaling step.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Brightness {
    pub(crate) value: u8,
}

impl Brightness {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 254;

    /// Full brightness.
    pub fn new() -> Self {
        Brightness { value: Self::MAX }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Returns None if value is outside valid range (1-254).
    ///
    /// ```
    /// use relative_light_group::Brightness;
    ///
    /// assert!(Brightness::create(0).is_none());
    /// assert!(Brightness::create(1).is_some());
    /// assert!(Brightness::create(254).is_some());
    /// assert!(Brightness::create(255).is_none());
    /// ```
    pub fn create(value: u8) -> Option<Self> {
        if Self::is_valid(value) {
            Some(Brightness { value })
        } else {
            None
        }
    }

    /// Clamps any integer into the valid range.
    ///
    /// ```
    /// use relative_light_group::Brightness;
    ///
    /// assert_eq!(Brightness::clamped(-4).value(), 1);
    /// assert_eq!(Brightness::clamped(128).value(), 128);
    /// assert_eq!(Brightness::clamped(255).value(), 254);
    /// ```
    pub fn clamped(value: i64) -> Self {
        let value = value.clamp(i64::from(Self::MIN), i64::from(Self::MAX));
        Brightness { value: value as u8 }
    }

    fn is_valid(value: u8) -> bool {
        (Self::MIN..=Self::MAX).contains(&value)
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::new()
    }
}
