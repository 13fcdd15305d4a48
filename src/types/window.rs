//! Per-child brightness bounds.

use serde::{Deserialize, Serialize};

use super::Brightness;

/// Inclusive `(min, max)` bounds for the brightness sent to one child.
///
/// Both ends are clamped into the 1-254 range on write. An inverted window is
/// kept as configured; [`BrightnessWindow::clamp`] then resolves to `min`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessWindow {
    pub(crate) min: u8,
    pub(crate) max: u8,
}

impl BrightnessWindow {
    /// The full window, 1 to 254.
    pub fn new() -> Self {
        BrightnessWindow {
            min: Brightness::MIN,
            max: Brightness::MAX,
        }
    }

    /// Build a window, clamping both bounds into 1-254.
    ///
    /// ```
    /// use relative_light_group::BrightnessWindow;
    ///
    /// let window = BrightnessWindow::create(0, 255);
    /// assert_eq!((window.min(), window.max()), (1, 254));
    /// ```
    pub fn create(min: i64, max: i64) -> Self {
        BrightnessWindow {
            min: Brightness::clamped(min).value(),
            max: Brightness::clamped(max).value(),
        }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    /// Clamp a target into this window.
    ///
    /// ```
    /// use relative_light_group::BrightnessWindow;
    ///
    /// let window = BrightnessWindow::create(1, 80);
    /// assert_eq!(window.clamp(200), 80);
    /// assert_eq!(window.clamp(-3), 1);
    ///
    /// let inverted = BrightnessWindow::create(120, 40);
    /// assert_eq!(inverted.clamp(100), 120);
    /// ```
    pub fn clamp(&self, target: i64) -> u8 {
        // Not `Ord::clamp`: it panics on an inverted window.
        let value = target.min(i64::from(self.max)).max(i64::from(self.min));
        value as u8
    }
}

impl Default for BrightnessWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_is_idempotent() {
        let windows = [
            BrightnessWindow::new(),
            BrightnessWindow::create(10, 80),
            BrightnessWindow::create(200, 30),
            BrightnessWindow::create(50, 50),
        ];
        for window in windows {
            for x in -10..300 {
                let once = window.clamp(x);
                assert_eq!(window.clamp(i64::from(once)), once);
            }
        }
    }

    #[test]
    fn test_clamp_stays_in_window() {
        let window = BrightnessWindow::create(20, 90);
        for x in 0..400 {
            let value = window.clamp(x);
            assert!((20..=90).contains(&value));
        }
    }
}
