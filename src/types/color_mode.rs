//! Color modes reported by lights.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A color mode name as reported in a light's `supported_color_modes`.
///
/// The group itself only ever exposes [`ColorMode::Brightness`],
/// [`ColorMode::ColorTemp`] and [`ColorMode::Hs`]; the other modes are
/// recognized on children to decide what they can receive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ColorMode {
    Onoff,
    Brightness,
    ColorTemp,
    Hs,
    Xy,
    Rgb,
    Rgbw,
    Rgbww,
    Rgbcw,
    White,
}

impl ColorMode {
    /// True for the modes that accept a color (as opposed to white tuning).
    ///
    /// ```
    /// use relative_light_group::ColorMode;
    ///
    /// assert!(ColorMode::Xy.is_color());
    /// assert!(!ColorMode::ColorTemp.is_color());
    /// ```
    pub fn is_color(self) -> bool {
        matches!(
            self,
            ColorMode::Hs
                | ColorMode::Xy
                | ColorMode::Rgb
                | ColorMode::Rgbw
                | ColorMode::Rgbww
                | ColorMode::Rgbcw
        )
    }

    /// All modes that count as color support.
    pub fn color_modes() -> impl Iterator<Item = ColorMode> {
        ColorMode::iter().filter(|mode| mode.is_color())
    }

    /// Parse a collection of reported mode names, skipping names this crate
    /// does not know.
    ///
    /// ```
    /// use relative_light_group::ColorMode;
    ///
    /// let modes = ColorMode::parse_all(["COLOR_TEMP", "xy", "fancy"]);
    /// assert_eq!(modes.len(), 2);
    /// assert!(modes.contains(&ColorMode::ColorTemp));
    /// ```
    pub fn parse_all<I, S>(names: I) -> BTreeSet<ColorMode>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| ColorMode::from_str(name.as_ref().trim()).ok())
            .collect()
    }
}
