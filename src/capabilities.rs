//! Capability negotiation between a group and its children.
//!
//! Each child's reported color modes and color-temperature bounds are read
//! once, when the group is attached. From those the group derives which
//! attributes it may forward and the fixed set of color modes it exposes.

use std::collections::BTreeSet;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::host::ChildSnapshot;
use crate::types::{ColorMode, Kelvin, KelvinRange};

pub(crate) const ATTR_SUPPORTED_COLOR_MODES: &str = "supported_color_modes";
pub(crate) const ATTR_MIN_KELVIN: &str = "min_color_temp_kelvin";
pub(crate) const ATTR_MAX_KELVIN: &str = "max_color_temp_kelvin";
pub(crate) const ATTR_MIN_MIREDS: &str = "min_mireds";
pub(crate) const ATTR_MAX_MIREDS: &str = "max_mireds";

/// What a single child can receive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildCapabilities {
    pub supports_ct: bool,
    pub supports_color: bool,
    pub kelvin_range: Option<KelvinRange>,
}

impl ChildCapabilities {
    /// Read capabilities from a host snapshot.
    ///
    /// A child the host does not know supports nothing.
    ///
    /// ```
    /// use relative_light_group::{ChildCapabilities, ChildSnapshot};
    /// use serde_json::json;
    ///
    /// let child = ChildSnapshot::new("light.strip", "on")
    ///     .with_attribute("supported_color_modes", json!(["color_temp", "xy"]))
    ///     .with_attribute("min_mireds", json!(153))
    ///     .with_attribute("max_mireds", json!(500));
    /// let caps = ChildCapabilities::from_snapshot(Some(&child));
    /// assert!(caps.supports_ct && caps.supports_color);
    ///
    /// let range = caps.kelvin_range.unwrap();
    /// assert_eq!((range.min.kelvin(), range.max.kelvin()), (2000, 6536));
    ///
    /// assert_eq!(ChildCapabilities::from_snapshot(None), ChildCapabilities::default());
    /// ```
    pub fn from_snapshot(snapshot: Option<&ChildSnapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };

        let modes = supported_color_modes(&snapshot.attributes);
        ChildCapabilities {
            supports_ct: modes.contains(&ColorMode::ColorTemp),
            supports_color: modes.iter().any(|mode| mode.is_color()),
            kelvin_range: reported_kelvin_range(&snapshot.attributes),
        }
    }
}

/// Group-wide view of the children's capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySummary {
    pub any_ct: bool,
    pub all_ct: bool,
    pub any_color: bool,
    pub all_color: bool,
}

impl CapabilitySummary {
    /// Summarize a set of children. The `all_*` flags are false for an empty
    /// set.
    pub fn from_children<'a, I>(children: I) -> Self
    where
        I: IntoIterator<Item = &'a ChildCapabilities>,
    {
        let mut summary = CapabilitySummary {
            all_ct: true,
            all_color: true,
            ..Default::default()
        };
        let mut seen = false;
        for child in children {
            seen = true;
            summary.any_ct |= child.supports_ct;
            summary.all_ct &= child.supports_ct;
            summary.any_color |= child.supports_color;
            summary.all_color &= child.supports_color;
        }
        if !seen {
            summary.all_ct = false;
            summary.all_color = false;
        }
        summary
    }
}

/// Capabilities the group exposes for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCapabilities {
    supported: BTreeSet<ColorMode>,
    kelvin_range: Option<KelvinRange>,
    summary: CapabilitySummary,
}

impl GroupCapabilities {
    /// The set exposed before attachment and by groups without children.
    pub fn brightness_only() -> Self {
        GroupCapabilities {
            supported: BTreeSet::from([ColorMode::Brightness]),
            kelvin_range: None,
            summary: CapabilitySummary::default(),
        }
    }

    /// Derive the exposed color modes from the children and the forwarding
    /// flags.
    ///
    /// ```
    /// use relative_light_group::{ChildCapabilities, ColorMode, GroupCapabilities};
    ///
    /// let ct_only = ChildCapabilities { supports_ct: true, ..Default::default() };
    /// let caps = GroupCapabilities::finalize(&[ct_only], true, true);
    /// assert!(caps.supports(ColorMode::ColorTemp));
    /// assert!(!caps.supports(ColorMode::Hs));
    ///
    /// let caps = GroupCapabilities::finalize(&[ct_only], false, true);
    /// assert_eq!(caps.supported_color_modes().len(), 1);
    /// ```
    pub fn finalize(children: &[ChildCapabilities], forward_ct: bool, forward_color: bool) -> Self {
        if children.is_empty() {
            return Self::brightness_only();
        }

        let summary = CapabilitySummary::from_children(children);
        let mut supported = BTreeSet::from([ColorMode::Brightness]);
        if forward_color && summary.any_color {
            supported.insert(ColorMode::Hs);
        }
        if forward_ct && summary.any_ct {
            supported.insert(ColorMode::ColorTemp);
        }

        let kelvin_range = merge_kelvin_ranges(children.iter().filter_map(|c| c.kelvin_range));
        debug!(
            "finalized color modes {:?}, kelvin range {:?}",
            supported, kelvin_range
        );

        GroupCapabilities {
            supported,
            kelvin_range,
            summary,
        }
    }

    pub fn supported_color_modes(&self) -> &BTreeSet<ColorMode> {
        &self.supported
    }

    pub fn supports(&self, mode: ColorMode) -> bool {
        self.supported.contains(&mode)
    }

    pub fn summary(&self) -> CapabilitySummary {
        self.summary
    }

    /// The merged range of the children that reported one.
    pub fn kelvin_range(&self) -> Option<KelvinRange> {
        self.kelvin_range
    }

    /// The range the group advertises; only present when color temperature
    /// is exposed.
    pub fn advertised_kelvin_range(&self) -> Option<KelvinRange> {
        if self.supports(ColorMode::ColorTemp) {
            Some(self.kelvin_range.unwrap_or(KelvinRange::PLATFORM_DEFAULT))
        } else {
            None
        }
    }
}

impl Default for GroupCapabilities {
    fn default() -> Self {
        Self::brightness_only()
    }
}

/// Intersect the given ranges, falling back to their union span when the
/// intersection is empty.
///
/// ```
/// use relative_light_group::{merge_kelvin_ranges, Kelvin, KelvinRange};
///
/// let range = |a, b| KelvinRange::new(Kelvin::create(a).unwrap(), Kelvin::create(b).unwrap());
///
/// let merged = merge_kelvin_ranges([range(2000, 4000), range(2700, 6500)]).unwrap();
/// assert_eq!(merged, range(2700, 4000));
///
/// let merged = merge_kelvin_ranges([range(2000, 2200), range(5000, 6000)]).unwrap();
/// assert_eq!(merged, range(2000, 6000));
///
/// assert!(merge_kelvin_ranges([]).is_none());
/// ```
pub fn merge_kelvin_ranges<I>(ranges: I) -> Option<KelvinRange>
where
    I: IntoIterator<Item = KelvinRange>,
{
    let mut ranges = ranges.into_iter();
    let first = ranges.next()?;

    let (mut lo_max, mut hi_min) = (first.min, first.max);
    let (mut lo_min, mut hi_max) = (first.min, first.max);
    for range in ranges {
        lo_max = lo_max.max(range.min);
        hi_min = hi_min.min(range.max);
        lo_min = lo_min.min(range.min);
        hi_max = hi_max.max(range.max);
    }

    let intersection = KelvinRange::new(lo_max, hi_min);
    if intersection.is_valid() {
        Some(intersection)
    } else {
        debug!("kelvin ranges do not overlap; using union span");
        Some(KelvinRange::new(lo_min, hi_max))
    }
}

fn supported_color_modes(attributes: &Map<String, Value>) -> BTreeSet<ColorMode> {
    match attributes.get(ATTR_SUPPORTED_COLOR_MODES) {
        Some(Value::Array(names)) => ColorMode::parse_all(names.iter().filter_map(Value::as_str)),
        _ => BTreeSet::new(),
    }
}

fn reported_kelvin_range(attributes: &Map<String, Value>) -> Option<KelvinRange> {
    let number = |key: &str| attributes.get(key).and_then(Value::as_f64);

    let kelvin = match (number(ATTR_MIN_KELVIN), number(ATTR_MAX_KELVIN)) {
        (Some(min), Some(max)) => Kelvin::from_f64(min).zip(Kelvin::from_f64(max)),
        _ => None,
    };
    // The warm end of a mired range is its maximum.
    let (min, max) = kelvin.or_else(|| {
        match (number(ATTR_MAX_MIREDS), number(ATTR_MIN_MIREDS)) {
            (Some(max_mireds), Some(min_mireds)) => {
                Kelvin::from_mireds(max_mireds).zip(Kelvin::from_mireds(min_mireds))
            }
            _ => None,
        }
    })?;

    let range = KelvinRange::new(min, max);
    range.is_valid().then_some(range)
}
