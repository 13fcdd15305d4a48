//! Master state of the group and the state it publishes.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::capabilities::GroupCapabilities;
use crate::host::STATE_ON;
use crate::request::{ATTR_COLOR_TEMP, ATTR_COLOR_TEMP_KELVIN, ATTR_HS_COLOR, TurnOnRequest};
use crate::types::{Brightness, ColorMode, HueSaturation, Kelvin};

pub const ATTR_MASTER_BRIGHTNESS: &str = "master_brightness";

/// Platform feature bit for lights that accept a transition.
pub const FEATURE_TRANSITION: u32 = 32;

/// Order in which unsupported color modes degrade.
const MODE_FALLBACK: [ColorMode; 3] = [ColorMode::Hs, ColorMode::ColorTemp, ColorMode::Brightness];

/// Pick the mode to report, walking down `HS -> COLOR_TEMP -> BRIGHTNESS`
/// from `preferred` until a supported one is found.
///
/// ```
/// use std::collections::BTreeSet;
/// use relative_light_group::{select_color_mode, ColorMode};
///
/// let supported = BTreeSet::from([ColorMode::Brightness, ColorMode::ColorTemp]);
/// assert_eq!(select_color_mode(ColorMode::Hs, &supported), ColorMode::ColorTemp);
/// assert_eq!(select_color_mode(ColorMode::ColorTemp, &supported), ColorMode::ColorTemp);
///
/// let supported = BTreeSet::from([ColorMode::Brightness, ColorMode::Hs]);
/// assert_eq!(select_color_mode(ColorMode::ColorTemp, &supported), ColorMode::Brightness);
/// ```
pub fn select_color_mode(preferred: ColorMode, supported: &BTreeSet<ColorMode>) -> ColorMode {
    let start = MODE_FALLBACK
        .iter()
        .position(|mode| *mode == preferred)
        .unwrap_or(MODE_FALLBACK.len() - 1);
    MODE_FALLBACK[start..]
        .iter()
        .copied()
        .find(|mode| supported.contains(mode))
        .unwrap_or(ColorMode::Brightness)
}

/// In-memory state owned by the group entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterState {
    pub(crate) is_on: bool,
    pub(crate) brightness: Brightness,
    pub(crate) color_temp: Option<Kelvin>,
    pub(crate) hs_color: Option<HueSaturation>,
    pub(crate) color_mode: ColorMode,
}

impl MasterState {
    /// Off, full master brightness, nothing forwarded yet.
    pub fn new() -> Self {
        MasterState {
            is_on: false,
            brightness: Brightness::new(),
            color_temp: None,
            hs_color: None,
            color_mode: ColorMode::Brightness,
        }
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    /// Last recorded color temperature.
    pub fn color_temp(&self) -> Option<Kelvin> {
        self.color_temp
    }

    /// Last recorded hue/saturation pair.
    pub fn hue_saturation(&self) -> Option<HueSaturation> {
        self.hs_color
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    /// Record the values of a turn-on request and switch the reported color
    /// mode for any forwarded attribute it carries.
    pub(crate) fn record(
        &mut self,
        request: &TurnOnRequest,
        forward_ct: bool,
        forward_color: bool,
        capabilities: &GroupCapabilities,
    ) {
        if let Some(brightness) = request.brightness {
            self.brightness = Brightness::clamped(brightness);
        }
        if let Some(kelvin) = request.color_temp {
            self.color_temp = Some(kelvin);
        }
        if let Some(hs) = request.hs_color {
            self.hs_color = Some(hs);
        }

        let wants_hs = forward_color && request.hs_color.is_some();
        let wants_ct = forward_ct && request.color_temp.is_some();
        self.switch_mode(wants_hs, wants_ct, capabilities);
    }

    /// Load the values persisted before a restart.
    pub(crate) fn restore(
        &mut self,
        restored: &RestoredState,
        forward_ct: bool,
        forward_color: bool,
        capabilities: &GroupCapabilities,
    ) {
        self.is_on = restored.is_on();
        if let Some(brightness) = restored.master_brightness() {
            self.brightness = brightness;
        }
        self.color_temp = restored.color_temp();
        self.hs_color = restored.hue_saturation();

        let wants_hs = forward_color && self.hs_color.is_some();
        let wants_ct = forward_ct && self.color_temp.is_some();
        self.switch_mode(wants_hs, wants_ct, capabilities);
    }

    fn switch_mode(&mut self, wants_hs: bool, wants_ct: bool, capabilities: &GroupCapabilities) {
        let preferred = if wants_hs {
            ColorMode::Hs
        } else if wants_ct {
            ColorMode::ColorTemp
        } else {
            return;
        };
        self.color_mode = select_color_mode(preferred, capabilities.supported_color_modes());
    }
}

impl Default for MasterState {
    fn default() -> Self {
        Self::new()
    }
}

/// State persisted by the host before a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoredState {
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl RestoredState {
    pub fn new(state: &str, attributes: Map<String, Value>) -> Self {
        RestoredState {
            state: state.to_string(),
            attributes,
        }
    }

    pub fn is_on(&self) -> bool {
        self.state == STATE_ON
    }

    pub fn master_brightness(&self) -> Option<Brightness> {
        self.attributes
            .get(ATTR_MASTER_BRIGHTNESS)
            .and_then(Value::as_f64)
            .filter(|b| b.is_finite())
            .map(|b| Brightness::clamped(b.round() as i64))
    }

    /// Kelvin attribute, or the legacy mired one converted.
    pub fn color_temp(&self) -> Option<Kelvin> {
        let number = |key: &str| self.attributes.get(key).and_then(Value::as_f64);
        number(ATTR_COLOR_TEMP_KELVIN)
            .and_then(Kelvin::from_f64)
            .or_else(|| number(ATTR_COLOR_TEMP).and_then(Kelvin::from_mireds))
    }

    pub fn hue_saturation(&self) -> Option<HueSaturation> {
        self.attributes
            .get(ATTR_HS_COLOR)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

impl From<&GroupState> for RestoredState {
    fn from(state: &GroupState) -> Self {
        let attributes = match serde_json::to_value(state) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        RestoredState {
            state: state.state().to_string(),
            attributes,
        }
    }
}

/// Snapshot of the group as published to the host.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub is_on: bool,
    pub available: bool,
    /// Present only while the group is on.
    pub brightness: Option<Brightness>,
    pub color_mode: ColorMode,
    pub supported_color_modes: BTreeSet<ColorMode>,
    /// Platform feature bits; the group always forwards transitions.
    pub supported_features: u32,
    pub color_temp_kelvin: Option<Kelvin>,
    pub hs_color: Option<HueSaturation>,
    pub min_color_temp_kelvin: Option<Kelvin>,
    pub max_color_temp_kelvin: Option<Kelvin>,
    pub master_brightness: Brightness,
    pub factors: BTreeMap<String, f64>,
    pub min: BTreeMap<String, u8>,
    pub max: BTreeMap<String, u8>,
}

impl GroupState {
    /// The platform state string, `"on"` or `"off"`.
    pub fn state(&self) -> &'static str {
        if self.is_on { STATE_ON } else { "off" }
    }

    pub fn supports_transition(&self) -> bool {
        self.supported_features & FEATURE_TRANSITION != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ChildCapabilities;
    use serde_json::json;

    fn full_caps() -> GroupCapabilities {
        let child = ChildCapabilities {
            supports_ct: true,
            supports_color: true,
            kelvin_range: None,
        };
        GroupCapabilities::finalize(&[child], true, true)
    }

    #[test]
    fn test_record_clamps_brightness() {
        let mut state = MasterState::new();
        let mut request = TurnOnRequest::new();
        request.brightness(0);
        state.record(&request, false, false, &full_caps());
        assert_eq!(state.brightness().value(), 1);

        request.brightness(1000);
        state.record(&request, false, false, &full_caps());
        assert_eq!(state.brightness().value(), 254);
    }

    #[test]
    fn test_record_without_brightness_keeps_master() {
        let mut state = MasterState::new();
        let mut request = TurnOnRequest::new();
        request.brightness(40);
        state.record(&request, false, false, &full_caps());
        state.record(&TurnOnRequest::new(), false, false, &full_caps());
        assert_eq!(state.brightness().value(), 40);
    }

    #[test]
    fn test_hs_preferred_over_ct() {
        let mut state = MasterState::new();
        let mut request = TurnOnRequest::new();
        request
            .color_temp(Kelvin::create(3000).unwrap())
            .hue_saturation(HueSaturation::create(10.0, 20.0).unwrap());
        state.record(&request, true, true, &full_caps());
        assert_eq!(state.color_mode(), ColorMode::Hs);
    }

    #[test]
    fn test_mode_unchanged_when_not_forwarding() {
        let mut state = MasterState::new();
        let mut request = TurnOnRequest::new();
        request.color_temp(Kelvin::create(3000).unwrap());
        state.record(&request, false, true, &full_caps());
        assert_eq!(state.color_mode(), ColorMode::Brightness);
        assert_eq!(state.color_temp(), Kelvin::create(3000));
    }

    #[test]
    fn test_mode_falls_back_when_unsupported() {
        let mut state = MasterState::new();
        let mut request = TurnOnRequest::new();
        request.color_temp(Kelvin::create(3000).unwrap());
        state.record(&request, true, false, &GroupCapabilities::brightness_only());
        assert_eq!(state.color_mode(), ColorMode::Brightness);
    }

    #[test]
    fn test_restore_reads_attributes() {
        let attributes = json!({
            "master_brightness": 300,
            "color_temp": 250,
            "hs_color": [120.0, 50.0],
        });
        let restored = RestoredState::new("on", attributes.as_object().unwrap().clone());

        let mut state = MasterState::new();
        state.restore(&restored, true, false, &full_caps());
        assert!(state.is_on());
        assert_eq!(state.brightness().value(), 254);
        assert_eq!(state.color_temp(), Kelvin::create(4000));
        assert_eq!(state.hue_saturation(), HueSaturation::create(120.0, 50.0));
        assert_eq!(state.color_mode(), ColorMode::ColorTemp);
    }

    #[test]
    fn test_restore_from_published_state() {
        let published = GroupState {
            is_on: false,
            available: true,
            brightness: None,
            color_mode: ColorMode::Brightness,
            supported_color_modes: BTreeSet::from([ColorMode::Brightness]),
            supported_features: FEATURE_TRANSITION,
            color_temp_kelvin: Kelvin::create(2700),
            hs_color: None,
            min_color_temp_kelvin: None,
            max_color_temp_kelvin: None,
            master_brightness: Brightness::create(90).unwrap(),
            factors: BTreeMap::new(),
            min: BTreeMap::new(),
            max: BTreeMap::new(),
        };
        let restored = RestoredState::from(&published);
        assert!(!restored.is_on());
        assert_eq!(restored.master_brightness(), Brightness::create(90));
        assert_eq!(restored.color_temp(), Kelvin::create(2700));
        assert!(restored.hue_saturation().is_none());
    }
}
