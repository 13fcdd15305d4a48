//! Turn-on requests received by the group.

use serde_json::Value;

use crate::types::{HueSaturation, Kelvin, Transition};

pub const ATTR_BRIGHTNESS: &str = "brightness";
pub const ATTR_COLOR_TEMP_KELVIN: &str = "color_temp_kelvin";
pub const ATTR_KELVIN: &str = "kelvin";
pub const ATTR_COLOR_TEMP: &str = "color_temp";
pub const ATTR_HS_COLOR: &str = "hs_color";
pub const ATTR_TRANSITION: &str = "transition";

/// Parameters of a turn-on command addressed to the group.
///
/// Brightness is kept as requested; the group clamps it into 1-254 when it
/// records the value.
///
/// ```
/// use relative_light_group::{Kelvin, TurnOnRequest};
///
/// let mut request = TurnOnRequest::new();
/// request.brightness(300).mireds(250.0);
/// assert_eq!(request.get_brightness(), Some(300));
/// assert_eq!(request.kelvin(), Kelvin::create(4000));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOnRequest {
    pub(crate) brightness: Option<i64>,
    pub(crate) color_temp: Option<Kelvin>,
    pub(crate) hs_color: Option<HueSaturation>,
    pub(crate) transition: Option<Transition>,
}

impl TurnOnRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn brightness(&mut self, brightness: i64) -> &mut Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn color_temp(&mut self, kelvin: Kelvin) -> &mut Self {
        self.color_temp = Some(kelvin);
        self
    }

    /// Set the color temperature from a legacy mired value. Values that do
    /// not convert to a valid temperature are ignored.
    pub fn mireds(&mut self, mireds: f64) -> &mut Self {
        if let Some(kelvin) = Kelvin::from_mireds(mireds) {
            self.color_temp = Some(kelvin);
        }
        self
    }

    pub fn hue_saturation(&mut self, hs: HueSaturation) -> &mut Self {
        self.hs_color = Some(hs);
        self
    }

    pub fn transition(&mut self, transition: Transition) -> &mut Self {
        self.transition = Some(transition);
        self
    }

    pub fn get_brightness(&self) -> Option<i64> {
        self.brightness
    }

    pub fn kelvin(&self) -> Option<Kelvin> {
        self.color_temp
    }

    pub fn get_hue_saturation(&self) -> Option<HueSaturation> {
        self.hs_color
    }

    pub fn get_transition(&self) -> Option<Transition> {
        self.transition
    }

    /// Build a request from platform service data.
    ///
    /// Kelvin keys win over the legacy mired `color_temp`. Unusable values
    /// are dropped.
    ///
    /// ```
    /// use relative_light_group::TurnOnRequest;
    /// use serde_json::json;
    ///
    /// let request = TurnOnRequest::from_service_data(&json!({
    ///     "brightness": 128,
    ///     "color_temp": 370,
    ///     "hs_color": [30, 90],
    ///     "transition": 2,
    /// }));
    /// assert_eq!(request.get_brightness(), Some(128));
    /// assert_eq!(request.kelvin().unwrap().kelvin(), 2703);
    /// assert_eq!(request.get_hue_saturation().unwrap().hue(), 30.0);
    /// assert_eq!(request.get_transition().unwrap().seconds(), 2.0);
    /// ```
    pub fn from_service_data(data: &Value) -> Self {
        let mut request = TurnOnRequest::new();
        let number = |key: &str| data.get(key).and_then(Value::as_f64);

        if let Some(brightness) = number(ATTR_BRIGHTNESS).filter(|b| b.is_finite()) {
            request.brightness(brightness.round() as i64);
        }

        let kelvin = number(ATTR_COLOR_TEMP_KELVIN)
            .or_else(|| number(ATTR_KELVIN))
            .and_then(Kelvin::from_f64);
        match kelvin {
            Some(kelvin) => {
                request.color_temp(kelvin);
            }
            None => {
                if let Some(mireds) = number(ATTR_COLOR_TEMP) {
                    request.mireds(mireds);
                }
            }
        }

        if let Some(hs) = data
            .get(ATTR_HS_COLOR)
            .and_then(|v| serde_json::from_value::<HueSaturation>(v.clone()).ok())
        {
            request.hue_saturation(hs);
        }

        if let Some(transition) = number(ATTR_TRANSITION).and_then(Transition::create) {
            request.transition(transition);
        }

        request
    }
}
