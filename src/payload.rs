//! Service calls sent to child lights.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{AsRefStr, Display};

use crate::errors::Error;
use crate::types::{Brightness, HueSaturation, Kelvin, Transition};

/// Domain every child service call is addressed to.
pub const LIGHT_DOMAIN: &str = "light";

/// The light services the group invokes on its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Service {
    TurnOn,
    TurnOff,
}

/// Attributes carried by a child command.
///
/// ```
/// use relative_light_group::{Brightness, CommandPayload, Kelvin};
///
/// let mut payload = CommandPayload::new();
/// assert!(payload.is_empty());
///
/// payload.brightness(&Brightness::create(127).unwrap());
/// payload.color_temp(&Kelvin::create(2700).unwrap());
/// assert_eq!(
///     serde_json::to_string(&payload).unwrap(),
///     r#"{"brightness":127,"color_temp_kelvin":2700}"#,
/// );
/// ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CommandPayload {
    pub(crate) brightness: Option<Brightness>,
    pub(crate) transition: Option<Transition>,
    #[serde(rename = "color_temp_kelvin")]
    pub(crate) color_temp: Option<Kelvin>,
    pub(crate) hs_color: Option<HueSaturation>,
}

impl CommandPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.brightness.is_none()
            && self.transition.is_none()
            && self.color_temp.is_none()
            && self.hs_color.is_none()
    }

    pub fn brightness(&mut self, brightness: &Brightness) {
        self.brightness = Some(*brightness);
    }

    pub fn transition(&mut self, transition: &Transition) {
        self.transition = Some(*transition);
    }

    pub fn color_temp(&mut self, kelvin: &Kelvin) {
        self.color_temp = Some(*kelvin);
    }

    pub fn hue_saturation(&mut self, hs: &HueSaturation) {
        self.hs_color = Some(*hs);
    }

    pub fn get_brightness(&self) -> Option<Brightness> {
        self.brightness
    }

    pub fn get_transition(&self) -> Option<Transition> {
        self.transition
    }

    pub fn get_color_temp(&self) -> Option<Kelvin> {
        self.color_temp
    }

    pub fn get_hue_saturation(&self) -> Option<HueSaturation> {
        self.hs_color
    }
}

impl From<&Brightness> for CommandPayload {
    fn from(brightness: &Brightness) -> Self {
        let mut p = CommandPayload::new();
        p.brightness(brightness);
        p
    }
}

impl From<&Transition> for CommandPayload {
    fn from(transition: &Transition) -> Self {
        let mut p = CommandPayload::new();
        p.transition(transition);
        p
    }
}

/// A single service call addressed to one or more child lights.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceCall {
    #[serde(skip)]
    pub service: Service,
    #[serde(rename = "entity_id")]
    pub targets: Vec<String>,
    #[serde(flatten)]
    pub payload: CommandPayload,
}

impl ServiceCall {
    pub fn turn_on(entity_id: &str, payload: CommandPayload) -> Self {
        ServiceCall {
            service: Service::TurnOn,
            targets: vec![entity_id.to_string()],
            payload,
        }
    }

    pub fn turn_off(targets: Vec<String>, payload: CommandPayload) -> Self {
        ServiceCall {
            service: Service::TurnOff,
            targets,
            payload,
        }
    }

    pub fn domain(&self) -> &'static str {
        LIGHT_DOMAIN
    }

    /// The call's data in the platform's service-data shape.
    ///
    /// ```
    /// use relative_light_group::{Brightness, CommandPayload, ServiceCall};
    /// use serde_json::json;
    ///
    /// let call = ServiceCall::turn_on(
    ///     "light.desk",
    ///     CommandPayload::from(&Brightness::create(80).unwrap()),
    /// );
    /// assert_eq!(
    ///     call.service_data().unwrap(),
    ///     json!({"entity_id": ["light.desk"], "brightness": 80}),
    /// );
    /// ```
    pub fn service_data(&self) -> Result<Value, Error> {
        serde_json::to_value(self).map_err(Error::JsonDump)
    }
}
