//! Group configuration and the typed member form.
//!
//! Configuration arrives from the host as loosely typed JSON (entry data plus
//! entry options). Parsing never fails on a bad value: anything malformed is
//! replaced by its default so the group keeps serving the remaining children.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::capabilities::CapabilitySummary;
use crate::errors::Error;
use crate::types::{Brightness, BrightnessWindow, ScaleFactor};

type Result<T> = std::result::Result<T, Error>;

pub const DOMAIN: &str = "relative_light_group";
pub const DEFAULT_NAME: &str = "Relative Light Group";

pub const CONF_NAME: &str = "name";
pub const CONF_UNIQUE_ID: &str = "unique_id";
pub const CONF_ENTITIES: &str = "entities";
pub const CONF_FACTORS: &str = "factors";
pub const CONF_MIN: &str = "min";
pub const CONF_MAX: &str = "max";
pub const CONF_FORWARD_CT: &str = "forward_color_temp";
pub const CONF_FORWARD_COLOR: &str = "forward_color";

/// Settings for one child light.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberConfig {
    pub entity_id: String,
    #[serde(default)]
    pub factor: ScaleFactor,
    #[serde(default)]
    pub window: BrightnessWindow,
}

impl MemberConfig {
    /// A member with factor 1.0 and the full brightness window.
    pub fn new(entity_id: &str) -> Self {
        MemberConfig {
            entity_id: entity_id.to_string(),
            factor: ScaleFactor::new(),
            window: BrightnessWindow::new(),
        }
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = ScaleFactor::create_or(factor);
        self
    }

    pub fn with_window(mut self, min: i64, max: i64) -> Self {
        self.window = BrightnessWindow::create(min, max);
        self
    }
}

/// Configuration of a relative light group.
///
/// ```
/// use relative_light_group::GroupConfig;
/// use serde_json::json;
///
/// let config = GroupConfig::from_value(&json!({
///     "name": "Sofa",
///     "entities": ["light.left", {"entity_id": "light.right"}, ""],
///     "factors": {"light.left": 0.5, "light.right": "oops"},
///     "max": {"light.left": 300},
///     "forward_color_temp": true,
/// }));
///
/// assert_eq!(config.name, "Sofa");
/// assert_eq!(config.members.len(), 2);
/// assert_eq!(config.members[0].factor.value(), 0.5);
/// assert_eq!(config.members[0].window.max(), 254);
/// assert_eq!(config.members[1].factor.value(), 1.0);
/// assert!(config.forward_ct);
/// assert!(!config.forward_color);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberConfig>,
    #[serde(default)]
    pub forward_ct: bool,
    #[serde(default)]
    pub forward_color: bool,
}

impl GroupConfig {
    pub fn new(name: &str) -> Self {
        GroupConfig {
            name: name.to_string(),
            unique_id: None,
            members: Vec::new(),
            forward_ct: false,
            forward_color: false,
        }
    }

    /// Append a member. A member with an id already present replaces it.
    pub fn with_member(mut self, member: MemberConfig) -> Self {
        match self
            .members
            .iter_mut()
            .find(|m| m.entity_id == member.entity_id)
        {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
        self
    }

    pub fn with_unique_id(mut self, unique_id: &str) -> Self {
        self.unique_id = Some(unique_id.to_string());
        self
    }

    pub fn forward_color_temp(mut self, enabled: bool) -> Self {
        self.forward_ct = enabled;
        self
    }

    pub fn forward_color(mut self, enabled: bool) -> Self {
        self.forward_color = enabled;
        self
    }

    /// Parse entry data in the host's format.
    pub fn from_value(data: &Value) -> Self {
        let empty = Map::new();
        let data = data.as_object().unwrap_or(&empty);

        let name = data
            .get(CONF_NAME)
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NAME);
        let unique_id = data
            .get(CONF_UNIQUE_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from);

        let entities = data
            .get(CONF_ENTITIES)
            .map(normalize_entities)
            .unwrap_or_default();
        let factors = object_or_empty(data.get(CONF_FACTORS));
        let mins = object_or_empty(data.get(CONF_MIN));
        let maxs = object_or_empty(data.get(CONF_MAX));

        let members = entities
            .iter()
            .map(|entity_id| {
                let factor = factors
                    .get(entity_id)
                    .and_then(lenient_f64)
                    .and_then(ScaleFactor::create)
                    .unwrap_or_default();
                let min = mins
                    .get(entity_id)
                    .and_then(lenient_i64)
                    .unwrap_or(i64::from(Brightness::MIN));
                let max = maxs
                    .get(entity_id)
                    .and_then(lenient_i64)
                    .unwrap_or(i64::from(Brightness::MAX));
                MemberConfig {
                    entity_id: entity_id.clone(),
                    factor,
                    window: BrightnessWindow::create(min, max),
                }
            })
            .collect();

        GroupConfig {
            name: name.to_string(),
            unique_id,
            members,
            forward_ct: data.get(CONF_FORWARD_CT).is_some_and(lenient_bool),
            forward_color: data.get(CONF_FORWARD_COLOR).is_some_and(lenient_bool),
        }
    }

    /// Parse entry data with entry options layered on top, key by key.
    ///
    /// ```
    /// use relative_light_group::GroupConfig;
    /// use serde_json::json;
    ///
    /// let data = json!({"name": "Desk", "entities": ["light.a"], "forward_color": true});
    /// let options = json!({"entities": ["light.a", "light.b"]});
    ///
    /// let config = GroupConfig::from_entry(&data, &options);
    /// assert_eq!(config.name, "Desk");
    /// assert_eq!(config.members.len(), 2);
    /// assert!(config.forward_color);
    /// ```
    pub fn from_entry(data: &Value, options: &Value) -> Self {
        let mut merged = data.as_object().cloned().unwrap_or_default();
        if let Some(options) = options.as_object() {
            for (key, value) in options {
                merged.insert(key.clone(), value.clone());
            }
        }
        Self::from_value(&Value::Object(merged))
    }

    /// Parse a JSON document. Only a document that is not JSON is an error.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s).map_err(Error::JsonLoad)?;
        Ok(Self::from_value(&value))
    }

    /// Serialize back into the host's entry format.
    ///
    /// ```
    /// use relative_light_group::{GroupConfig, MemberConfig};
    ///
    /// let config = GroupConfig::new("Hall")
    ///     .with_member(MemberConfig::new("light.hall").with_factor(0.8).with_window(5, 200))
    ///     .forward_color_temp(true);
    /// assert_eq!(GroupConfig::from_value(&config.to_value()), config);
    /// ```
    pub fn to_value(&self) -> Value {
        let mut factors = Map::new();
        let mut mins = Map::new();
        let mut maxs = Map::new();
        for member in &self.members {
            factors.insert(member.entity_id.clone(), json!(member.factor.value()));
            mins.insert(member.entity_id.clone(), json!(member.window.min()));
            maxs.insert(member.entity_id.clone(), json!(member.window.max()));
        }

        let mut value = json!({
            CONF_NAME: self.name,
            CONF_ENTITIES: self.entity_ids().collect::<Vec<_>>(),
            CONF_FACTORS: factors,
            CONF_MIN: mins,
            CONF_MAX: maxs,
            CONF_FORWARD_CT: self.forward_ct,
            CONF_FORWARD_COLOR: self.forward_color,
        });
        if let Some(unique_id) = &self.unique_id {
            value[CONF_UNIQUE_ID] = json!(unique_id);
        }
        value
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.entity_id.as_str())
    }

    pub fn member(&self, entity_id: &str) -> Option<&MemberConfig> {
        self.members.iter().find(|m| m.entity_id == entity_id)
    }
}

/// Normalize the `entities` value of an entry into an ordered id list.
///
/// ```
/// use relative_light_group::normalize_entities;
/// use serde_json::json;
///
/// assert_eq!(normalize_entities(&json!("light.a")), ["light.a"]);
/// assert_eq!(
///     normalize_entities(&json!(["light.a", {"entity": "light.b"}, 5, "light.a"])),
///     ["light.a", "light.b"],
/// );
/// assert!(normalize_entities(&json!({"entity_id": "light.a"})).is_empty());
/// ```
pub fn normalize_entities(value: &Value) -> Vec<String> {
    let candidates: Vec<&str> = match value {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.as_str()),
                Value::Object(obj) => obj
                    .get("entity_id")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .or_else(|| obj.get("entity").and_then(Value::as_str)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(*id))
        .map(String::from)
        .collect()
}

/// Human-friendly label for a child.
///
/// Uses the host's name when known, otherwise derives one from the object id.
///
/// ```
/// use relative_light_group::friendly_name;
///
/// assert_eq!(friendly_name("light.living_room", None), "Living Room");
/// assert_eq!(friendly_name("light.living_room", Some("Couch")), "Couch");
/// assert_eq!(friendly_name("no_domain", None), "no_domain");
/// ```
pub fn friendly_name(entity_id: &str, host_name: Option<&str>) -> String {
    if let Some(name) = host_name.filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let Some((_, object_id)) = entity_id.split_once('.') else {
        return entity_id.to_string();
    };
    object_id
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Which per-child setting a form field edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Factor,
    Min,
    Max,
}

impl FieldKind {
    fn key_prefix(self) -> &'static str {
        match self {
            FieldKind::Factor => "factor",
            FieldKind::Min => "min",
            FieldKind::Max => "max",
        }
    }

    fn label_prefix(self) -> &'static str {
        match self {
            FieldKind::Factor => "Factor",
            FieldKind::Min => "Minimum",
            FieldKind::Max => "Maximum",
        }
    }
}

/// One generated field of the member form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Stable key, `<kind>:<entity_id>`.
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    pub entity_id: String,
    pub default: Value,
}

/// The per-child settings form.
///
/// Three fields are generated per child. Each key maps back to its
/// `(kind, entity_id)` target, so labels are free to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberForm {
    fields: Vec<FormField>,
}

impl MemberForm {
    /// Build the form for `entity_ids`, pre-filled from `current` where a
    /// child is already configured.
    ///
    /// `names` resolves the host's display name for a child.
    ///
    /// ```
    /// use relative_light_group::{GroupConfig, MemberConfig, MemberForm};
    /// use serde_json::json;
    ///
    /// let current = GroupConfig::new("g")
    ///     .with_member(MemberConfig::new("light.desk").with_factor(0.4));
    /// let ids = ["light.desk".to_string(), "light.shelf".to_string()];
    /// let form = MemberForm::build(&ids, &current, |_| None);
    ///
    /// assert_eq!(form.fields().len(), 6);
    /// assert_eq!(form.fields()[0].key, "factor:light.desk");
    /// assert_eq!(form.fields()[0].label, "Factor - Desk");
    ///
    /// let members = form.parse(&json!({"max:light.shelf": 90}));
    /// assert_eq!(members[0].factor.value(), 0.4);
    /// assert_eq!(members[1].window.max(), 90);
    /// ```
    pub fn build<F>(entity_ids: &[String], current: &GroupConfig, names: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut fields = Vec::with_capacity(entity_ids.len() * 3);
        for entity_id in entity_ids {
            let member = current
                .member(entity_id)
                .cloned()
                .unwrap_or_else(|| MemberConfig::new(entity_id));
            let label = friendly_name(entity_id, names(entity_id).as_deref());

            for (kind, default) in [
                (FieldKind::Factor, json!(member.factor.value())),
                (FieldKind::Min, json!(member.window.min())),
                (FieldKind::Max, json!(member.window.max())),
            ] {
                fields.push(FormField {
                    key: format!("{}:{}", kind.key_prefix(), entity_id),
                    label: format!("{} - {}", kind.label_prefix(), label),
                    kind,
                    entity_id: entity_id.clone(),
                    default,
                });
            }
        }
        MemberForm { fields }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Turn a submitted form into typed member settings, in form order.
    ///
    /// Missing or malformed fields keep the value the form was built with.
    pub fn parse(&self, input: &Value) -> Vec<MemberConfig> {
        let mut members: Vec<MemberConfig> = Vec::new();
        let mut windows: Vec<(i64, i64)> = Vec::new();

        for field in &self.fields {
            let index = match members.iter().position(|m| m.entity_id == field.entity_id) {
                Some(index) => index,
                None => {
                    members.push(MemberConfig::new(&field.entity_id));
                    windows.push((i64::from(Brightness::MIN), i64::from(Brightness::MAX)));
                    members.len() - 1
                }
            };

            let submitted = input.get(&field.key);
            match field.kind {
                FieldKind::Factor => {
                    let value = submitted
                        .and_then(lenient_f64)
                        .and_then(ScaleFactor::create)
                        .or_else(|| field.default.as_f64().and_then(ScaleFactor::create))
                        .unwrap_or_default();
                    members[index].factor = value;
                }
                FieldKind::Min => {
                    windows[index].0 = submitted
                        .and_then(lenient_i64)
                        .or_else(|| field.default.as_i64())
                        .unwrap_or(i64::from(Brightness::MIN));
                }
                FieldKind::Max => {
                    windows[index].1 = submitted
                        .and_then(lenient_i64)
                        .or_else(|| field.default.as_i64())
                        .unwrap_or(i64::from(Brightness::MAX));
                }
            }
        }

        for (member, (min, max)) in members.iter_mut().zip(windows) {
            member.window = BrightnessWindow::create(min, max);
        }
        members
    }
}

/// Global toggles an options editor should offer.
///
/// A forwarding toggle is only meaningful when some child can receive the
/// attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferedOptions {
    pub forward_ct: bool,
    pub forward_color: bool,
}

impl From<&CapabilitySummary> for OfferedOptions {
    fn from(summary: &CapabilitySummary) -> Self {
        OfferedOptions {
            forward_ct: summary.any_ct,
            forward_color: summary.any_color,
        }
    }
}

fn object_or_empty(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            debug!("ignoring non-map config value {other}");
            Map::new()
        }
        None => Map::new(),
    }
}

fn lenient_f64(value: &Value) -> Option<f64> {
    let parsed: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "on" | "1"),
        _ => false,
    }
}
