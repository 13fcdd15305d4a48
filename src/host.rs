//! Interfaces to the automation platform hosting the group.
//!
//! The group never talks to devices itself. It reads child snapshots,
//! dispatches service calls, restores its previous state and publishes its
//! own state through the traits in this module. A host adapter implements
//! all four; [`Host`] is implemented automatically for any type that does.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Error;
use crate::payload::ServiceCall;
use crate::status::{GroupState, RestoredState};

type Result<T> = std::result::Result<T, Error>;

/// State string the platform uses for a light that is on.
pub const STATE_ON: &str = "on";

/// Last known state of a child light as held by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildSnapshot {
    pub entity_id: String,
    pub state: String,
    /// Display name, when the host knows one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ChildSnapshot {
    pub fn new(entity_id: &str, state: &str) -> Self {
        ChildSnapshot {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            name: None,
            attributes: Map::new(),
        }
    }

    /// Attach an attribute, builder style.
    ///
    /// ```
    /// use relative_light_group::ChildSnapshot;
    /// use serde_json::json;
    ///
    /// let child = ChildSnapshot::new("light.desk", "on")
    ///     .with_attribute("supported_color_modes", json!(["color_temp"]));
    /// assert!(child.is_on());
    /// assert!(child.attributes.contains_key("supported_color_modes"));
    /// ```
    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn is_on(&self) -> bool {
        self.state == STATE_ON
    }
}

/// Notification that a child's state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanged {
    pub entity_id: String,
}

impl StateChanged {
    pub fn new(entity_id: &str) -> Self {
        StateChanged {
            entity_id: entity_id.to_string(),
        }
    }
}

/// Lookup of the host's last known child states.
pub trait StateSource {
    /// Returns `None` for entities the host does not know.
    fn snapshot(&self, entity_id: &str) -> Option<ChildSnapshot>;
}

/// Outbound command dispatch.
pub trait ServiceDispatcher {
    /// Send one service call. Resolves once the host has accepted or
    /// rejected it; the group never waits for device acknowledgement.
    fn call(&self, call: ServiceCall) -> impl Future<Output = Result<()>> + Send;
}

/// Access to state persisted before a restart.
pub trait RestoreStore {
    fn last_state(&self, unique_id: &str) -> impl Future<Output = Option<RestoredState>> + Send;
}

/// Writes the group's state back to the host.
pub trait StatePublisher {
    fn publish(&self, state: &GroupState);
}

/// Everything a [`crate::RelativeLightGroup`] needs from its host.
pub trait Host: StateSource + ServiceDispatcher + RestoreStore + StatePublisher {}

impl<T> Host for T where T: StateSource + ServiceDispatcher + RestoreStore + StatePublisher {}

impl<T: StateSource> StateSource for Arc<T> {
    fn snapshot(&self, entity_id: &str) -> Option<ChildSnapshot> {
        (**self).snapshot(entity_id)
    }
}

impl<T: ServiceDispatcher> ServiceDispatcher for Arc<T> {
    fn call(&self, call: ServiceCall) -> impl Future<Output = Result<()>> + Send {
        (**self).call(call)
    }
}

impl<T: RestoreStore> RestoreStore for Arc<T> {
    fn last_state(&self, unique_id: &str) -> impl Future<Output = Option<RestoredState>> + Send {
        (**self).last_state(unique_id)
    }
}

impl<T: StatePublisher> StatePublisher for Arc<T> {
    fn publish(&self, state: &GroupState) {
        (**self).publish(state)
    }
}
