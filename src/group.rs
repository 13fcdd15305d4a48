//! The relative light group entity.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::capabilities::{ChildCapabilities, GroupCapabilities};
use crate::config::{DOMAIN, GroupConfig, MemberConfig};
use crate::distributor;
use crate::errors::Error;
use crate::host::{Host, StateChanged};
use crate::request::TurnOnRequest;
use crate::response::DispatchReport;
use crate::status::{FEATURE_TRANSITION, GroupState, MasterState};
use crate::types::{Brightness, BrightnessWindow, ScaleFactor, Transition};

type Result<T> = std::result::Result<T, Error>;

/// A child light and everything the group knows about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub entity_id: String,
    pub factor: ScaleFactor,
    pub window: BrightnessWindow,
    /// Fixed when the group is attached.
    pub capabilities: ChildCapabilities,
}

impl From<MemberConfig> for Member {
    fn from(config: MemberConfig) -> Self {
        Member {
            entity_id: config.entity_id,
            factor: config.factor,
            window: config.window,
            capabilities: ChildCapabilities::default(),
        }
    }
}

/// Device registry entry for the group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub name: String,
}

/// A virtual light driving its children proportionally.
///
/// The group owns its master state. Turning it on records the requested
/// brightness and colors, publishes the new state and then sends one command
/// per child; turning it off sends a single command to all children.
///
/// The exposed color modes are decided once in [`RelativeLightGroup::attach`]
/// and never change afterwards, even if the children's capabilities do.
pub struct RelativeLightGroup<H> {
    host: H,
    name: String,
    unique_id: String,
    members: Vec<Member>,
    forward_ct: bool,
    forward_color: bool,
    capabilities: GroupCapabilities,
    master: MasterState,
    attached: bool,
}

impl<H: Host> RelativeLightGroup<H> {
    /// Create the entity. It exposes brightness only until attached.
    pub fn new(config: GroupConfig, host: H) -> Self {
        let unique_id = config
            .unique_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        if config.members.is_empty() {
            info!("{}: no children configured, marking unavailable", config.name);
        }

        RelativeLightGroup {
            host,
            name: config.name,
            unique_id,
            members: config.members.into_iter().map(Member::from).collect(),
            forward_ct: config.forward_ct,
            forward_color: config.forward_color,
            capabilities: GroupCapabilities::brightness_only(),
            master: MasterState::new(),
            attached: false,
        }
    }

    /// Attach to the host: fix capabilities, restore the previous state and
    /// publish. Calling it again has no effect.
    pub async fn attach(&mut self) {
        if self.attached {
            debug!("{}: already attached", self.name);
            return;
        }

        for member in &mut self.members {
            let snapshot = self.host.snapshot(&member.entity_id);
            member.capabilities = ChildCapabilities::from_snapshot(snapshot.as_ref());
        }
        let children: Vec<ChildCapabilities> =
            self.members.iter().map(|m| m.capabilities).collect();
        self.capabilities =
            GroupCapabilities::finalize(&children, self.forward_ct, self.forward_color);

        if let Some(restored) = self.host.last_state(&self.unique_id).await {
            debug!("{}: restoring {:?}", self.name, restored);
            self.master.restore(
                &restored,
                self.forward_ct,
                self.forward_color,
                &self.capabilities,
            );
        }

        self.attached = true;
        self.publish();
    }

    /// Children the host should deliver state changes for.
    pub fn tracked_entities(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.entity_id.as_str())
    }

    /// Recompute the on/off state after a child changed.
    ///
    /// Returns `false` and does nothing for entities outside the group.
    pub fn handle_state_changed(&mut self, event: &StateChanged) -> bool {
        if !self.is_member(&event.entity_id) {
            return false;
        }
        self.master.is_on = self.members.iter().any(|m| {
            self.host
                .snapshot(&m.entity_id)
                .is_some_and(|snapshot| snapshot.is_on())
        });
        self.publish();
        true
    }

    /// Turn the group on, then drive every child.
    pub async fn turn_on(&mut self, request: TurnOnRequest) -> DispatchReport {
        self.master.record(
            &request,
            self.forward_ct,
            self.forward_color,
            &self.capabilities,
        );
        let calls = distributor::turn_on_calls(
            &self.members,
            &self.master,
            self.forward_ct,
            self.forward_color,
            request.transition,
        );

        self.master.is_on = true;
        self.publish();

        distributor::dispatch(&self.host, calls).await
    }

    /// Turn every child off with one batched call.
    pub async fn turn_off(&mut self, transition: Option<Transition>) -> DispatchReport {
        self.master.is_on = false;
        self.publish();

        let calls = distributor::turn_off_call(&self.members, transition)
            .into_iter()
            .collect();
        distributor::dispatch(&self.host, calls).await
    }

    /// Re-send the current master brightness and forwarded colors to every
    /// child without changing the master state.
    pub async fn apply(&self, transition: Option<Transition>) -> DispatchReport {
        let calls = distributor::turn_on_calls(
            &self.members,
            &self.master,
            self.forward_ct,
            self.forward_color,
            transition,
        );
        distributor::dispatch(&self.host, calls).await
    }

    /// Change a child's scale factor. Invalid factors become 1.0.
    pub fn set_factor(&mut self, entity_id: &str, factor: f64) -> Result<()> {
        let member = self.member_mut(entity_id)?;
        member.factor = ScaleFactor::create_or(factor);
        self.publish();
        Ok(())
    }

    /// Change a child's brightness window; both ends are clamped to 1-254.
    pub fn set_min_max(&mut self, entity_id: &str, min: i64, max: i64) -> Result<()> {
        let member = self.member_mut(entity_id)?;
        member.window = BrightnessWindow::create(min, max);
        self.publish();
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn is_on(&self) -> bool {
        self.master.is_on
    }

    /// Unavailable when no children are configured.
    pub fn is_available(&self) -> bool {
        !self.members.is_empty()
    }

    /// Master brightness while on.
    pub fn brightness(&self) -> Option<Brightness> {
        self.master.is_on.then_some(self.master.brightness)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn master(&self) -> &MasterState {
        &self.master
    }

    pub fn capabilities(&self) -> &GroupCapabilities {
        &self.capabilities
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            identifiers: vec![(DOMAIN.to_string(), self.unique_id.clone())],
            name: self.name.clone(),
        }
    }

    /// Current state in the shape published to the host.
    pub fn state(&self) -> GroupState {
        let range = self.capabilities.advertised_kelvin_range();
        GroupState {
            is_on: self.master.is_on,
            available: self.is_available(),
            brightness: self.brightness(),
            color_mode: self.master.color_mode,
            supported_color_modes: self.capabilities.supported_color_modes().clone(),
            supported_features: FEATURE_TRANSITION,
            color_temp_kelvin: self.master.color_temp,
            hs_color: self.master.hs_color,
            min_color_temp_kelvin: range.map(|r| r.min),
            max_color_temp_kelvin: range.map(|r| r.max),
            master_brightness: self.master.brightness,
            factors: self
                .members
                .iter()
                .map(|m| (m.entity_id.clone(), m.factor.value()))
                .collect(),
            min: self.window_map(BrightnessWindow::min),
            max: self.window_map(BrightnessWindow::max),
        }
    }

    /// Returns diagnostics including state, members and capabilities.
    pub fn diagnostics(&self) -> Value {
        json!({
            "name": self.name,
            "unique_id": self.unique_id,
            "attached": self.attached,
            "forward_color_temp": self.forward_ct,
            "forward_color": self.forward_color,
            "state": serde_json::to_value(self.state()).unwrap_or(Value::Null),
            "members": serde_json::to_value(&self.members).unwrap_or(Value::Null),
            "capabilities": serde_json::to_value(&self.capabilities).unwrap_or(Value::Null),
        })
    }

    fn is_member(&self, entity_id: &str) -> bool {
        self.members.iter().any(|m| m.entity_id == entity_id)
    }

    fn member_mut(&mut self, entity_id: &str) -> Result<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.entity_id == entity_id)
            .ok_or_else(|| Error::UnknownChild(entity_id.to_string()))
    }

    fn window_map(&self, bound: fn(&BrightnessWindow) -> u8) -> BTreeMap<String, u8> {
        self.members
            .iter()
            .map(|m| (m.entity_id.clone(), bound(&m.window)))
            .collect()
    }

    fn publish(&self) {
        self.host.publish(&self.state());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::Barrier;
    use tokio::time::timeout;

    use crate::host::{
        ChildSnapshot, RestoreStore, ServiceDispatcher, StatePublisher, StateSource,
    };
    use crate::payload::{Service, ServiceCall};
    use crate::status::RestoredState;
    use crate::types::{ColorMode, HueSaturation, Kelvin};

    #[derive(Default)]
    struct MockHost {
        states: Mutex<HashMap<String, ChildSnapshot>>,
        failing: HashSet<String>,
        restored: Option<RestoredState>,
        calls: Mutex<Vec<ServiceCall>>,
        published: Mutex<Vec<GroupState>>,
        on_when_called: Mutex<Vec<bool>>,
        barrier: Option<Barrier>,
    }

    impl MockHost {
        fn with_child(self, snapshot: ChildSnapshot) -> Self {
            self.states
                .lock()
                .unwrap()
                .insert(snapshot.entity_id.clone(), snapshot);
            self
        }

        fn set_state(&self, entity_id: &str, state: &str) {
            let mut states = self.states.lock().unwrap();
            let snapshot = states
                .entry(entity_id.to_string())
                .or_insert_with(|| ChildSnapshot::new(entity_id, state));
            snapshot.state = state.to_string();
        }

        fn calls(&self) -> Vec<ServiceCall> {
            self.calls.lock().unwrap().clone()
        }

        fn last_published(&self) -> GroupState {
            self.published.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StateSource for MockHost {
        fn snapshot(&self, entity_id: &str) -> Option<ChildSnapshot> {
            self.states.lock().unwrap().get(entity_id).cloned()
        }
    }

    impl ServiceDispatcher for MockHost {
        async fn call(&self, call: ServiceCall) -> Result<()> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            let is_on = self
                .published
                .lock()
                .unwrap()
                .last()
                .is_some_and(|s| s.is_on);
            self.on_when_called.lock().unwrap().push(is_on);

            let failed = call.targets.iter().any(|t| self.failing.contains(t));
            let service = call.service.to_string();
            let targets = call.targets.clone();
            self.calls.lock().unwrap().push(call);
            if failed {
                Err(Error::dispatch(&service, &targets, "unreachable"))
            } else {
                Ok(())
            }
        }
    }

    impl RestoreStore for MockHost {
        async fn last_state(&self, _unique_id: &str) -> Option<RestoredState> {
            self.restored.clone()
        }
    }

    impl StatePublisher for MockHost {
        fn publish(&self, state: &GroupState) {
            self.published.lock().unwrap().push(state.clone());
        }
    }

    fn ct_child(id: &str, min: u16, max: u16) -> ChildSnapshot {
        ChildSnapshot::new(id, "off")
            .with_attribute("supported_color_modes", json!(["color_temp"]))
            .with_attribute("min_color_temp_kelvin", json!(min))
            .with_attribute("max_color_temp_kelvin", json!(max))
    }

    fn color_child(id: &str) -> ChildSnapshot {
        ChildSnapshot::new(id, "off").with_attribute("supported_color_modes", json!(["hs"]))
    }

    fn dim_child(id: &str) -> ChildSnapshot {
        ChildSnapshot::new(id, "off")
            .with_attribute("supported_color_modes", json!(["brightness"]))
    }

    async fn attached(
        config: GroupConfig,
        host: MockHost,
    ) -> RelativeLightGroup<Arc<MockHost>> {
        let mut group = RelativeLightGroup::new(config, Arc::new(host));
        group.attach().await;
        group
    }

    fn brightness_of(call: &ServiceCall) -> u8 {
        call.payload.get_brightness().unwrap().value()
    }

    #[tokio::test]
    async fn test_half_factor_at_full_brightness() {
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a").with_factor(0.5));
        let mut group = attached(config, MockHost::default()).await;

        let mut request = TurnOnRequest::new();
        request.brightness(254);
        let report = group.turn_on(request).await;

        assert!(report.all_succeeded());
        let calls = group.host().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].service, Service::TurnOn);
        assert_eq!(brightness_of(&calls[0]), 127);
    }

    #[tokio::test]
    async fn test_target_clamped_to_window() {
        let config = GroupConfig::new("g").with_member(
            MemberConfig::new("light.a")
                .with_factor(2.0)
                .with_window(1, 80),
        );
        let mut group = attached(config, MockHost::default()).await;

        let mut request = TurnOnRequest::new();
        request.brightness(100);
        group.turn_on(request).await;

        assert_eq!(brightness_of(&group.host().calls()[0]), 80);
    }

    #[tokio::test]
    async fn test_color_temp_withheld_from_unsupported_child() {
        let host = MockHost::default()
            .with_child(ct_child("light.ct", 2000, 6500))
            .with_child(dim_child("light.dim"));
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.ct"))
            .with_member(MemberConfig::new("light.dim"))
            .forward_color_temp(true);
        let mut group = attached(config, host).await;

        let mut request = TurnOnRequest::new();
        request.color_temp(Kelvin::create(3000).unwrap());
        group.turn_on(request).await;

        let calls = group.host().calls();
        assert_eq!(calls[0].payload.get_color_temp(), Kelvin::create(3000));
        assert!(calls[1].payload.get_color_temp().is_none());
        assert_eq!(group.master().color_mode(), ColorMode::ColorTemp);
    }

    #[tokio::test]
    async fn test_hs_preferred_when_both_requested() {
        let host = MockHost::default()
            .with_child(ct_child("light.ct", 2000, 6500))
            .with_child(color_child("light.rgb"));
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.ct"))
            .with_member(MemberConfig::new("light.rgb"))
            .forward_color_temp(true)
            .forward_color(true);
        let mut group = attached(config, host).await;

        let mut request = TurnOnRequest::new();
        request
            .color_temp(Kelvin::create(3000).unwrap())
            .hue_saturation(HueSaturation::create(240.0, 100.0).unwrap());
        group.turn_on(request).await;

        assert_eq!(group.state().color_mode, ColorMode::Hs);
        let calls = group.host().calls();
        assert!(calls[0].payload.get_hue_saturation().is_none());
        assert!(calls[1].payload.get_hue_saturation().is_some());
    }

    #[tokio::test]
    async fn test_supported_modes_fixed_after_attach() {
        let host = MockHost::default().with_child(dim_child("light.a"));
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .forward_color_temp(true)
            .forward_color(true);
        let mut group = attached(config, host).await;
        let before = group.capabilities().clone();
        assert_eq!(
            before.supported_color_modes(),
            &BTreeSet::from([ColorMode::Brightness])
        );

        // The child gains color support after attachment.
        group
            .host()
            .states
            .lock()
            .unwrap()
            .insert("light.a".into(), ct_child("light.a", 2000, 6500));
        group.attach().await;
        group.handle_state_changed(&StateChanged::new("light.a"));
        let mut request = TurnOnRequest::new();
        request.color_temp(Kelvin::create(3000).unwrap());
        group.turn_on(request).await;

        assert_eq!(group.capabilities(), &before);
        assert_eq!(group.master().color_mode(), ColorMode::Brightness);
        assert!(group.host().calls()[0].payload.get_color_temp().is_none());
    }

    #[tokio::test]
    async fn test_liveness_is_or_of_children() {
        let host = MockHost::default()
            .with_child(dim_child("light.a"))
            .with_child(dim_child("light.b"));
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .with_member(MemberConfig::new("light.b"));
        let mut group = attached(config, host).await;
        assert!(!group.is_on());

        let steps = [
            ("light.a", "on", true),
            ("light.b", "on", true),
            ("light.a", "off", true),
            ("light.b", "unavailable", false),
        ];
        for (entity_id, state, expected) in steps {
            group.host().set_state(entity_id, state);
            assert!(group.handle_state_changed(&StateChanged::new(entity_id)));
            assert_eq!(group.is_on(), expected);
            assert_eq!(group.host().last_published().is_on, expected);
        }
    }

    #[tokio::test]
    async fn test_foreign_state_change_ignored() {
        let config = GroupConfig::new("g").with_member(MemberConfig::new("light.a"));
        let mut group = attached(config, MockHost::default()).await;
        group.host().set_state("light.other", "on");

        let published = group.host().published.lock().unwrap().len();
        assert!(!group.handle_state_changed(&StateChanged::new("light.other")));
        assert!(!group.is_on());
        assert_eq!(group.host().published.lock().unwrap().len(), published);
    }

    #[tokio::test]
    async fn test_child_failure_is_captured() {
        let host = MockHost {
            failing: HashSet::from(["light.broken".to_string()]),
            ..Default::default()
        };
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.broken"))
            .with_member(MemberConfig::new("light.ok"));
        let mut group = attached(config, host).await;

        let report = group.turn_on(TurnOnRequest::new()).await;

        assert_eq!(report.len(), 2);
        assert!(!report.all_succeeded());
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].call.targets, ["light.broken"]);
        assert!(group.is_on());
        assert_eq!(group.host().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_on_state_published_before_fan_out() {
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .with_member(MemberConfig::new("light.b"));
        let mut group = attached(config, MockHost::default()).await;

        group.turn_on(TurnOnRequest::new()).await;
        assert_eq!(*group.host().on_when_called.lock().unwrap(), [true, true]);
    }

    #[tokio::test]
    async fn test_turn_off_single_batched_call() {
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .with_member(MemberConfig::new("light.b"));
        let mut group = attached(config, MockHost::default()).await;
        group.turn_on(TurnOnRequest::new()).await;

        let report = group.turn_off(Transition::create(2.0)).await;

        assert_eq!(report.len(), 1);
        let call = report.calls().next().unwrap();
        assert_eq!(call.service, Service::TurnOff);
        assert_eq!(call.targets, ["light.a", "light.b"]);
        assert_eq!(call.payload.get_transition(), Transition::create(2.0));
        assert!(!group.is_on());
        assert!(group.brightness().is_none());

        let published = group.host().last_published();
        assert_eq!(published.supported_features, FEATURE_TRANSITION);
        assert!(published.supports_transition());
    }

    #[tokio::test]
    async fn test_child_commands_in_flight_together() {
        // Every call blocks until all three are pending at once.
        let host = MockHost {
            barrier: Some(Barrier::new(3)),
            ..Default::default()
        };
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .with_member(MemberConfig::new("light.b"))
            .with_member(MemberConfig::new("light.c"));
        let mut group = attached(config, host).await;

        let mut request = TurnOnRequest::new();
        request.brightness(120);
        let report = timeout(Duration::from_secs(2), group.turn_on(request))
            .await
            .expect("child calls were not dispatched concurrently");

        assert_eq!(report.len(), 3);
        assert!(report.all_succeeded());
    }

    #[tokio::test]
    async fn test_group_without_children() {
        let mut group = attached(GroupConfig::new("empty"), MockHost::default()).await;

        assert!(!group.is_available());
        assert_eq!(
            group.capabilities().supported_color_modes(),
            &BTreeSet::from([ColorMode::Brightness])
        );
        assert!(group.turn_on(TurnOnRequest::new()).await.is_empty());
        assert!(group.turn_off(None).await.is_empty());
        assert!(!group.host().last_published().available);
    }

    #[tokio::test]
    async fn test_restore_on_attach() {
        let restored = RestoredState::new(
            "on",
            json!({"master_brightness": 60, "color_temp_kelvin": 2700})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let host = MockHost {
            restored: Some(restored),
            ..Default::default()
        }
        .with_child(ct_child("light.a", 2200, 5000));
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .forward_color_temp(true);
        let mut group = attached(config, host).await;

        assert!(group.is_on());
        assert_eq!(group.brightness(), Brightness::create(60));
        assert_eq!(group.master().color_mode(), ColorMode::ColorTemp);

        group.apply(None).await;
        let call = &group.host().calls()[0];
        assert_eq!(brightness_of(call), 60);
        assert_eq!(call.payload.get_color_temp(), Kelvin::create(2700));
    }

    #[tokio::test]
    async fn test_state_advertises_kelvin_intersection() {
        let host = MockHost::default()
            .with_child(ct_child("light.a", 2000, 4000))
            .with_child(ct_child("light.b", 2700, 6500));
        let config = GroupConfig::new("g")
            .with_member(MemberConfig::new("light.a"))
            .with_member(MemberConfig::new("light.b"))
            .forward_color_temp(true);
        let group = attached(config, host).await;

        let state = group.state();
        assert_eq!(state.min_color_temp_kelvin, Kelvin::create(2700));
        assert_eq!(state.max_color_temp_kelvin, Kelvin::create(4000));
    }

    #[tokio::test]
    async fn test_set_factor_and_window() {
        let config = GroupConfig::new("g").with_member(MemberConfig::new("light.a"));
        let mut group = attached(config, MockHost::default()).await;

        assert_eq!(
            group.set_factor("light.zzz", 2.0),
            Err(Error::UnknownChild("light.zzz".into()))
        );
        group.set_factor("light.a", 0.25).unwrap();
        group.set_min_max("light.a", 0, 500).unwrap();

        let state = group.host().last_published();
        assert_eq!(state.factors["light.a"], 0.25);
        assert_eq!((state.min["light.a"], state.max["light.a"]), (1, 254));

        let mut request = TurnOnRequest::new();
        request.brightness(200);
        group.turn_on(request).await;
        assert_eq!(brightness_of(&group.host().calls()[0]), 50);
    }

    #[tokio::test]
    async fn test_generated_unique_id_and_device_info() {
        let group = RelativeLightGroup::new(GroupConfig::new("g"), Arc::new(MockHost::default()));
        assert!(Uuid::parse_str(group.unique_id()).is_ok());

        let group = RelativeLightGroup::new(
            GroupConfig::new("g").with_unique_id("entry-1"),
            Arc::new(MockHost::default()),
        );
        let info = group.device_info();
        assert_eq!(info.identifiers, [(DOMAIN.to_string(), "entry-1".to_string())]);
        assert_eq!(group.diagnostics()["unique_id"], "entry-1");
    }
}
