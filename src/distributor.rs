//! Fan-out of master brightness and forwarded colors to children.

use futures::future::join_all;
use log::{debug, warn};

use crate::group::Member;
use crate::host::ServiceDispatcher;
use crate::payload::{CommandPayload, ServiceCall};
use crate::response::{DispatchOutcome, DispatchReport};
use crate::status::MasterState;
use crate::types::{Brightness, BrightnessWindow, ScaleFactor, Transition};

/// Brightness for one child: `round(master * factor)`, clamped to the
/// child's window.
///
/// ```
/// use relative_light_group::{target_brightness, Brightness, BrightnessWindow, ScaleFactor};
///
/// let master = Brightness::create(254).unwrap();
/// let half = ScaleFactor::create(0.5).unwrap();
/// assert_eq!(target_brightness(master, half, BrightnessWindow::new()), 127);
///
/// let master = Brightness::create(100).unwrap();
/// let double = ScaleFactor::create(2.0).unwrap();
/// assert_eq!(target_brightness(master, double, BrightnessWindow::create(1, 80)), 80);
/// ```
pub fn target_brightness(master: Brightness, factor: ScaleFactor, window: BrightnessWindow) -> u8 {
    window.clamp(factor.scale(master.value()))
}

/// One turn-on call per child, in member order.
///
/// Color temperature and hue/saturation are only attached for children that
/// support them, and only when forwarding is enabled and a value has been
/// recorded.
pub(crate) fn turn_on_calls(
    members: &[Member],
    master: &MasterState,
    forward_ct: bool,
    forward_color: bool,
    transition: Option<Transition>,
) -> Vec<ServiceCall> {
    members
        .iter()
        .map(|member| {
            let target = target_brightness(master.brightness, member.factor, member.window);
            let mut payload = CommandPayload::from(&Brightness::clamped(i64::from(target)));
            if let Some(transition) = &transition {
                payload.transition(transition);
            }
            if forward_ct && member.capabilities.supports_ct {
                if let Some(kelvin) = &master.color_temp {
                    payload.color_temp(kelvin);
                }
            }
            if forward_color && member.capabilities.supports_color {
                if let Some(hs) = &master.hs_color {
                    payload.hue_saturation(hs);
                }
            }
            ServiceCall::turn_on(&member.entity_id, payload)
        })
        .collect()
}

/// A single turn-off call addressed to every child at once.
pub(crate) fn turn_off_call(members: &[Member], transition: Option<Transition>) -> Option<ServiceCall> {
    if members.is_empty() {
        return None;
    }
    let payload = transition
        .as_ref()
        .map(CommandPayload::from)
        .unwrap_or_default();
    let targets = members.iter().map(|m| m.entity_id.clone()).collect();
    Some(ServiceCall::turn_off(targets, payload))
}

/// Issue all calls concurrently and collect their outcomes.
///
/// Failures are logged and recorded in the report; they never abort the
/// sibling calls.
pub(crate) async fn dispatch<D: ServiceDispatcher>(
    dispatcher: &D,
    calls: Vec<ServiceCall>,
) -> DispatchReport {
    let pending = calls.into_iter().map(|call| async move {
        debug!("{} -> {:?}", call.service, call.targets);
        let result = dispatcher.call(call.clone()).await;
        if let Err(err) = &result {
            warn!("{} for {:?} failed: {}", call.service, call.targets, err);
        }
        DispatchOutcome { call, result }
    });
    DispatchReport::new(join_all(pending).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::ChildCapabilities;
    use crate::config::MemberConfig;
    use crate::types::{HueSaturation, Kelvin};

    fn member(id: &str, factor: f64, min: i64, max: i64, caps: ChildCapabilities) -> Member {
        let config = MemberConfig::new(id).with_factor(factor).with_window(min, max);
        let mut member = Member::from(config);
        member.capabilities = caps;
        member
    }

    fn master(brightness: u8) -> MasterState {
        let mut state = MasterState::new();
        state.brightness = Brightness::create(brightness).unwrap();
        state
    }

    #[test]
    fn test_unclamped_target_is_rounded_product() {
        let factors = [0.0, 0.1, 0.33, 0.5, 1.0, 1.7, 2.0, 5.0];
        for b in Brightness::MIN..=Brightness::MAX {
            for f in factors {
                let factor = ScaleFactor::create(f).unwrap();
                assert_eq!(factor.scale(b), (f64::from(b) * f).round() as i64);
            }
        }
    }

    #[test]
    fn test_zero_factor_hits_window_minimum() {
        let master = Brightness::create(200).unwrap();
        let zero = ScaleFactor::create(0.0).unwrap();
        assert_eq!(target_brightness(master, zero, BrightnessWindow::create(12, 254)), 12);
    }

    #[test]
    fn test_turn_on_calls_per_child() {
        let members = vec![
            member("light.a", 0.5, 1, 254, ChildCapabilities::default()),
            member("light.b", 2.0, 1, 80, ChildCapabilities::default()),
        ];
        let calls = turn_on_calls(&members, &master(100), false, false, None);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].targets, ["light.a"]);
        assert_eq!(calls[0].payload.get_brightness().unwrap().value(), 50);
        assert_eq!(calls[1].payload.get_brightness().unwrap().value(), 80);
        assert!(calls[1].payload.get_transition().is_none());
    }

    #[test]
    fn test_color_temp_only_for_supporting_children() {
        let ct = ChildCapabilities {
            supports_ct: true,
            ..Default::default()
        };
        let members = vec![
            member("light.ct", 1.0, 1, 254, ct),
            member("light.dim", 1.0, 1, 254, ChildCapabilities::default()),
        ];
        let mut state = master(120);
        state.color_temp = Kelvin::create(3000);

        let calls = turn_on_calls(&members, &state, true, false, None);
        assert_eq!(calls[0].payload.get_color_temp(), Kelvin::create(3000));
        assert!(calls[1].payload.get_color_temp().is_none());

        let calls = turn_on_calls(&members, &state, false, false, None);
        assert!(calls[0].payload.get_color_temp().is_none());
    }

    #[test]
    fn test_hs_only_for_color_children() {
        let color = ChildCapabilities {
            supports_color: true,
            ..Default::default()
        };
        let members = vec![
            member("light.rgb", 1.0, 1, 254, color),
            member("light.dim", 1.0, 1, 254, ChildCapabilities::default()),
        ];
        let mut state = master(120);
        state.hs_color = HueSaturation::create(200.0, 70.0);

        let calls = turn_on_calls(&members, &state, false, true, None);
        assert_eq!(calls[0].payload.get_hue_saturation(), state.hs_color);
        assert!(calls[1].payload.get_hue_saturation().is_none());
    }

    #[test]
    fn test_transition_forwarded() {
        let members = vec![member("light.a", 1.0, 1, 254, ChildCapabilities::default())];
        let transition = Transition::create(1.5);
        let calls = turn_on_calls(&members, &master(10), false, false, transition);
        assert_eq!(calls[0].payload.get_transition(), transition);
    }

    #[test]
    fn test_turn_off_is_batched() {
        let members = vec![
            member("light.a", 1.0, 1, 254, ChildCapabilities::default()),
            member("light.b", 1.0, 1, 254, ChildCapabilities::default()),
        ];
        let call = turn_off_call(&members, Transition::create(3.0)).unwrap();
        assert_eq!(call.targets, ["light.a", "light.b"]);
        assert!(call.payload.get_brightness().is_none());
        assert_eq!(call.payload.get_transition(), Transition::create(3.0));

        assert!(turn_off_call(&[], None).is_none());
    }
}
