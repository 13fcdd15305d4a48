//! # relative_light_group
//!
//! A virtual light that drives a group of real lights proportionally.
//!
//! Every child has a scale factor and a brightness window. When the group is
//! turned on with a master brightness `B`, each child receives
//! `clamp(round(B * factor), min, max)`. Color temperature and hue/saturation
//! can optionally be forwarded to the children that support them.
//!
//! ## Quick Start
//!
//! ```ignore
//! use relative_light_group::{GroupConfig, MemberConfig, RelativeLightGroup, TurnOnRequest};
//!
//! async fn run(host: MyHost) {
//!     let config = GroupConfig::new("Living Room")
//!         .with_member(MemberConfig::new("light.ceiling"))
//!         .with_member(MemberConfig::new("light.floor_lamp").with_factor(0.5).with_window(10, 200))
//!         .forward_color_temp(true);
//!
//!     let mut group = RelativeLightGroup::new(config, host);
//!     group.attach().await;
//!
//!     let mut request = TurnOnRequest::new();
//!     request.brightness(180);
//!     let report = group.turn_on(request).await;
//!     for failure in report.failures() {
//!         eprintln!("{:?} failed", failure.call.targets);
//!     }
//! }
//! ```
//!
//! ## Host integration
//!
//! The crate does not talk to devices. A host adapter implements the traits
//! in [`host`] (state lookup, service dispatch, state restore and state
//! publishing) and forwards child state changes to
//! [`RelativeLightGroup::handle_state_changed`].
//!
//! ## Capabilities
//!
//! When the group is attached it reads each child's `supported_color_modes`
//! and color temperature bounds once. The group then exposes
//! [`ColorMode::Brightness`], plus [`ColorMode::Hs`] and
//! [`ColorMode::ColorTemp`] when forwarding is enabled and at least one child
//! supports them. This set never changes for the lifetime of the entity.

mod capabilities;
mod config;
mod distributor;
mod errors;
mod group;
pub mod host;
mod payload;
mod request;
mod response;
mod status;
mod types;

// Re-export public API
pub use capabilities::{
    CapabilitySummary, ChildCapabilities, GroupCapabilities, merge_kelvin_ranges,
};
pub use config::{
    DEFAULT_NAME, DOMAIN, FieldKind, FormField, GroupConfig, MemberConfig, MemberForm,
    OfferedOptions, friendly_name, normalize_entities,
};
pub use distributor::target_brightness;
pub use errors::Error;
pub use group::{DeviceInfo, Member, RelativeLightGroup};
pub use host::{ChildSnapshot, Host, StateChanged};
pub use payload::{CommandPayload, Service, ServiceCall};
pub use request::TurnOnRequest;
pub use response::{DispatchOutcome, DispatchReport};
pub use status::{
    FEATURE_TRANSITION, GroupState, MasterState, RestoredState, select_color_mode,
};
pub use types::{
    Brightness, BrightnessWindow, ColorMode, HueSaturation, Kelvin, KelvinRange, ScaleFactor,
    Transition,
};
