//! CLI driving a relative light group against an in-memory host.
//!
//! The setup file holds the group's config entry and the children the host
//! knows about:
//!
//! ```json
//! {
//!   "entry": {"name": "Living Room", "entities": ["light.ceiling", "light.lamp"],
//!             "factors": {"light.lamp": 0.5}, "forward_color_temp": true},
//!   "children": [
//!     {"entity_id": "light.ceiling", "state": "off",
//!      "attributes": {"supported_color_modes": ["color_temp"]}},
//!     {"entity_id": "light.lamp", "state": "off"}
//!   ]
//! }
//! ```
//!
//! Run with: cargo run --example group_cli -- --setup group.json on --brightness 180

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use relative_light_group::host::{RestoreStore, ServiceDispatcher, StatePublisher, StateSource};
use relative_light_group::{
    ChildSnapshot, DispatchReport, Error, GroupConfig, GroupState,
    HueSaturation, Kelvin, MemberForm, OfferedOptions, RelativeLightGroup, RestoredState,
    Service, ServiceCall, StateChanged, Transition, TurnOnRequest,
};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Parser)]
#[command(name = "group-cli")]
#[command(about = "Drive a relative light group from the command line", long_about = None)]
struct Cli {
    /// JSON file with the config entry and the known children
    #[arg(short, long)]
    setup: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the group state after attaching
    State,

    /// Turn the group on
    On {
        /// Master brightness (1-254)
        #[arg(short, long)]
        brightness: Option<i64>,

        /// Color temperature in Kelvin
        #[arg(short, long)]
        kelvin: Option<u16>,

        /// Hue and saturation, e.g. "200,70"
        #[arg(long)]
        hs: Option<HueSaturation>,

        /// Transition in seconds
        #[arg(short, long)]
        transition: Option<f64>,
    },

    /// Turn the group off
    Off {
        /// Transition in seconds
        #[arg(short, long)]
        transition: Option<f64>,
    },

    /// Print the per-child options form and the forwarding options offered
    Form,

    /// Print diagnostics
    Diagnostics,
}

#[derive(Deserialize)]
struct Setup {
    entry: Value,
    #[serde(default)]
    options: Value,
    #[serde(default)]
    children: Vec<ChildSnapshot>,
}

/// Host that keeps child states in memory and applies calls to them.
struct MemoryHost {
    children: Mutex<HashMap<String, ChildSnapshot>>,
    published: Mutex<Option<GroupState>>,
}

impl MemoryHost {
    fn new(children: Vec<ChildSnapshot>) -> Self {
        MemoryHost {
            children: Mutex::new(
                children
                    .into_iter()
                    .map(|c| (c.entity_id.clone(), c))
                    .collect(),
            ),
            published: Mutex::new(None),
        }
    }

    fn apply(&self, call: &ServiceCall) -> Result<(), Error> {
        let mut children = self
            .children
            .lock()
            .map_err(|e| Error::dispatch(call.service.as_ref(), &call.targets, e.to_string()))?;
        for target in &call.targets {
            let child = children.get_mut(target).ok_or_else(|| {
                Error::dispatch(call.service.as_ref(), &call.targets, "unknown entity")
            })?;
            match call.service {
                Service::TurnOn => {
                    child.state = "on".to_string();
                    if let Some(brightness) = call.payload.get_brightness() {
                        child
                            .attributes
                            .insert("brightness".to_string(), json!(brightness.value()));
                    }
                }
                Service::TurnOff => {
                    child.state = "off".to_string();
                    child.attributes.remove("brightness");
                }
            }
        }
        Ok(())
    }
}

impl StateSource for MemoryHost {
    fn snapshot(&self, entity_id: &str) -> Option<ChildSnapshot> {
        self.children.lock().ok()?.get(entity_id).cloned()
    }
}

impl ServiceDispatcher for MemoryHost {
    async fn call(&self, call: ServiceCall) -> Result<(), Error> {
        self.apply(&call)
    }
}

impl RestoreStore for MemoryHost {
    async fn last_state(&self, _unique_id: &str) -> Option<RestoredState> {
        None
    }
}

impl StatePublisher for MemoryHost {
    fn publish(&self, state: &GroupState) {
        if let Ok(mut published) = self.published.lock() {
            *published = Some(state.clone());
        }
    }
}

fn print_report(report: &DispatchReport) {
    for outcome in report.outcomes() {
        let data = outcome
            .call
            .service_data()
            .map(|v| v.to_string())
            .unwrap_or_default();
        match &outcome.result {
            Ok(()) => println!("  {}.{} {}", outcome.call.domain(), outcome.service(), data),
            Err(e) => println!(
                "  {}.{} {} FAILED: {}",
                outcome.call.domain(),
                outcome.service(),
                data,
                e
            ),
        }
    }
}

fn transition(seconds: Option<f64>) -> Result<Option<Transition>, Box<dyn std::error::Error>> {
    match seconds {
        Some(s) => Ok(Some(Transition::create(s).ok_or("transition must be >= 0")?)),
        None => Ok(None),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let setup: Setup = serde_json::from_str(&std::fs::read_to_string(&cli.setup)?)?;
    let config = GroupConfig::from_entry(&setup.entry, &setup.options);
    let host = MemoryHost::new(setup.children);

    let mut group = RelativeLightGroup::new(config.clone(), host);
    group.attach().await;

    match cli.command {
        Commands::State => {}

        Commands::On {
            brightness,
            kelvin,
            hs,
            transition: seconds,
        } => {
            let mut request = TurnOnRequest::new();
            if let Some(b) = brightness {
                request.brightness(b);
            }
            if let Some(k) = kelvin {
                let kelvin = Kelvin::create(k)
                    .ok_or("kelvin must be within 1000-20000")?;
                request.color_temp(kelvin);
            }
            if let Some(hs) = hs {
                request.hue_saturation(hs);
            }
            if let Some(t) = transition(seconds)? {
                request.transition(t);
            }

            println!("Turning {} on...", group.name());
            let report = group.turn_on(request).await;
            print_report(&report);
        }

        Commands::Off {
            transition: seconds,
        } => {
            println!("Turning {} off...", group.name());
            let report = group.turn_off(transition(seconds)?).await;
            print_report(&report);
        }

        Commands::Form => {
            let ids: Vec<String> = config.entity_ids().map(str::to_string).collect();
            let form = MemberForm::build(&ids, &config, |id| {
                group.host().snapshot(id).and_then(|c| c.name)
            });
            for field in form.fields() {
                println!("  {:40} {:30} default {}", field.key, field.label, field.default);
            }
            let offered = OfferedOptions::from(&group.capabilities().summary());
            println!("\nOffered options:");
            println!("  forward_ct:    {}", offered.forward_ct);
            println!("  forward_color: {}", offered.forward_color);
            return Ok(());
        }

        Commands::Diagnostics => {
            println!("{}", serde_json::to_string_pretty(&group.diagnostics())?);
            return Ok(());
        }
    }

    let ids: Vec<String> = group.tracked_entities().map(str::to_string).collect();
    for id in ids {
        group.handle_state_changed(&StateChanged::new(&id));
    }

    println!("\nGroup state ({}):", group.state().state());
    let published = group.host().published.lock().ok().and_then(|p| p.clone());
    if let Some(state) = published {
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    Ok(())
}
