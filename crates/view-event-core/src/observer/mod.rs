//! The route-registration observer.
//!
//! [`RouteObserver::install`] wires one observer into a host: a
//! post-registration hook, a bus listener for the request event, the
//! websocket request command, and a scan of routes that were installed
//! before the observer arrived.
//!
//! Until a consumer asks for routes, every descriptor is buffered. The first
//! request flips the observer into broadcast mode and replays the buffer;
//! from then on descriptors are fired as they are discovered. Each further
//! request replays the same buffer again.

mod broadcaster;
mod state;

pub use broadcaster::Broadcaster;
pub use state::{Admission, ObserverMode, ObserverState};

use crate::config::{EventConfig, ObserverConfig, PayloadKeys};
use crate::error::{Result, ViewEventError};
use crate::host::{
    CommandRegistry, CommandSchema, Event, EventBus, HookPhase, Host, HostState,
    RegistrationPort, RouteBearing, RouteTable,
};
use crate::route::{InstanceInfo, RouteDescriptor, RouteExtractor, RouteFilter, RouteStamp};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RouteObserver {
    extractor: RouteExtractor,
    state: ObserverState,
    broadcaster: Broadcaster,
}

impl RouteObserver {
    /// Create an observer that is not attached to any host hooks.
    pub fn new(bus: &Arc<dyn EventBus>, config: &ObserverConfig, stamp: RouteStamp) -> Self {
        Self {
            extractor: RouteExtractor::new(RouteFilter::new(config.rules.clone()), stamp),
            state: ObserverState::new(),
            broadcaster: Broadcaster::new(bus, config.event_type.clone(), config.payload_keys()),
        }
    }

    /// Validate `config`, attach an observer to `host` and scan its route table.
    pub fn install<H: Host + 'static>(host: &Arc<H>, config: ObserverConfig) -> Result<Arc<Self>> {
        config.validate()?;
        let stamp = resolve_stamp(host.as_ref(), &config)?;

        let bus: Arc<dyn EventBus> = host.clone();
        let observer = Arc::new(Self::new(&bus, &config, stamp));

        // The command can only be registered once per host, which makes it
        // the claim for this install. Nothing else is attached if it fails.
        let obs = observer.clone();
        host.register_command(
            EventConfig::COMMAND_REQUEST_ROUTES,
            Arc::new(move |_: &Value| -> Result<Value> {
                let replayed = obs.request_routes();
                Ok(json!({ "replayed": replayed }))
            }),
            CommandSchema::new(EventConfig::COMMAND_REQUEST_ROUTES),
        )
        .map_err(|_| ViewEventError::Config {
            message: "A route observer is already installed on this host".to_string(),
        })?;

        let obs = observer.clone();
        host.add_registration_hook(
            HookPhase::After,
            Arc::new(move |view: &dyn RouteBearing| -> Result<()> {
                obs.handle_view_registration(view);
                Ok(())
            }),
        );

        let obs = observer.clone();
        host.listen(
            &config.request_event_type,
            Arc::new(move |_: &Event| {
                obs.request_routes();
            }),
        );

        let scanned = observer.scan_installed_routes(host.as_ref());

        info!(
            "View event observer installed ({} existing routes, instance: {})",
            scanned,
            observer
                .extractor
                .stamp()
                .instance
                .as_ref()
                .map(|i| i.name.as_str())
                .unwrap_or("none")
        );

        Ok(observer)
    }

    /// Extract and buffer or broadcast the routes of a newly registered view.
    ///
    /// Returns how many descriptors the view produced. A failed broadcast
    /// is logged and does not stop the remaining descriptors.
    pub fn handle_view_registration(&self, view: &dyn RouteBearing) -> usize {
        let routes = self.extractor.extract(view);
        let count = routes.len();
        for route in routes {
            self.observe(route);
        }
        count
    }

    /// Feed every installed route through the extractor.
    pub fn scan_installed_routes(&self, table: &dyn RouteTable) -> usize {
        let mut count = 0;
        for route in table.installed_routes() {
            if let Some(descriptor) = self.extractor.extract_installed(&route) {
                self.observe(descriptor);
                count += 1;
            }
        }
        count
    }

    /// Handle a "routes requested" signal.
    ///
    /// Switches to broadcast mode and replays the buffer in registration
    /// order. Returns the number of replayed routes.
    pub fn request_routes(&self) -> usize {
        let snapshot = self.state.begin_broadcasting();
        info!("Routes requested, replaying {} buffered routes", snapshot.len());

        for route in &snapshot {
            if let Err(e) = self.broadcaster.broadcast(route) {
                warn!("Failed to replay {} {}: {}", route.method(), route.path(), e);
            }
        }
        snapshot.len()
    }

    pub fn mode(&self) -> ObserverMode {
        self.state.mode()
    }

    pub fn is_broadcasting(&self) -> bool {
        self.state.mode() == ObserverMode::Broadcasting
    }

    pub fn buffered_routes(&self) -> Vec<RouteDescriptor> {
        self.state.buffered()
    }

    pub fn extractor(&self) -> &RouteExtractor {
        &self.extractor
    }

    /// Keys used for the fired payloads, including the configured route key.
    pub fn payload_keys(&self) -> &PayloadKeys {
        self.broadcaster.keys()
    }

    fn observe(&self, descriptor: RouteDescriptor) {
        match self.state.admit(descriptor) {
            Admission::Buffered => {
                debug!("Buffered route, {} pending", self.state.buffered_len());
            }
            Admission::Broadcast(descriptor) => {
                if let Err(e) = self.broadcaster.broadcast(&descriptor) {
                    warn!(
                        "Failed to broadcast {} {}: {}",
                        descriptor.method(),
                        descriptor.path(),
                        e
                    );
                }
            }
        }
    }
}

/// Work out the instance metadata and signature to attach to every route.
fn resolve_stamp(host: &dyn HostState, config: &ObserverConfig) -> Result<RouteStamp> {
    let instance = match (&config.instance, host.base_url()) {
        (Some(instance), _) => Some(instance.clone()),
        (None, Some(base_url)) => {
            let name = config
                .instance_name
                .clone()
                .or_else(|| host.location_name())
                .ok_or_else(|| ViewEventError::Config {
                    message: "Instance name is not configured and the host has no location name"
                        .to_string(),
                })?;
            Some(InstanceInfo::from_base_url(name, &base_url)?)
        }
        (None, None) if config.instance_name.is_some() => {
            return Err(ViewEventError::Config {
                message: "instanceName is set but the host has no base URL".to_string(),
            });
        }
        (None, None) => None,
    };

    let signature = if config.sign_routes {
        Some(host.signing_secret().ok_or(ViewEventError::MissingSecret)?)
    } else {
        None
    };

    Ok(RouteStamp {
        instance,
        signature,
    })
}
