//! Configuration for the view-event observer.
//!
//! Constants live on unit structs; the user-facing [`ObserverConfig`] is
//! loaded from JSON and validated before the observer installs.

use crate::error::{Result, ViewEventError};
use crate::route::{InclusionPolicy, InstanceInfo};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Event and command identifiers.
pub struct EventConfig;

impl EventConfig {
    pub const DOMAIN: &'static str = "view_event";
    pub const EVENT_TYPE_REQUEST_ROUTES: &'static str = "request_routes";
    pub const EVENT_TYPE_ROUTE_REGISTERED: &'static str = "route_registered";
    pub const COMMAND_REQUEST_ROUTES: &'static str = "view_event/request_routes";
    /// Listener key that receives every event.
    pub const MATCH_ALL: &'static str = "*";
}

/// URL matching constants.
pub struct RouteConfig;

impl RouteConfig {
    pub const DEFAULT_API_MARKER: &'static str = "api/";
    /// URLs under this prefix pass the component allow-list unconditionally.
    pub const SERVICES_PREFIX: &'static str = "/api/services/";
}

/// Host-side tuning.
pub struct HostConfig;

impl HostConfig {
    pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
}

/// Key names in the flattened route payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadKeys {
    /// Key holding the URL; configurable for older consumers.
    pub route: String,
}

impl PayloadKeys {
    pub const ROUTE: &'static str = "route";
    pub const METHOD: &'static str = "method";
    pub const AUTH_REQUIRED: &'static str = "auth_required";
    pub const INSTANCE_NAME: &'static str = "instance_name";
    pub const INSTANCE_IP: &'static str = "instance_ip";
    pub const INSTANCE_PORT: &'static str = "instance_port";
    pub const SIGNATURE: &'static str = "signature";

    /// Fields the route key may not be renamed to.
    pub const RESERVED: [&'static str; 6] = [
        Self::METHOD,
        Self::AUTH_REQUIRED,
        Self::INSTANCE_NAME,
        Self::INSTANCE_IP,
        Self::INSTANCE_PORT,
        Self::SIGNATURE,
    ];
}

impl Default for PayloadKeys {
    fn default() -> Self {
        Self {
            route: Self::ROUTE.to_string(),
        }
    }
}

/// Observer configuration.
///
/// ```json
/// {
///   "rules": [{"rule": "componentAllowList", "components": ["lights"]}],
///   "instanceName": "Cabin",
///   "signRoutes": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverConfig {
    /// Inclusion rules; every rule must admit a URL for it to be reported.
    #[serde(default = "default_rules")]
    pub rules: Vec<InclusionPolicy>,
    /// Event type fired for each route.
    #[serde(default = "default_event_type")]
    pub event_type: String,
    /// Bus event that requests a route snapshot.
    #[serde(default = "default_request_event_type")]
    pub request_event_type: String,
    /// Payload key holding the URL.
    #[serde(default = "default_route_key")]
    pub route_key: String,
    /// Explicit instance metadata; takes precedence over host state.
    #[serde(default)]
    pub instance: Option<InstanceInfo>,
    /// Overrides the host's location name when instance metadata is derived
    /// from the host's base URL.
    #[serde(default)]
    pub instance_name: Option<String>,
    /// Attach the host-issued signature to every route.
    #[serde(default)]
    pub sign_routes: bool,
}

fn default_rules() -> Vec<InclusionPolicy> {
    vec![InclusionPolicy::CorsAllowed, InclusionPolicy::api_marker()]
}

fn default_event_type() -> String {
    EventConfig::EVENT_TYPE_ROUTE_REGISTERED.to_string()
}

fn default_request_event_type() -> String {
    EventConfig::EVENT_TYPE_REQUEST_ROUTES.to_string()
}

fn default_route_key() -> String {
    PayloadKeys::ROUTE.to_string()
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            event_type: default_event_type(),
            request_event_type: default_request_event_type(),
            route_key: default_route_key(),
            instance: None,
            instance_name: None,
            sign_routes: false,
        }
    }
}

impl ObserverConfig {
    /// Config that reports routes of the given components only.
    pub fn for_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: vec![InclusionPolicy::allow_components(components)],
            ..Self::default()
        }
    }

    /// Load and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ViewEventError::io_with_path(e, path))?;

        let config: ObserverConfig =
            serde_json::from_str(&content).map_err(|e| ViewEventError::Json {
                message: format!("Failed to parse config from {}: {}", path.display(), e),
                source: Some(e),
            })?;

        config.validate()?;
        debug!("Loaded observer config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("eventType", &self.event_type),
            ("requestEventType", &self.request_event_type),
            ("routeKey", &self.route_key),
        ] {
            if value.trim().is_empty() {
                return Err(ViewEventError::Config {
                    message: format!("{} must not be empty", field),
                });
            }
        }

        if PayloadKeys::RESERVED.contains(&self.route_key.as_str()) {
            return Err(ViewEventError::Config {
                message: format!(
                    "routeKey '{}' collides with another payload field",
                    self.route_key
                ),
            });
        }

        if self.event_type == self.request_event_type {
            return Err(ViewEventError::Config {
                message: format!(
                    "eventType and requestEventType must differ (both '{}')",
                    self.event_type
                ),
            });
        }

        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }

    pub fn payload_keys(&self) -> PayloadKeys {
        PayloadKeys {
            route: self.route_key.clone(),
        }
    }
}
