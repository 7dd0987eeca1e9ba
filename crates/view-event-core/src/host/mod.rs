//! Host collaborator ports.
//!
//! The observer never reaches into the host's internals. Everything it needs
//! (the event bus, the command registry, the installed route table, the
//! registration extension point and a little host state) is expressed as a
//! trait here. [`LocalHost`] implements all of them in-process.

mod local;
mod view;

pub use local::LocalHost;
pub use view::{ViewDefinition, ViewLoader};

use crate::error::{Result, ViewEventError};
use crate::route::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Flat key-value event payload.
pub type EventData = serde_json::Map<String, Value>;

/// An event as seen on the host bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

/// Bus listener callback.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Command callback; receives the full client message and returns the result payload.
pub type CommandHandler = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Callback run around view registration.
pub type RegistrationHook = Arc<dyn Fn(&dyn RouteBearing) -> Result<()> + Send + Sync>;

/// A handler registered with the host's web layer.
pub trait RouteBearing {
    /// Primary URL.
    fn url(&self) -> &str;

    /// Alternate URLs served by the same handlers.
    fn extra_urls(&self) -> &[String];

    /// Whether the view handles `method`.
    fn has_handler(&self, method: HttpMethod) -> bool;

    fn requires_auth(&self) -> bool;

    fn cors_allowed(&self) -> bool;

    /// Primary URL followed by the alternates.
    fn urls(&self) -> Vec<&str> {
        std::iter::once(self.url())
            .chain(self.extra_urls().iter().map(String::as_str))
            .collect()
    }
}

/// The host's internal event bus.
pub trait EventBus: Send + Sync {
    fn listen(&self, event_type: &str, handler: EventHandler);

    fn fire(&self, event_type: &str, data: EventData);
}

/// Shape a client command message must have before its handler runs.
///
/// Every message carries an `id` and a `type` discriminator; commands may
/// declare additional required fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSchema {
    command_type: String,
    required_fields: Vec<String>,
}

impl CommandSchema {
    pub fn new(command_type: impl Into<String>) -> Self {
        Self {
            command_type: command_type.into(),
            required_fields: Vec::new(),
        }
    }

    pub fn require(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }

    pub fn command_type(&self) -> &str {
        &self.command_type
    }

    pub fn validate(&self, message: &Value) -> Result<()> {
        let object = message.as_object().ok_or_else(|| ViewEventError::Validation {
            field: "message".to_string(),
            message: "command message must be a JSON object".to_string(),
        })?;

        match object.get("type").and_then(Value::as_str) {
            Some(t) if t == self.command_type => {}
            other => {
                return Err(ViewEventError::Validation {
                    field: "type".to_string(),
                    message: format!("expected '{}', got {:?}", self.command_type, other),
                })
            }
        }

        for field in std::iter::once("id").chain(self.required_fields.iter().map(String::as_str)) {
            if !object.contains_key(field) {
                return Err(ViewEventError::Validation {
                    field: field.to_string(),
                    message: "missing required field".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// The host's client command registry (websocket API).
pub trait CommandRegistry: Send + Sync {
    /// Register `handler` for `command_type`. Fails if the type is already taken.
    fn register_command(
        &self,
        command_type: &str,
        handler: CommandHandler,
        schema: CommandSchema,
    ) -> Result<()>;
}

/// An entry in the host's installed route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRoute {
    pub path: String,
    pub method: HttpMethod,
    pub auth_required: bool,
    pub cors_allowed: bool,
}

/// The host's authoritative route table.
pub trait RouteTable: Send + Sync {
    fn installed_routes(&self) -> Vec<InstalledRoute>;
}

/// When a registration hook runs relative to the host's own registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

/// Extension point around view registration.
pub trait RegistrationPort: Send + Sync {
    fn add_registration_hook(&self, phase: HookPhase, hook: RegistrationHook);
}

/// Host-owned values the observer reads at install time.
pub trait HostState: Send + Sync {
    /// Human-readable instance name from the host's core configuration.
    fn location_name(&self) -> Option<String>;

    /// Externally reachable base URL of this instance.
    fn base_url(&self) -> Option<String>;

    /// Host-issued credential proving this instance's identity.
    fn signing_secret(&self) -> Option<Vec<u8>>;
}

/// Everything the observer needs from a host.
pub trait Host: EventBus + CommandRegistry + RouteTable + RegistrationPort + HostState {}

impl<T> Host for T where T: EventBus + CommandRegistry + RouteTable + RegistrationPort + HostState {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_accepts_type_and_id() {
        let schema = CommandSchema::new("view_event/request_routes");
        assert!(schema
            .validate(&json!({"id": 3, "type": "view_event/request_routes"}))
            .is_ok());
    }

    #[test]
    fn test_schema_rejects_wrong_type_or_missing_fields() {
        let schema = CommandSchema::new("view_event/request_routes").require("instance");

        assert!(schema.validate(&json!({"id": 1, "type": "other"})).is_err());
        assert!(schema
            .validate(&json!({"type": "view_event/request_routes", "instance": "a"}))
            .is_err());
        assert!(schema
            .validate(&json!({"id": 1, "type": "view_event/request_routes"}))
            .is_err());
        assert!(schema.validate(&json!("not an object")).is_err());
    }
}
