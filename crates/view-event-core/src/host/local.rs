//! In-process host implementing every port.
//!
//! Backs the reference server and the tests. All tables are behind
//! `RwLock`s and callbacks are always invoked after the relevant lock is
//! released, so listeners and command handlers may fire events or register
//! views themselves.

use super::{
    CommandHandler, CommandRegistry, CommandSchema, Event, EventBus, EventData, EventHandler,
    HookPhase, HostState, InstalledRoute, RegistrationHook, RegistrationPort, RouteBearing,
    RouteTable,
};
use crate::config::{EventConfig, HostConfig};
use crate::error::{Result, ViewEventError};
use crate::interceptor::RegistrationInterceptor;
use crate::route::HttpMethod;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, trace};

pub struct LocalHost {
    location_name: Option<String>,
    base_url: Option<String>,
    signing_secret: Option<Vec<u8>>,
    listeners: RwLock<HashMap<String, Vec<EventHandler>>>,
    commands: RwLock<HashMap<String, (CommandSchema, CommandHandler)>>,
    routes: RwLock<Vec<InstalledRoute>>,
    interceptor: RegistrationInterceptor,
    events_tx: broadcast::Sender<Event>,
}

impl Default for LocalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalHost {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(HostConfig::EVENT_CHANNEL_CAPACITY);
        Self {
            location_name: None,
            base_url: None,
            signing_secret: None,
            listeners: RwLock::new(HashMap::new()),
            commands: RwLock::new(HashMap::new()),
            routes: RwLock::new(Vec::new()),
            interceptor: RegistrationInterceptor::new(),
            events_tx,
        }
    }

    pub fn with_location_name(mut self, name: impl Into<String>) -> Self {
        self.location_name = Some(name.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_signing_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.signing_secret = Some(secret.into());
        self
    }

    /// Stream of every event fired on this host.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events_tx.subscribe()
    }

    /// Register a view with the web layer.
    ///
    /// Installs one route per (method, URL) pair and returns how many were
    /// installed. Registration hooks run around the installation.
    pub fn register_view(&self, view: &dyn RouteBearing) -> usize {
        self.interceptor.intercept(view, || {
            let mut installed = Vec::new();
            for method in HttpMethod::ALL {
                if !view.has_handler(method) {
                    continue;
                }
                for url in view.urls() {
                    installed.push(InstalledRoute {
                        path: url.to_string(),
                        method,
                        auth_required: view.requires_auth(),
                        cors_allowed: view.cors_allowed(),
                    });
                }
            }

            let count = installed.len();
            self.routes
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .extend(installed);
            debug!("Installed {} routes for {}", count, view.url());
            count
        })
    }

    /// Dispatch a client command message to its registered handler.
    pub fn dispatch_command(&self, message: &Value) -> Result<Value> {
        let command_type = message
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ViewEventError::Validation {
                field: "type".to_string(),
                message: "command message has no type".to_string(),
            })?;

        let (schema, handler) = self
            .commands
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(command_type)
            .cloned()
            .ok_or_else(|| ViewEventError::UnknownCommand {
                command_type: command_type.to_string(),
            })?;

        schema.validate(message)?;
        handler(message)
    }

    pub fn has_command(&self, command_type: &str) -> bool {
        self.commands
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(command_type)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(event_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl EventBus for LocalHost {
    fn listen(&self, event_type: &str, handler: EventHandler) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(event_type.to_string())
            .or_default()
            .push(handler);
    }

    fn fire(&self, event_type: &str, data: EventData) {
        let event = Event {
            event_type: event_type.to_string(),
            data,
        };
        trace!("Firing {}", event.event_type);

        let handlers: Vec<EventHandler> = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners
                .get(event_type)
                .into_iter()
                .chain(listeners.get(EventConfig::MATCH_ALL))
                .flatten()
                .cloned()
                .collect()
        };

        // No subscribers is not an error.
        let _ = self.events_tx.send(event.clone());

        for handler in handlers {
            handler(&event);
        }
    }
}

impl CommandRegistry for LocalHost {
    fn register_command(
        &self,
        command_type: &str,
        handler: CommandHandler,
        schema: CommandSchema,
    ) -> Result<()> {
        let mut commands = self
            .commands
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if commands.contains_key(command_type) {
            return Err(ViewEventError::Config {
                message: format!("Command {} is already registered", command_type),
            });
        }
        commands.insert(command_type.to_string(), (schema, handler));
        debug!("Registered command {}", command_type);
        Ok(())
    }
}

impl RouteTable for LocalHost {
    fn installed_routes(&self) -> Vec<InstalledRoute> {
        self.routes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl RegistrationPort for LocalHost {
    fn add_registration_hook(&self, phase: HookPhase, hook: RegistrationHook) {
        self.interceptor.add_hook(phase, hook);
    }
}

impl HostState for LocalHost {
    fn location_name(&self) -> Option<String> {
        self.location_name.clone()
    }

    fn base_url(&self) -> Option<String> {
        self.base_url.clone()
    }

    fn signing_secret(&self) -> Option<Vec<u8>> {
        self.signing_secret.clone()
    }
}
