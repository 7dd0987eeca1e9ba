//! Publishes route descriptors on the host bus.

use crate::config::PayloadKeys;
use crate::error::{Result, ViewEventError};
use crate::host::EventBus;
use crate::route::RouteDescriptor;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Fire-and-forget publisher for route events.
///
/// Holds the bus weakly: the host owns the observer through its hooks and
/// listeners, not the other way round.
pub struct Broadcaster {
    bus: Weak<dyn EventBus>,
    event_type: String,
    keys: PayloadKeys,
}

impl Broadcaster {
    pub fn new(bus: &Arc<dyn EventBus>, event_type: impl Into<String>, keys: PayloadKeys) -> Self {
        Self {
            bus: Arc::downgrade(bus),
            event_type: event_type.into(),
            keys,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn keys(&self) -> &PayloadKeys {
        &self.keys
    }

    /// Fire one event for `descriptor`. Fails only if the host is gone.
    pub fn broadcast(&self, descriptor: &RouteDescriptor) -> Result<()> {
        let bus = self.bus.upgrade().ok_or_else(|| {
            ViewEventError::Other("Event bus is no longer available".to_string())
        })?;

        debug!(
            "Broadcasting {} {} as {}",
            descriptor.method(),
            descriptor.path(),
            self.event_type
        );
        bus.fire(&self.event_type, descriptor.to_event_data(&self.keys));
        Ok(())
    }
}
