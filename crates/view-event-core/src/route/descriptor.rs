//! Route descriptors and the instance metadata stamped onto them.

use super::method::HttpMethod;
use crate::config::PayloadKeys;
use crate::error::{Result, ViewEventError};
use crate::host::EventData;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Identifies the instance that exposes a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceInfo {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl InstanceInfo {
    pub fn new(name: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
        }
    }

    /// Build instance metadata from the host's base URL (e.g. `http://10.0.0.2:8123`).
    ///
    /// The port falls back to the scheme's default when the URL omits it.
    pub fn from_base_url(name: impl Into<String>, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| ViewEventError::Config {
            message: format!("Invalid base URL '{}': {}", base_url, e),
        })?;

        let host = url.host_str().ok_or_else(|| ViewEventError::Config {
            message: format!("Base URL '{}' has no host", base_url),
        })?;

        let port = url
            .port_or_known_default()
            .ok_or_else(|| ViewEventError::Config {
                message: format!("Base URL '{}' has no port and no known default", base_url),
            })?;

        Ok(Self::new(name, host, port))
    }
}

/// Metadata for one exposed (URL, method) pair.
///
/// Immutable once created; the observer clones descriptors into its buffer
/// and into event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    path: String,
    method: HttpMethod,
    auth_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instance: Option<InstanceInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<Vec<u8>>,
}

impl RouteDescriptor {
    pub fn new(path: impl Into<String>, method: HttpMethod, auth_required: bool) -> Self {
        Self {
            path: path.into(),
            method,
            auth_required,
            instance: None,
            signature: None,
        }
    }

    /// Attach owning-instance metadata.
    pub fn with_instance(mut self, instance: InstanceInfo) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Attach the host-issued signature.
    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = Some(signature);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn auth_required(&self) -> bool {
        self.auth_required
    }

    pub fn instance(&self) -> Option<&InstanceInfo> {
        self.instance.as_ref()
    }

    pub fn signature(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    /// Flatten into an event payload.
    ///
    /// Signatures are hex encoded; instance fields are only present when the
    /// descriptor carries instance metadata.
    pub fn to_event_data(&self, keys: &PayloadKeys) -> EventData {
        let mut data = EventData::new();
        data.insert(keys.route.clone(), Value::String(self.path.clone()));
        data.insert(
            PayloadKeys::METHOD.to_string(),
            Value::String(self.method.as_str().to_string()),
        );
        data.insert(
            PayloadKeys::AUTH_REQUIRED.to_string(),
            Value::Bool(self.auth_required),
        );

        if let Some(instance) = &self.instance {
            data.insert(
                PayloadKeys::INSTANCE_NAME.to_string(),
                Value::String(instance.name.clone()),
            );
            data.insert(
                PayloadKeys::INSTANCE_IP.to_string(),
                Value::String(instance.host.clone()),
            );
            data.insert(
                PayloadKeys::INSTANCE_PORT.to_string(),
                Value::Number(instance.port.into()),
            );
        }

        if let Some(signature) = &self.signature {
            data.insert(
                PayloadKeys::SIGNATURE.to_string(),
                Value::String(hex::encode(signature)),
            );
        }

        data
    }
}
