//! view-event - broadcast API route registrations on a host event bus.
//!
//! The observer hooks into a host's view registration, turns every
//! registered view into route descriptors (URL, method, auth requirement and
//! optionally the owning instance and a host-issued signature) and fires
//! them as events. Descriptors are buffered until a consumer asks for the
//! route list, after which they are fired as soon as they are discovered.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use view_event::{HttpMethod, LocalHost, ObserverConfig, RouteObserver, ViewDefinition};
//!
//! let host = Arc::new(LocalHost::new());
//! let observer = RouteObserver::install(&host, ObserverConfig::for_components(["lights"]))?;
//!
//! host.register_view(
//!     &ViewDefinition::new("/api/lights").with_methods([HttpMethod::Get, HttpMethod::Post]),
//! );
//! assert_eq!(observer.buffered_routes().len(), 2);
//!
//! // A consumer asks for the routes; both are fired as `route_registered`.
//! host.fire("request_routes", Default::default());
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod observer;
pub mod route;

pub use config::{EventConfig, ObserverConfig, PayloadKeys, RouteConfig};
pub use error::{Result, ViewEventError};
pub use host::{
    CommandHandler, CommandRegistry, CommandSchema, Event, EventBus, EventData, EventHandler,
    HookPhase, Host, HostState, InstalledRoute, LocalHost, RegistrationHook, RegistrationPort,
    RouteBearing, RouteTable, ViewDefinition, ViewLoader,
};
pub use interceptor::RegistrationInterceptor;
pub use observer::{ObserverMode, RouteObserver};
pub use route::{
    HttpMethod, InclusionPolicy, InstanceInfo, RouteDescriptor, RouteExtractor, RouteFilter,
    RouteStamp,
};
