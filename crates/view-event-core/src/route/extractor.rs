//! Turns views and route-table entries into route descriptors.

use super::descriptor::{InstanceInfo, RouteDescriptor};
use super::method::HttpMethod;
use super::policy::RouteFilter;
use crate::host::{InstalledRoute, RouteBearing};

/// Instance metadata and signature attached to every extracted descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteStamp {
    pub instance: Option<InstanceInfo>,
    pub signature: Option<Vec<u8>>,
}

impl RouteStamp {
    fn apply(&self, mut descriptor: RouteDescriptor) -> RouteDescriptor {
        if let Some(instance) = &self.instance {
            descriptor = descriptor.with_instance(instance.clone());
        }
        if let Some(signature) = &self.signature {
            descriptor = descriptor.with_signature(signature.clone());
        }
        descriptor
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteExtractor {
    filter: RouteFilter,
    stamp: RouteStamp,
}

impl RouteExtractor {
    pub fn new(filter: RouteFilter, stamp: RouteStamp) -> Self {
        Self { filter, stamp }
    }

    pub fn filter(&self) -> &RouteFilter {
        &self.filter
    }

    pub fn stamp(&self) -> &RouteStamp {
        &self.stamp
    }

    /// One descriptor per handled method and URL, methods in declared order
    /// and URLs primary-first. Missing handlers are skipped.
    pub fn extract(&self, view: &dyn RouteBearing) -> Vec<RouteDescriptor> {
        if !self.filter.admits_view(view.cors_allowed()) {
            return Vec::new();
        }

        let urls = view.urls();
        let mut routes = Vec::new();

        for method in HttpMethod::ALL {
            if !view.has_handler(method) {
                continue;
            }

            for url in &urls {
                if !self.filter.admits_url(url) {
                    continue;
                }
                routes.push(
                    self.stamp
                        .apply(RouteDescriptor::new(*url, method, view.requires_auth())),
                );
            }
        }

        routes
    }

    /// Apply the same rules to a single installed route.
    pub fn extract_installed(&self, route: &InstalledRoute) -> Option<RouteDescriptor> {
        if !self.filter.admits_view(route.cors_allowed) || !self.filter.admits_url(&route.path) {
            return None;
        }
        Some(self.stamp.apply(RouteDescriptor::new(
            route.path.clone(),
            route.method,
            route.auth_required,
        )))
    }
}
