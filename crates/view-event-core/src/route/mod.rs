//! Route descriptors and their extraction from views.

mod descriptor;
mod extractor;
mod method;
mod policy;

pub use descriptor::{InstanceInfo, RouteDescriptor};
pub use extractor::{RouteExtractor, RouteStamp};
pub use method::HttpMethod;
pub use policy::{InclusionPolicy, RouteFilter};
