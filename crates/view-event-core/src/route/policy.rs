//! Inclusion rules deciding which views and URLs are reported.

use crate::config::RouteConfig;
use crate::error::{Result, ViewEventError};
use serde::{Deserialize, Serialize};

/// A single inclusion rule.
///
/// Serialized with a `rule` tag, e.g. `{"rule": "apiMarker", "marker": "api/"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "camelCase")]
pub enum InclusionPolicy {
    /// Skip the whole view unless it is CORS-enabled.
    CorsAllowed,
    /// Only URLs containing the marker substring.
    ApiMarker {
        #[serde(default = "default_marker")]
        marker: String,
    },
    /// Only URLs containing one of the component names, plus anything
    /// under the services prefix.
    #[serde(rename_all = "camelCase")]
    ComponentAllowList { components: Vec<String> },
}

fn default_marker() -> String {
    RouteConfig::DEFAULT_API_MARKER.to_string()
}

impl InclusionPolicy {
    pub fn api_marker() -> Self {
        InclusionPolicy::ApiMarker {
            marker: default_marker(),
        }
    }

    pub fn allow_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        InclusionPolicy::ComponentAllowList {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    /// View-level check, applied before any URL is looked at.
    pub fn admits_view(&self, cors_allowed: bool) -> bool {
        match self {
            InclusionPolicy::CorsAllowed => cors_allowed,
            _ => true,
        }
    }

    /// URL-level check.
    pub fn admits_url(&self, url: &str) -> bool {
        match self {
            InclusionPolicy::CorsAllowed => true,
            InclusionPolicy::ApiMarker { marker } => url.contains(marker.as_str()),
            InclusionPolicy::ComponentAllowList { components } => {
                url.starts_with(RouteConfig::SERVICES_PREFIX)
                    || components.iter().any(|c| url.contains(c.as_str()))
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            InclusionPolicy::CorsAllowed => Ok(()),
            InclusionPolicy::ApiMarker { marker } if marker.is_empty() => {
                Err(ViewEventError::Config {
                    message: "apiMarker rule requires a non-empty marker".to_string(),
                })
            }
            InclusionPolicy::ApiMarker { .. } => Ok(()),
            InclusionPolicy::ComponentAllowList { components } => {
                if components.is_empty() {
                    return Err(ViewEventError::Config {
                        message: "componentAllowList rule requires at least one component"
                            .to_string(),
                    });
                }
                if components.iter().any(|c| c.trim().is_empty()) {
                    return Err(ViewEventError::Config {
                        message: "componentAllowList contains an empty component name".to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Conjunction of inclusion rules: a URL is reported only if every rule admits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteFilter {
    rules: Vec<InclusionPolicy>,
}

impl RouteFilter {
    pub fn new(rules: Vec<InclusionPolicy>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[InclusionPolicy] {
        &self.rules
    }

    pub fn admits_view(&self, cors_allowed: bool) -> bool {
        self.rules.iter().all(|r| r.admits_view(cors_allowed))
    }

    pub fn admits_url(&self, url: &str) -> bool {
        self.rules.iter().all(|r| r.admits_url(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list_inclusion() {
        let rule = InclusionPolicy::allow_components(["lights"]);

        assert!(rule.admits_url("/api/lights"));
        assert!(rule.admits_url("/api/services/climate/set_temperature"));
        assert!(!rule.admits_url("/api/climate"));
    }

    #[test]
    fn test_api_marker() {
        let rule = InclusionPolicy::api_marker();
        assert!(rule.admits_url("/api/states"));
        assert!(!rule.admits_url("/auth/token"));
    }

    #[test]
    fn test_cors_rule_only_gates_views() {
        let rule = InclusionPolicy::CorsAllowed;
        assert!(!rule.admits_view(false));
        assert!(rule.admits_view(true));
        assert!(rule.admits_url("/anything"));
    }

    #[test]
    fn test_filter_is_conjunctive() {
        let filter = RouteFilter::new(vec![
            InclusionPolicy::api_marker(),
            InclusionPolicy::allow_components(["lights"]),
        ]);
        assert!(filter.admits_url("/api/lights"));
        assert!(!filter.admits_url("/lights"));
        assert!(!filter.admits_url("/api/switch"));
    }

    #[test]
    fn test_empty_filter_admits_everything() {
        let filter = RouteFilter::default();
        assert!(filter.admits_view(false));
        assert!(filter.admits_url("/"));
    }

    #[test]
    fn test_validation() {
        assert!(InclusionPolicy::allow_components(Vec::<String>::new())
            .validate()
            .is_err());
        assert!(InclusionPolicy::allow_components([" "]).validate().is_err());
        assert!(InclusionPolicy::ApiMarker {
            marker: String::new()
        }
        .validate()
        .is_err());
        assert!(InclusionPolicy::CorsAllowed.validate().is_ok());
    }

    #[test]
    fn test_deserialize_tagged_rules() {
        let rules: Vec<InclusionPolicy> = serde_json::from_str(
            r#"[
                {"rule": "corsAllowed"},
                {"rule": "apiMarker"},
                {"rule": "componentAllowList", "components": ["lights", "switch"]}
            ]"#,
        )
        .unwrap();

        assert_eq!(rules[0], InclusionPolicy::CorsAllowed);
        assert_eq!(rules[1], InclusionPolicy::api_marker());
        assert_eq!(
            rules[2],
            InclusionPolicy::allow_components(["lights", "switch"])
        );
    }
}
