//! Declarative view definitions and their JSON loader.

use super::RouteBearing;
use crate::error::{Result, ViewEventError};
use crate::route::HttpMethod;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A route-bearing view described as data.
///
/// ```json
/// {
///   "name": "lights",
///   "url": "/api/lights",
///   "extraUrls": ["/api/lights/{entity_id}"],
///   "methods": ["get", "post"],
///   "requiresAuth": true,
///   "corsAllowed": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewDefinition {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub extra_urls: Vec<String>,
    #[serde(default)]
    pub methods: Vec<HttpMethod>,
    #[serde(default = "default_true")]
    pub requires_auth: bool,
    #[serde(default)]
    pub cors_allowed: bool,
}

fn default_true() -> bool {
    true
}

impl ViewDefinition {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            extra_urls: Vec::new(),
            methods: Vec::new(),
            requires_auth: true,
            cors_allowed: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_extra_url(mut self, url: impl Into<String>) -> Self {
        self.extra_urls.push(url.into());
        self
    }

    pub fn requires_auth(mut self, requires_auth: bool) -> Self {
        self.requires_auth = requires_auth;
        self
    }

    pub fn cors_allowed(mut self, cors_allowed: bool) -> Self {
        self.cors_allowed = cors_allowed;
        self
    }

    /// Check the definition is usable as a view.
    pub fn validate(&self) -> Result<()> {
        for url in std::iter::once(&self.url).chain(self.extra_urls.iter()) {
            if !url.starts_with('/') {
                return Err(ViewEventError::Validation {
                    field: "url".to_string(),
                    message: format!("'{}' must start with '/'", url),
                });
            }
        }
        Ok(())
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

impl RouteBearing for ViewDefinition {
    fn url(&self) -> &str {
        &self.url
    }

    fn extra_urls(&self) -> &[String] {
        &self.extra_urls
    }

    fn has_handler(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    fn cors_allowed(&self) -> bool {
        self.cors_allowed
    }
}

/// Loads view definitions from a directory of JSON files.
pub struct ViewLoader {
    views_dir: PathBuf,
}

impl ViewLoader {
    pub fn new(views_dir: impl AsRef<Path>) -> Result<Self> {
        let views_dir = views_dir.as_ref().to_path_buf();

        if !views_dir.is_dir() {
            return Err(ViewEventError::Config {
                message: format!("Views directory does not exist: {}", views_dir.display()),
            });
        }

        Ok(Self { views_dir })
    }

    pub fn views_dir(&self) -> &Path {
        &self.views_dir
    }

    /// Load every `*.json` view, sorted by file name.
    ///
    /// Files that fail to parse or validate are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<ViewDefinition>> {
        let entries = std::fs::read_dir(&self.views_dir)
            .map_err(|e| ViewEventError::io_with_path(e, &self.views_dir))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        let mut views = Vec::with_capacity(paths.len());
        for path in paths {
            match Self::load_file(&path) {
                Ok(view) => {
                    debug!("Loaded view {} from {}", view.label(), path.display());
                    views.push(view);
                }
                Err(e) => {
                    warn!("Failed to load view from {}: {}", path.display(), e);
                }
            }
        }

        info!(
            "Loaded {} views from {}",
            views.len(),
            self.views_dir.display()
        );

        Ok(views)
    }

    /// Load and validate a single view file.
    pub fn load_file(path: &Path) -> Result<ViewDefinition> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ViewEventError::io_with_path(e, path))?;

        let view: ViewDefinition =
            serde_json::from_str(&content).map_err(|e| ViewEventError::Json {
                message: format!("Failed to parse view from {}: {}", path.display(), e),
                source: Some(e),
            })?;

        view.validate()?;
        Ok(view)
    }
}
