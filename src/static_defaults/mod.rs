//! Static, site-maintained defaults layered under everything a backend
//! reports.

mod models;

use std::collections::BTreeMap;
use std::{fs, path::Path};

use crate::cloud::Attributes;
pub use models::StaticEndpoint;
use models::StaticFile;

/// Read-only view over the static defaults file.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    file: StaticFile,
}

impl StaticProvider {
    /// No defaults at all. Every provider still works, it just publishes the
    /// hard-coded fallbacks.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StaticError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| StaticError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(json: &str) -> Result<Self, StaticError> {
        let file: StaticFile = serde_json::from_str(json)?;
        Ok(Self { file })
    }

    pub fn get_compute_endpoint_defaults(&self, prefix: bool) -> Attributes {
        prefixed(&self.file.compute.endpoints.defaults, "endpoint", prefix)
    }

    /// Endpoints declared statically, keyed by endpoint id.
    pub fn get_compute_endpoints(&self) -> &BTreeMap<String, StaticEndpoint> {
        &self.file.compute.endpoints.catalog
    }

    pub fn get_template_defaults(&self, prefix: bool) -> Attributes {
        prefixed(&self.file.compute.templates.defaults, "template", prefix)
    }

    pub fn get_image_defaults(&self, prefix: bool) -> Attributes {
        prefixed(&self.file.compute.images.defaults, "image", prefix)
    }

    pub fn get_compute_shares(&self) -> BTreeMap<String, Attributes> {
        self.file.compute.shares.clone()
    }
}

fn prefixed(defaults: &Attributes, category: &str, prefix: bool) -> Attributes {
    if prefix {
        defaults.with_prefix(category)
    } else {
        defaults.clone()
    }
}

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum StaticError {
    #[error("cannot read static defaults from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed static defaults: {0}")]
    Json(#[from] serde_json::Error),
}
