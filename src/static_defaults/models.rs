use serde::Deserialize;
use std::collections::BTreeMap;

use crate::cloud::Attributes;

/// On-disk layout of the static defaults file. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticFile {
    #[serde(default)]
    pub(crate) compute: ComputeSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComputeSection {
    #[serde(default)]
    pub(crate) endpoints: EndpointsSection,
    #[serde(default)]
    pub(crate) templates: DefaultsSection,
    #[serde(default)]
    pub(crate) images: DefaultsSection,
    #[serde(default)]
    pub(crate) shares: BTreeMap<String, Attributes>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointsSection {
    #[serde(default)]
    pub(crate) defaults: Attributes,
    /// Endpoints that the backend cannot publish itself (OpenNebula).
    #[serde(default)]
    pub(crate) catalog: BTreeMap<String, StaticEndpoint>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultsSection {
    #[serde(default)]
    pub(crate) defaults: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticEndpoint {
    pub(crate) url: String,
    #[serde(rename = "type", default = "default_endpoint_type")]
    pub(crate) kind: String,
}

fn default_endpoint_type() -> String {
    "occi".to_string()
}

impl StaticEndpoint {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Catalog type tag, e.g. `occi`.
    pub fn kind(&self) -> &str {
        &self.kind
    }
}
