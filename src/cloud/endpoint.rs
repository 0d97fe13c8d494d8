use serde::{Deserialize, Serialize};
use std::fmt;

use super::Attributes;

/// API flavour spoken by a compute endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiType {
    #[serde(rename = "OCCI")]
    Occi,
    #[serde(rename = "OpenStack")]
    OpenStack,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::Occi => "OCCI",
            ApiType::OpenStack => "OpenStack",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published compute endpoint, keyed by its backend id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointRecord {
    pub compute_api_type: ApiType,
    pub compute_middleware: String,
    pub compute_middleware_developer: String,
    pub compute_middleware_version: String,
    pub compute_api_version: String,
    pub compute_endpoint_url: String,
    /// Static endpoint defaults carried through untouched.
    #[serde(flatten)]
    pub extensions: Attributes,
}
