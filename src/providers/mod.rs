pub mod opennebula;
pub mod openstack;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::cloud::{Attributes, EndpointRecord, ImageRecord, InstanceRecord, TemplateRecord};
use crate::helpers::xml_tree::XmlTreeError;

pub use opennebula::{OneVariant, OpenNebulaOptions, OpenNebulaProvider};
pub use openstack::{OpenStackOptions, OpenStackProvider};

/// A discovery backend. Every method runs its own discovery pass and returns
/// a mapping keyed by backend-native identifier.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_compute_endpoints(&self) -> Result<BTreeMap<String, EndpointRecord>, ProviderError>;

    async fn get_compute_shares(&self) -> Result<BTreeMap<String, Attributes>, ProviderError>;

    async fn get_templates(&self) -> Result<BTreeMap<String, TemplateRecord>, ProviderError>;

    async fn get_images(&self) -> Result<BTreeMap<String, ImageRecord>, ProviderError>;

    async fn get_instances(&self) -> Result<BTreeMap<String, InstanceRecord>, ProviderError>;
}

/// Everything one provider publishes, ready for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudInfo {
    pub endpoints: BTreeMap<String, EndpointRecord>,
    pub shares: BTreeMap<String, Attributes>,
    pub templates: BTreeMap<String, TemplateRecord>,
    pub images: BTreeMap<String, ImageRecord>,
    pub instances: BTreeMap<String, InstanceRecord>,
}

/// Run every discovery method once. The first fatal error aborts.
pub async fn collect(provider: &dyn Provider) -> Result<CloudInfo, ProviderError> {
    Ok(CloudInfo {
        endpoints: provider.get_compute_endpoints().await?,
        shares: provider.get_compute_shares().await?,
        templates: provider.get_templates().await?,
        images: provider.get_images().await?,
        instances: provider.get_instances().await?,
    })
}

/// ---- Errors ----
#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication against {url} failed: {reason}")]
    Auth { url: String, reason: String },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("XML-RPC call {method} failed: {reason}")]
    Rpc { method: String, reason: String },
    #[error(transparent)]
    Xml(#[from] XmlTreeError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },
}
