use std::collections::BTreeMap;

use crate::cloud::InstanceRecord;
use crate::providers::ProviderError;

/// Running VM as reported by a backend, before cross-referencing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    pub native_id: String,
    pub name: String,
    pub status: String,
    pub image_id: Option<String>,
    pub template_id: Option<String>,
}

/// Point lookups against the backend's current catalog. A miss must be
/// reported as [`ProviderError::NotFound`].
#[async_trait::async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn image_name(&self, id: &str) -> Result<Option<String>, ProviderError>;
    async fn template_name(&self, id: &str) -> Result<Option<String>, ProviderError>;
}

/// Fails on the first dangling image or template reference.
pub async fn normalize_instances(
    instances: Vec<InstanceRef>,
    lookup: &dyn CatalogLookup,
) -> Result<BTreeMap<String, InstanceRecord>, ProviderError> {
    let mut out = BTreeMap::new();
    for instance in instances {
        let image_name = match &instance.image_id {
            Some(id) => lookup.image_name(id).await?,
            None => None,
        };
        let template_name = match &instance.template_id {
            Some(id) => lookup.template_name(id).await?,
            None => None,
        };
        out.insert(
            instance.native_id,
            InstanceRecord {
                instance_name: instance.name,
                instance_status: instance.status,
                instance_image_id: instance.image_id,
                instance_image_name: image_name,
                instance_template_id: instance.template_id,
                instance_template_name: template_name,
            },
        );
    }
    Ok(out)
}
