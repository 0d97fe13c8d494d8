use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::normalize::{CatalogEntry, VersionProbe};
use crate::providers::ProviderError;

/// Nova flavor. List calls without details leave the capacities at zero.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Flavor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "os-flavor-access:is_public", alias = "is_public", default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub ram: u64,
    #[serde(default)]
    pub vcpus: u64,
    #[serde(default)]
    pub disk: u64,
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub rel: Option<String>,
    pub href: String,
}

/// Image as exposed through the compute API, metadata included.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerImage {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    /// Nova reports `""` instead of an object for volume-backed servers.
    #[serde(default, deserialize_with = "optional_ref")]
    pub image: Option<ResourceRef>,
    #[serde(default, deserialize_with = "optional_ref")]
    pub flavor: Option<ResourceRef>,
}

fn optional_ref<'de, D>(deserializer: D) -> Result<Option<ResourceRef>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        Ref(ResourceRef),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Field::deserialize(deserializer)? {
        Field::Ref(r) => Some(r),
        Field::Other(_) => None,
    })
}

/// Everything the OpenStack provider needs from Keystone and Nova.
#[async_trait::async_trait]
pub trait NovaSource: VersionProbe {
    fn auth_url(&self) -> &str;

    async fn service_catalog(&self) -> Result<Vec<CatalogEntry>, ProviderError>;

    async fn list_flavors(&self, detailed: bool) -> Result<Vec<Flavor>, ProviderError>;

    async fn list_images(&self, detailed: bool) -> Result<Vec<ServerImage>, ProviderError>;

    async fn list_instances(&self) -> Result<Vec<Server>, ProviderError>;

    /// [`ProviderError::NotFound`] when the image no longer exists.
    async fn find_image(&self, id: &str) -> Result<ServerImage, ProviderError>;

    /// [`ProviderError::NotFound`] when the flavor no longer exists.
    async fn find_flavor(&self, id: &str) -> Result<Flavor, ProviderError>;
}
