mod client;
mod flavors;
mod models;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

pub use client::NovaClient;
pub use flavors::normalize_flavors;
pub use models::{Flavor, Link, NovaSource, ResourceRef, Server, ServerImage};

use super::{Provider, ProviderError};
use crate::cloud::{Attributes, EndpointRecord, ImageRecord, InstanceRecord, TemplateRecord};
use crate::normalize::endpoints::OPENSTACK_PROFILES;
use crate::normalize::images::OPENSTACK_IMAGE_RULES;
use crate::normalize::occify::OPENSTACK_NAMESPACE;
use crate::normalize::{CatalogLookup, EndpointResolver, ImageNormalizer, ImageSource, InstanceRef, normalize_instances};
use crate::static_defaults::StaticProvider;

/// Content type of the link that points at the image itself.
pub const IMAGE_LINK_TYPE: &str = "application/vnd.openstack.image";

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenStackOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    pub tenant_name: Option<String>,
    pub auth_url: Option<String>,
    pub cacert: Option<PathBuf>,
    pub insecure: bool,
    /// Publish OCCI-OS compatible ids (flavor name instead of flavor id).
    pub legacy_occi_os: bool,
    pub probe_endpoints: bool,
    pub probe_timeout: Duration,
}

impl Default for OpenStackOptions {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            tenant_name: None,
            auth_url: None,
            cacert: None,
            insecure: false,
            legacy_occi_os: false,
            probe_endpoints: true,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }
}

/// Borrowed, validated Keystone credentials.
#[derive(Debug, Clone, Copy)]
pub struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub tenant_name: &'a str,
    pub auth_url: &'a str,
}

fn required<'a>(value: &'a Option<String>, what: &str, flag: &str, env: &str) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Config(format!("you must provide {what} via either --{flag} or env[{env}]")))
}

impl OpenStackOptions {
    pub fn validate(&self) -> Result<Credentials<'_>, ProviderError> {
        Ok(Credentials {
            username: required(&self.username, "a username", "os-username", "OS_USERNAME")?,
            password: required(&self.password, "a password", "os-password", "OS_PASSWORD")?,
            tenant_name: required(&self.tenant_name, "a tenant name", "os-tenant-name", "OS_TENANT_NAME")?,
            auth_url: required(&self.auth_url, "an auth url", "os-auth-url", "OS_AUTH_URL")?,
        })
    }
}

/// OpenStack Nova (and ooi) discovery.
pub struct OpenStackProvider<S = NovaClient> {
    source: S,
    static_defaults: StaticProvider,
    legacy_occi_os: bool,
    probe_endpoints: bool,
}

impl OpenStackProvider<NovaClient> {
    pub async fn connect(options: &OpenStackOptions, static_defaults: StaticProvider) -> Result<Self, ProviderError> {
        options.validate()?;
        let source = NovaClient::authenticate(options).await?;
        info!(auth_url = %source.auth_url(), "authenticated against OpenStack");
        Ok(Self::with_source(source, static_defaults, options))
    }
}

impl<S: NovaSource> OpenStackProvider<S> {
    pub fn with_source(source: S, static_defaults: StaticProvider, options: &OpenStackOptions) -> Self {
        Self {
            source,
            static_defaults,
            legacy_occi_os: options.legacy_occi_os,
            probe_endpoints: options.probe_endpoints,
        }
    }
}

/// First link advertising the image content type.
pub fn image_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| l.kind.as_deref() == Some(IMAGE_LINK_TYPE))
        .map(|l| l.href.as_str())
}

struct NovaLookup<'a, S>(&'a S);

#[async_trait::async_trait]
impl<S: NovaSource> CatalogLookup for NovaLookup<'_, S> {
    async fn image_name(&self, id: &str) -> Result<Option<String>, ProviderError> {
        Ok(self.0.find_image(id).await?.name)
    }

    async fn template_name(&self, id: &str) -> Result<Option<String>, ProviderError> {
        Ok(Some(self.0.find_flavor(id).await?.name))
    }
}

#[async_trait::async_trait]
impl<S: NovaSource + 'static> Provider for OpenStackProvider<S> {
    fn name(&self) -> &'static str {
        "openstack"
    }

    async fn get_compute_endpoints(&self) -> Result<BTreeMap<String, EndpointRecord>, ProviderError> {
        let mut defaults = self.static_defaults.get_compute_endpoint_defaults(true);
        if !defaults.contains_key("compute_service_name") {
            defaults.insert("compute_service_name", self.source.auth_url());
        }
        let catalog = self.source.service_catalog().await?;

        let mut resolver = EndpointResolver::new(&defaults, OPENSTACK_PROFILES);
        if self.probe_endpoints {
            resolver = resolver.with_probe(&self.source);
        }
        let endpoints = resolver.resolve(&catalog).await;
        debug!(count = endpoints.len(), "discovered compute endpoints");
        Ok(endpoints)
    }

    async fn get_compute_shares(&self) -> Result<BTreeMap<String, Attributes>, ProviderError> {
        Ok(self.static_defaults.get_compute_shares())
    }

    async fn get_templates(&self) -> Result<BTreeMap<String, TemplateRecord>, ProviderError> {
        let defaults = self.static_defaults.get_template_defaults(true);
        let flavors = self.source.list_flavors(true).await?;
        let templates = normalize_flavors(&flavors, self.legacy_occi_os, &defaults);
        debug!(count = templates.len(), total = flavors.len(), "discovered templates");
        Ok(templates)
    }

    async fn get_images(&self) -> Result<BTreeMap<String, ImageRecord>, ProviderError> {
        let defaults = self.static_defaults.get_image_defaults(true);
        let listed = self.source.list_images(true).await?;
        let normalizer = ImageNormalizer::new(&defaults, OPENSTACK_NAMESPACE, "os", &OPENSTACK_IMAGE_RULES);

        let mut images = BTreeMap::new();
        for image in &listed {
            let metadata = Attributes::from(image.metadata.clone());
            let source = ImageSource {
                native_id: &image.id,
                name: image.name.as_deref(),
                term: &image.id,
                link: image_link(&image.links),
                metadata: &metadata,
                passthrough: &metadata,
            };
            if let Some(record) = normalizer.normalize(&source) {
                images.insert(image.id.clone(), record);
            }
        }
        debug!(count = images.len(), total = listed.len(), "discovered images");
        Ok(images)
    }

    async fn get_instances(&self) -> Result<BTreeMap<String, InstanceRecord>, ProviderError> {
        let servers = self.source.list_instances().await?;
        let refs = servers
            .into_iter()
            .map(|server| InstanceRef {
                native_id: server.id,
                name: server.name,
                status: server.status,
                image_id: server.image.map(|r| r.id),
                template_id: server.flavor.map(|r| r.id),
            })
            .collect();
        normalize_instances(refs, &NovaLookup(&self.source)).await
    }
}
