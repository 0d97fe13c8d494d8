mod models;
mod rocci;
mod rpc;

use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

pub use models::{
    OneDocument, OneImage, OneSource, OneTemplate, OneVm, ROCCI_DOCUMENT_TYPE, parse_document_pool, parse_image_pool,
    parse_template_pool, parse_vm_pool, vm_state_name,
};
pub use rocci::{FEDCLOUD_FLAVOUR_SCHEME, load_template_dir, platform_for, templates_from_documents};
pub use rpc::{OneRpcClient, RpcParam, decode_response, encode_call};

use super::{Provider, ProviderError};
use crate::cloud::{Attributes, EndpointRecord, ImageRecord, InstanceRecord, TemplateRecord};
use crate::normalize::endpoints::OPENNEBULA_PROFILES;
use crate::normalize::images::OPENNEBULA_IMAGE_RULES;
use crate::normalize::occify::{opennebula_namespace, rocci_term, synthesize_id};
use crate::normalize::{
    CatalogEndpoint, CatalogEntry, CatalogLookup, EndpointResolver, ImageNormalizer, ImageSource, InstanceRef,
    TemplateNormalizer, TemplateSpec, normalize_instances,
};
use crate::static_defaults::StaticProvider;

/// Template keys copied verbatim into image records.
const IMAGE_PASSTHROUGH_PREFIXES: &[&str] = &["vmcatcher_", "cloudkeeper_"];

/// Which flavour of OpenNebula deployment is being described.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OneVariant {
    /// Plain OpenNebula: images only, no resource templates.
    OpenNebula,
    /// OpenNebula fronted by rOCCI-server, templates from rOCCI.
    Rocci,
    /// INDIGO-DataCloud: every VM template is a resource template.
    Indigo,
}

impl OneVariant {
    pub fn name(&self) -> &'static str {
        match self {
            OneVariant::OpenNebula => "opennebula",
            OneVariant::Rocci => "opennebularocci",
            OneVariant::Indigo => "indigoon",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OpenNebulaOptions {
    /// `user:password` session string.
    pub auth: Option<String>,
    pub rpcxml_endpoint: Option<String>,
    /// Only publish templates registered by cloudkeeper (or vmcatcher).
    pub cloudkeeper_images: bool,
    pub rocci_template_dir: Option<PathBuf>,
    /// Read rOCCI templates from the document pool instead of the directory.
    pub rocci_remote_templates: bool,
}

/// Validated OpenNebula connection settings.
#[derive(Debug, Clone)]
pub struct OneSettings<'a> {
    pub auth: &'a str,
    pub endpoint: &'a str,
    /// Host of the XML-RPC endpoint, used in published identifiers.
    pub host: String,
}

impl OpenNebulaOptions {
    pub fn validate(&self, variant: OneVariant) -> Result<OneSettings<'_>, ProviderError> {
        let auth = self
            .auth
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ProviderError::Config("you must provide a session string via either --on-auth or env[ON_AUTH]".to_string())
            })?;
        let endpoint = self
            .rpcxml_endpoint
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ProviderError::Config(
                    "you must provide an XML-RPC endpoint via either --on-rpcxml-endpoint or env[ON_RPCXML_ENDPOINT]"
                        .to_string(),
                )
            })?;
        let host = url::Url::parse(endpoint)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .ok_or_else(|| ProviderError::Config(format!("invalid XML-RPC endpoint '{endpoint}'")))?;

        if variant == OneVariant::Rocci && !self.rocci_remote_templates && self.rocci_template_dir.is_none() {
            return Err(ProviderError::Config(
                "you must provide a rOCCI template directory via --rocci-template-dir".to_string(),
            ));
        }

        Ok(OneSettings { auth, endpoint, host })
    }
}

/// OpenNebula discovery over XML-RPC.
pub struct OpenNebulaProvider<S = OneRpcClient> {
    variant: OneVariant,
    source: S,
    static_defaults: StaticProvider,
    options: OpenNebulaOptions,
    namespace: String,
}

impl OpenNebulaProvider<OneRpcClient> {
    pub fn connect(
        variant: OneVariant,
        options: &OpenNebulaOptions,
        static_defaults: StaticProvider,
    ) -> Result<Self, ProviderError> {
        let settings = options.validate(variant)?;
        let source = OneRpcClient::new(settings.endpoint, settings.auth)?;
        info!(endpoint = %settings.endpoint, variant = variant.name(), "using OpenNebula");
        Self::with_source(variant, source, static_defaults, options)
    }
}

impl<S: OneSource> OpenNebulaProvider<S> {
    pub fn with_source(
        variant: OneVariant,
        source: S,
        static_defaults: StaticProvider,
        options: &OpenNebulaOptions,
    ) -> Result<Self, ProviderError> {
        let namespace = opennebula_namespace(&options.validate(variant)?.host);
        Ok(Self {
            variant,
            source,
            static_defaults,
            options: options.clone(),
            namespace,
        })
    }

    async fn templates(&self) -> Result<Vec<OneTemplate>, ProviderError> {
        parse_template_pool(&self.source.template_pool().await?)
    }

    async fn images_by_id(&self) -> Result<BTreeMap<String, OneImage>, ProviderError> {
        let images = parse_image_pool(&self.source.image_pool().await?)?;
        Ok(images.into_iter().map(|i| (i.id.clone(), i)).collect())
    }

    fn template_normalizer(&self) -> TemplateNormalizer {
        TemplateNormalizer::new(&self.static_defaults.get_template_defaults(true), "resource_tpl")
    }

    async fn rocci_templates(&self) -> Result<BTreeMap<String, TemplateRecord>, ProviderError> {
        let normalizer = self.template_normalizer();
        if self.options.rocci_remote_templates {
            let documents = parse_document_pool(&self.source.document_pool().await?)?;
            return templates_from_documents(&documents, &normalizer);
        }
        let dir = self
            .options
            .rocci_template_dir
            .as_deref()
            .ok_or_else(|| ProviderError::Config("no rOCCI template directory configured".to_string()))?;
        load_template_dir(dir, &normalizer)
    }

    async fn indigo_templates(&self) -> Result<BTreeMap<String, TemplateRecord>, ProviderError> {
        let normalizer = self.template_normalizer();
        let images = self.images_by_id().await?;

        let mut out = BTreeMap::new();
        for tpl in self.templates().await? {
            let attrs = &tpl.attributes;
            let cpu = attrs
                .get_u64("vcpu")
                .or_else(|| attrs.get_f64("cpu").map(|c| c.ceil() as u64));
            let disk = tpl
                .disk_image_id()
                .and_then(|id| images.get(&id))
                .and_then(|image| image.size_mb)
                .map(|mb| mb.div_ceil(1024));

            let record = normalizer.build(TemplateSpec {
                template_id: synthesize_id(&self.namespace, normalizer.schema(), &rocci_term(&tpl.name, &tpl.id)),
                native_id: tpl.id.clone(),
                memory: attrs.get_u64("memory"),
                cpu,
                disk,
                platform: None,
            });
            out.insert(record.template_id.clone(), record);
        }
        Ok(out)
    }
}

/// Template and image names resolved from pools fetched once per call.
struct PoolLookup {
    templates: BTreeMap<String, String>,
    images: BTreeMap<String, String>,
}

#[async_trait::async_trait]
impl CatalogLookup for PoolLookup {
    async fn image_name(&self, id: &str) -> Result<Option<String>, ProviderError> {
        match self.images.get(id) {
            Some(name) => Ok(Some(name.clone())),
            None => Err(ProviderError::NotFound {
                kind: "image",
                id: id.to_string(),
            }),
        }
    }

    async fn template_name(&self, id: &str) -> Result<Option<String>, ProviderError> {
        match self.templates.get(id) {
            Some(name) => Ok(Some(name.clone())),
            None => Err(ProviderError::NotFound {
                kind: "template",
                id: id.to_string(),
            }),
        }
    }
}

#[async_trait::async_trait]
impl<S: OneSource + 'static> Provider for OpenNebulaProvider<S> {
    fn name(&self) -> &'static str {
        self.variant.name()
    }

    async fn get_compute_endpoints(&self) -> Result<BTreeMap<String, EndpointRecord>, ProviderError> {
        let mut defaults = self.static_defaults.get_compute_endpoint_defaults(true);
        if !defaults.contains_key("compute_service_name") {
            defaults.insert("compute_service_name", self.source.endpoint());
        }

        let catalog: Vec<CatalogEntry> = self
            .static_defaults
            .get_compute_endpoints()
            .iter()
            .map(|(id, endpoint)| CatalogEntry {
                kind: endpoint.kind().to_string(),
                endpoints: vec![CatalogEndpoint {
                    id: id.clone(),
                    public_url: endpoint.url().to_string(),
                }],
            })
            .collect();

        let endpoints = EndpointResolver::new(&defaults, OPENNEBULA_PROFILES).resolve(&catalog).await;
        debug!(count = endpoints.len(), "published compute endpoints");
        Ok(endpoints)
    }

    async fn get_compute_shares(&self) -> Result<BTreeMap<String, Attributes>, ProviderError> {
        Ok(self.static_defaults.get_compute_shares())
    }

    async fn get_templates(&self) -> Result<BTreeMap<String, TemplateRecord>, ProviderError> {
        let templates = match self.variant {
            OneVariant::OpenNebula => BTreeMap::new(),
            OneVariant::Rocci => self.rocci_templates().await?,
            OneVariant::Indigo => self.indigo_templates().await?,
        };
        debug!(count = templates.len(), "discovered templates");
        Ok(templates)
    }

    async fn get_images(&self) -> Result<BTreeMap<String, ImageRecord>, ProviderError> {
        let defaults = self.static_defaults.get_image_defaults(true);
        let normalizer = ImageNormalizer::new(&defaults, &self.namespace, "os_tpl", &OPENNEBULA_IMAGE_RULES);
        let templates = self.templates().await?;

        let mut images = BTreeMap::new();
        for tpl in &templates {
            if self.options.cloudkeeper_images && !tpl.attributes.contains_key("cloudkeeper_appliance_mpuri") {
                debug!(template = %tpl.id, "skipping template not registered by cloudkeeper");
                continue;
            }
            let term = rocci_term(&tpl.name, &tpl.id);
            let passthrough = tpl.attributes.filter_prefixed(IMAGE_PASSTHROUGH_PREFIXES);
            let source = ImageSource {
                native_id: &tpl.id,
                name: Some(&tpl.name),
                term: &term,
                link: None,
                metadata: &tpl.attributes,
                passthrough: &passthrough,
            };
            if let Some(record) = normalizer.normalize(&source) {
                images.insert(tpl.id.clone(), record);
            }
        }
        debug!(count = images.len(), total = templates.len(), "discovered images");
        Ok(images)
    }

    async fn get_instances(&self) -> Result<BTreeMap<String, InstanceRecord>, ProviderError> {
        let vms = parse_vm_pool(&self.source.vm_pool().await?)?;
        let lookup = PoolLookup {
            templates: self.templates().await?.into_iter().map(|t| (t.id, t.name)).collect(),
            images: self.images_by_id().await?.into_iter().map(|(id, i)| (id, i.name)).collect(),
        };
        let refs = vms
            .into_iter()
            .map(|vm| InstanceRef {
                status: vm_state_name(vm.state).to_string(),
                native_id: vm.id,
                name: vm.name,
                image_id: vm.image_id,
                template_id: vm.template_id,
            })
            .collect();
        normalize_instances(refs, &lookup).await
    }
}
