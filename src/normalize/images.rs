use tracing::debug;

use super::fallback::{self, FallbackChain};
use super::occify::synthesize_id;
use crate::cloud::{Attributes, ImageRecord};

/// Which metadata keys feed which canonical image field, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct ImageRules {
    pub description: FallbackChain,
    pub marketplace: FallbackChain,
    pub version: FallbackChain,
    pub os: &'static [FallbackChain],
    /// Use the image's access link when no marketplace key is present and
    /// a marketplace id is not mandatory.
    pub link_fallback: bool,
    /// Build `"<os_distro> <os_version>"` as the last version fallback.
    pub legacy_distro_version: bool,
}

pub const OPENSTACK_IMAGE_RULES: ImageRules = ImageRules {
    description: FallbackChain::new(
        "image_description",
        &["vmcatcher_event_dc_description", "vmcatcher_event_dc_title"],
    ),
    marketplace: FallbackChain::new("image_marketplace_id", &["vmcatcher_event_ad_mpuri", "marketplace"]),
    version: FallbackChain::new("image_version", &["image_version", "vmcatcher_event_hv_version"]),
    os: &[
        FallbackChain::new("image_os_name", &["os_distro"]),
        FallbackChain::new("image_os_version", &["os_version"]),
        FallbackChain::new("image_os_family", &["os_type"]),
    ],
    link_fallback: true,
    legacy_distro_version: true,
};

pub const OPENNEBULA_IMAGE_RULES: ImageRules = ImageRules {
    description: FallbackChain::new(
        "image_description",
        &[
            "description",
            "cloudkeeper_appliance_description",
            "vmcatcher_event_dc_description",
            "cloudkeeper_appliance_title",
            "vmcatcher_event_dc_title",
        ],
    ),
    marketplace: FallbackChain::new(
        "image_marketplace_id",
        &["cloudkeeper_appliance_mpuri", "vmcatcher_event_ad_mpuri", "marketplace"],
    ),
    version: FallbackChain::new(
        "image_version",
        &["cloudkeeper_appliance_version", "vmcatcher_event_hv_version", "image_version"],
    ),
    os: &[
        FallbackChain::new("image_os_name", &["cloudkeeper_appliance_os_distribution", "os_distro"]),
        FallbackChain::new("image_os_version", &["cloudkeeper_appliance_os_version", "os_version"]),
        FallbackChain::new("image_platform", &["cloudkeeper_appliance_os_arch"]),
    ],
    link_fallback: false,
    legacy_distro_version: false,
};

/// One backend image, as seen by the normalizer.
#[derive(Debug, Clone, Copy)]
pub struct ImageSource<'a> {
    pub native_id: &'a str,
    pub name: Option<&'a str>,
    /// Term occified into the synthetic `image_id`.
    pub term: &'a str,
    pub link: Option<&'a str>,
    /// Keys the fallback chains look at.
    pub metadata: &'a Attributes,
    /// Keys copied verbatim into the record.
    pub passthrough: &'a Attributes,
}

pub struct ImageNormalizer<'a> {
    base: Attributes,
    namespace: &'a str,
    schema: String,
    require_marketplace_id: bool,
    rules: &'a ImageRules,
}

impl<'a> ImageNormalizer<'a> {
    /// `defaults` are the prefixed static image defaults. `image_schema` and
    /// `image_require_marketplace_id` steer normalization and are not
    /// published.
    pub fn new(defaults: &Attributes, namespace: &'a str, default_schema: &str, rules: &'a ImageRules) -> Self {
        let mut base = ImageRecord::blank();
        base.overlay(defaults);
        let schema = base
            .take_string("image_schema")
            .unwrap_or_else(|| default_schema.to_string());
        let require_marketplace_id = defaults.get_bool("image_require_marketplace_id").unwrap_or(false);
        base.remove("image_require_marketplace_id");

        Self {
            base,
            namespace,
            schema,
            require_marketplace_id,
            rules,
        }
    }

    /// `None` when the image is filtered out for lack of a marketplace id.
    pub fn normalize(&self, source: &ImageSource<'_>) -> Option<ImageRecord> {
        let rules = self.rules;
        let metadata = source.metadata;

        let mut record = self.base.clone();
        record.insert("image_name", source.name.map(str::to_string));
        record.insert("image_native_id", source.native_id);
        record.insert("image_id", synthesize_id(self.namespace, &self.schema, source.term));
        record.overlay(source.passthrough);

        let marketplace_id = match rules.marketplace.resolve(metadata) {
            Some(found) => Some(found),
            None if self.require_marketplace_id => {
                debug!(image = %source.native_id, "skipping image without marketplace id");
                return None;
            }
            None if rules.link_fallback => source.link.map(str::to_string),
            None => None,
        };
        fallback::apply(&mut record, rules.marketplace.field, marketplace_id);
        fallback::apply(&mut record, rules.description.field, rules.description.resolve(metadata));
        fallback::apply_all(&mut record, rules.os, metadata);

        let version = rules.version.resolve(metadata).or_else(|| {
            rules
                .legacy_distro_version
                .then(|| legacy_distro_version(metadata))
                .flatten()
        });
        fallback::apply(&mut record, rules.version.field, version);

        Some(ImageRecord::from_attributes(record))
    }
}

/// Historical last-resort version: only produced when a `distro` key exists
/// and a key named after the `os_version` *value* exists too. A missing
/// `os_distro` is rendered as `None`, as published sites have always seen it.
fn legacy_distro_version(metadata: &Attributes) -> Option<String> {
    let distro_version = metadata.get_str("os_version")?;
    if metadata.get_str("distro").is_none() || metadata.get_str(&distro_version).is_none() {
        return None;
    }
    let distro = metadata.get_str("os_distro").unwrap_or_else(|| "None".to_string());
    Some(format!("{distro} {distro_version}"))
}
