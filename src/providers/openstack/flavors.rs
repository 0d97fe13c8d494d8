use std::collections::BTreeMap;
use tracing::debug;

use super::models::Flavor;
use crate::cloud::{Attributes, TemplateRecord};
use crate::normalize::occify::{OPENSTACK_NAMESPACE, synthesize_id};
use crate::normalize::{TemplateNormalizer, TemplateSpec};

/// Public flavors only, keyed by flavor id. With `legacy_occi_os` the term is
/// the flavor name (OCCI-OS compatible ids), otherwise the flavor id.
pub fn normalize_flavors(
    flavors: &[Flavor],
    legacy_occi_os: bool,
    defaults: &Attributes,
) -> BTreeMap<String, TemplateRecord> {
    let normalizer = TemplateNormalizer::new(defaults, "resource");
    let mut templates = BTreeMap::new();

    for flavor in flavors {
        if !flavor.is_public {
            debug!(flavor = %flavor.id, "skipping private flavor");
            continue;
        }
        let term = if legacy_occi_os { &flavor.name } else { &flavor.id };
        let record = normalizer.build(TemplateSpec {
            template_id: synthesize_id(OPENSTACK_NAMESPACE, normalizer.schema(), term),
            native_id: flavor.id.clone(),
            memory: Some(flavor.ram),
            cpu: Some(flavor.vcpus),
            disk: Some(flavor.disk),
            platform: None,
        });
        templates.insert(flavor.id.clone(), record);
    }

    templates
}
