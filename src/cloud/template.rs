use serde::Serialize;

use super::Attributes;

pub const DEFAULT_PLATFORM: &str = "amd64";
pub const DEFAULT_NETWORK: &str = "private";

/// Normalised compute size (flavor / resource template).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateRecord {
    pub template_id: String,
    pub template_native_id: String,
    pub template_memory: Option<u64>,
    pub template_cpu: Option<u64>,
    pub template_disk: Option<u64>,
    pub template_platform: String,
    pub template_network: String,
    #[serde(flatten)]
    pub extensions: Attributes,
}

impl TemplateRecord {
    /// Lift the canonical keys out of a fully layered attribute bag. Whatever
    /// is left over is published as extensions.
    pub fn from_attributes(mut attrs: Attributes) -> Self {
        Self {
            template_id: attrs.take_string("template_id").unwrap_or_default(),
            template_native_id: attrs.take_string("template_native_id").unwrap_or_default(),
            template_memory: attrs.take_u64("template_memory"),
            template_cpu: attrs.take_u64("template_cpu"),
            template_disk: attrs.take_u64("template_disk"),
            template_platform: attrs
                .take_string("template_platform")
                .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            template_network: attrs
                .take_string("template_network")
                .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
            extensions: attrs,
        }
    }
}
