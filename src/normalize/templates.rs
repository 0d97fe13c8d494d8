use crate::cloud::{Attributes, DEFAULT_NETWORK, DEFAULT_PLATFORM, TemplateRecord};

/// Discovered values for one template. Unset fields leave the defaults alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSpec {
    pub template_id: String,
    pub native_id: String,
    pub memory: Option<u64>,
    pub cpu: Option<u64>,
    pub disk: Option<u64>,
    pub platform: Option<String>,
}

/// Layers hard-coded defaults, static template defaults and discovered values
/// into template records.
#[derive(Debug, Clone)]
pub struct TemplateNormalizer {
    base: Attributes,
    schema: String,
}

impl TemplateNormalizer {
    /// `defaults` are the prefixed static template defaults. `template_schema`
    /// is consumed here and never published.
    pub fn new(defaults: &Attributes, default_schema: &str) -> Self {
        let mut base = Attributes::new();
        base.insert("template_platform", DEFAULT_PLATFORM);
        base.insert("template_network", DEFAULT_NETWORK);
        base.overlay(defaults);
        let schema = base
            .take_string("template_schema")
            .unwrap_or_else(|| default_schema.to_string());
        Self { base, schema }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn build(&self, spec: TemplateSpec) -> TemplateRecord {
        let mut attrs = self.base.clone();
        attrs.insert("template_id", spec.template_id);
        attrs.insert("template_native_id", spec.native_id);
        if let Some(memory) = spec.memory {
            attrs.insert("template_memory", memory);
        }
        if let Some(cpu) = spec.cpu {
            attrs.insert("template_cpu", cpu);
        }
        if let Some(disk) = spec.disk {
            attrs.insert("template_disk", disk);
        }
        if let Some(platform) = spec.platform {
            attrs.insert("template_platform", platform);
        }
        TemplateRecord::from_attributes(attrs)
    }
}
