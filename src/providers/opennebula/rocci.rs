use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::models::{OneDocument, ROCCI_DOCUMENT_TYPE};
use crate::cloud::TemplateRecord;
use crate::normalize::occify::occify;
use crate::normalize::{TemplateNormalizer, TemplateSpec};
use crate::providers::ProviderError;

/// Scheme remote rOCCI flavours are published under.
pub const FEDCLOUD_FLAVOUR_SCHEME: &str = "http://fedcloud.egi.eu/occi/compute/flavour/1.0#";

/// rOCCI architecture names mapped to GLUE platforms.
pub fn platform_for(architecture: &str) -> String {
    match architecture {
        "x64" => "amd64".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ResourceTemplateFile {
    #[serde(default)]
    resource_tpl: Vec<ResourceTemplate>,
}

#[derive(Debug, Deserialize)]
struct ResourceTemplate {
    term: String,
    scheme: String,
    #[serde(default)]
    attributes: TemplateAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateAttributes {
    #[serde(default)]
    occi: OcciAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct OcciAttributes {
    #[serde(default)]
    compute: ComputeAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct ComputeAttributes {
    cores: Option<Attribute>,
    memory: Option<Attribute>,
    architecture: Option<Attribute>,
}

/// rOCCI wraps every attribute value as `{"Default": value}`.
#[derive(Debug, Deserialize)]
struct Attribute {
    #[serde(rename = "Default")]
    default: Value,
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f.round() as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as u64),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn insert_keyed(templates: &mut BTreeMap<String, TemplateRecord>, record: TemplateRecord) {
    let id = record.template_id.clone();
    if templates.insert(id.clone(), record).is_some() {
        debug!(template = %id, "duplicate resource template, keeping the last one");
    }
}

/// Every `*.json` file of `dir`, in file name order. Memory is given in GB
/// and published in MB.
pub fn load_template_dir(
    dir: &Path,
    normalizer: &TemplateNormalizer,
) -> Result<BTreeMap<String, TemplateRecord>, ProviderError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut templates = BTreeMap::new();
    for path in files {
        debug!(file = %path.display(), "reading rOCCI resource templates");
        let parsed: ResourceTemplateFile = serde_json::from_str(&fs::read_to_string(&path)?)?;
        for tpl in parsed.resource_tpl {
            let compute = tpl.attributes.occi.compute;
            let record = normalizer.build(TemplateSpec {
                template_id: format!("{}{}", tpl.scheme, tpl.term),
                native_id: tpl.term,
                memory: compute
                    .memory
                    .and_then(|m| as_f64(&m.default))
                    .map(|gb| (gb * 1024.0).round() as u64),
                cpu: compute.cores.and_then(|c| as_u64(&c.default)),
                disk: None,
                platform: compute
                    .architecture
                    .and_then(|a| as_string(&a.default))
                    .map(|a| platform_for(&a)),
            });
            insert_keyed(&mut templates, record);
        }
    }
    Ok(templates)
}

/// Resource templates stored by rOCCI in the OpenNebula document pool.
/// Memory is already in MB.
pub fn templates_from_documents(
    documents: &[OneDocument],
    normalizer: &TemplateNormalizer,
) -> Result<BTreeMap<String, TemplateRecord>, ProviderError> {
    let mut templates = BTreeMap::new();
    for document in documents {
        if document.kind != Some(ROCCI_DOCUMENT_TYPE) {
            debug!(document = %document.id, "skipping non rOCCI document");
            continue;
        }
        let Some(body) = &document.body else {
            debug!(document = %document.id, "skipping rOCCI document without body");
            continue;
        };
        let body: BTreeMap<String, Value> = serde_json::from_str(body)?;
        let field = |key: &str| body.get(key).filter(|v| !v.is_null());

        let record = normalizer.build(TemplateSpec {
            template_id: format!("{FEDCLOUD_FLAVOUR_SCHEME}{}", occify(&document.name)),
            native_id: document.id.clone(),
            memory: field("memory").and_then(as_u64),
            cpu: field("vcpu").or_else(|| field("cpu")).and_then(as_u64),
            disk: None,
            platform: field("architecture").and_then(as_string).map(|a| platform_for(&a)),
        });
        insert_keyed(&mut templates, record);
    }
    Ok(templates)
}
