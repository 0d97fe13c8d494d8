use serde_json::Value;
use std::collections::BTreeMap;

use crate::cloud::Attributes;
use crate::helpers::xml_tree::{XmlNode, XmlTreeError, parse_document};
use crate::providers::ProviderError;

/// Document type rOCCI stores its resource templates under.
pub const ROCCI_DOCUMENT_TYPE: u32 = 999;

/// Raw pool documents as returned by `one.*pool.info`.
#[async_trait::async_trait]
pub trait OneSource: Send + Sync {
    /// XML-RPC endpoint the pools are read from.
    fn endpoint(&self) -> &str;

    async fn template_pool(&self) -> Result<String, ProviderError>;

    async fn image_pool(&self) -> Result<String, ProviderError>;

    async fn document_pool(&self) -> Result<String, ProviderError>;

    async fn vm_pool(&self) -> Result<String, ProviderError>;
}

/// A VM template with its `TEMPLATE` section flattened to lowercase keys.
/// Nested elements are joined with `_` (`DISK/IMAGE_ID` becomes
/// `disk_image_id`); on repeated elements the first occurrence wins.
#[derive(Debug, Clone, PartialEq)]
pub struct OneTemplate {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
}

impl OneTemplate {
    pub fn disk_image_id(&self) -> Option<String> {
        self.attributes.get_str("disk_image_id")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneImage {
    pub id: String,
    pub name: String,
    pub size_mb: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneDocument {
    pub id: String,
    pub name: String,
    pub kind: Option<u32>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneVm {
    pub id: String,
    pub name: String,
    pub state: Option<u32>,
    pub template_id: Option<String>,
    pub image_id: Option<String>,
}

/// Name of an OpenNebula VM `STATE` number.
pub fn vm_state_name(state: Option<u32>) -> &'static str {
    match state {
        Some(0) => "INIT",
        Some(1) => "PENDING",
        Some(2) => "HOLD",
        Some(3) => "ACTIVE",
        Some(4) => "STOPPED",
        Some(5) => "SUSPENDED",
        Some(6) => "DONE",
        Some(8) => "POWEROFF",
        Some(9) => "UNDEPLOYED",
        Some(10) => "CLONING",
        Some(11) => "CLONING_FAILURE",
        _ => "UNKNOWN",
    }
}

fn required_text(node: &XmlNode, name: &str) -> Result<String, XmlTreeError> {
    node.child_text(name)
        .map(str::to_string)
        .ok_or_else(|| XmlTreeError::Malformed(format!("{} without {name}", node.name)))
}

fn flatten(node: &XmlNode, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for child in &node.children {
        let name = child.name.to_lowercase();
        let key = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}_{name}")
        };
        if child.is_leaf() {
            out.entry(key).or_insert_with(|| Value::String(child.text.clone()));
        } else {
            flatten(child, &key, out);
        }
    }
}

pub fn parse_template_pool(xml: &str) -> Result<Vec<OneTemplate>, ProviderError> {
    let root = parse_document(xml)?;
    let mut templates = Vec::new();
    for node in root.children_named("VMTEMPLATE") {
        let mut attributes = BTreeMap::new();
        if let Some(template) = node.child("TEMPLATE") {
            flatten(template, "", &mut attributes);
        }
        templates.push(OneTemplate {
            id: required_text(node, "ID")?,
            name: required_text(node, "NAME")?,
            attributes: attributes.into_iter().collect(),
        });
    }
    Ok(templates)
}

pub fn parse_image_pool(xml: &str) -> Result<Vec<OneImage>, ProviderError> {
    let root = parse_document(xml)?;
    root.children_named("IMAGE")
        .map(|node| -> Result<OneImage, ProviderError> {
            Ok(OneImage {
                id: required_text(node, "ID")?,
                name: required_text(node, "NAME")?,
                size_mb: node.child_text("SIZE").and_then(|s| s.trim().parse().ok()),
            })
        })
        .collect()
}

pub fn parse_document_pool(xml: &str) -> Result<Vec<OneDocument>, ProviderError> {
    let root = parse_document(xml)?;
    root.children_named("DOCUMENT")
        .map(|node| -> Result<OneDocument, ProviderError> {
            Ok(OneDocument {
                id: required_text(node, "ID")?,
                name: required_text(node, "NAME")?,
                kind: node.child_text("TYPE").and_then(|s| s.trim().parse().ok()),
                body: node
                    .descend(&["TEMPLATE", "BODY"])
                    .map(|b| b.text.clone())
                    .filter(|b| !b.is_empty()),
            })
        })
        .collect()
}

pub fn parse_vm_pool(xml: &str) -> Result<Vec<OneVm>, ProviderError> {
    let root = parse_document(xml)?;
    root.children_named("VM")
        .map(|node| -> Result<OneVm, ProviderError> {
            let template = node.child("TEMPLATE");
            Ok(OneVm {
                id: required_text(node, "ID")?,
                name: required_text(node, "NAME")?,
                state: node.child_text("STATE").and_then(|s| s.trim().parse().ok()),
                template_id: template.and_then(|t| t.child_text("TEMPLATE_ID")).map(str::to_string),
                image_id: template
                    .and_then(|t| t.descend(&["DISK", "IMAGE_ID"]))
                    .map(|n| n.text.clone())
                    .filter(|t| !t.is_empty()),
            })
        })
        .collect()
}
