use serde::Serialize;

/// A running VM with its image and size resolved to display names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceRecord {
    pub instance_name: String,
    pub instance_status: String,
    pub instance_image_id: Option<String>,
    pub instance_image_name: Option<String>,
    pub instance_template_id: Option<String>,
    pub instance_template_name: Option<String>,
}
