mod attributes;
mod endpoint;
mod image;
mod instance;
mod template;

pub use attributes::Attributes;
pub use endpoint::{ApiType, EndpointRecord};
pub use image::{IMAGE_FIELDS, ImageRecord};
pub use instance::InstanceRecord;
pub use template::{DEFAULT_NETWORK, DEFAULT_PLATFORM, TemplateRecord};
