//! Backend-independent normalization: identifier mangling, fallback chains
//! and the per-record-kind normalizers.

pub mod endpoints;
pub mod fallback;
pub mod images;
pub mod instances;
pub mod occify;
pub mod templates;

pub use endpoints::{
    CatalogEndpoint, CatalogEntry, EndpointProfile, EndpointResolver, ProbeError, ProbeResponse, ProbedVersions,
    VersionProbe,
};
pub use fallback::FallbackChain;
pub use images::{ImageNormalizer, ImageRules, ImageSource};
pub use instances::{CatalogLookup, InstanceRef, normalize_instances};
pub use occify::{occify, synthesize_id};
pub use templates::{TemplateNormalizer, TemplateSpec};
