use serde::Serialize;

use super::Attributes;
use super::template::DEFAULT_PLATFORM;

/// Canonical keys every published image carries, even when unset.
pub const IMAGE_FIELDS: &[&str] = &[
    "image_id",
    "image_native_id",
    "image_name",
    "image_description",
    "image_version",
    "image_marketplace_id",
    "image_os_family",
    "image_os_name",
    "image_os_version",
    "image_platform",
];

/// Normalised representation of a cloud image, regardless of the backend it
/// was discovered on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRecord {
    pub image_id: String,
    pub image_native_id: String,
    pub image_name: Option<String>,
    pub image_description: Option<String>,
    pub image_version: Option<String>,
    pub image_marketplace_id: Option<String>,
    pub image_os_family: Option<String>,
    pub image_os_name: Option<String>,
    pub image_os_version: Option<String>,
    pub image_platform: String,
    /// Backend metadata and static defaults that are not canonical fields.
    #[serde(flatten)]
    pub extensions: Attributes,
}

impl ImageRecord {
    /// An attribute bag holding every canonical key as `null`, except the
    /// platform which defaults to `amd64`.
    pub fn blank() -> Attributes {
        let mut attrs: Attributes = IMAGE_FIELDS
            .iter()
            .map(|k| (k.to_string(), serde_json::Value::Null))
            .collect();
        attrs.insert("image_platform", DEFAULT_PLATFORM);
        attrs
    }

    pub fn from_attributes(mut attrs: Attributes) -> Self {
        Self {
            image_id: attrs.take_string("image_id").unwrap_or_default(),
            image_native_id: attrs.take_string("image_native_id").unwrap_or_default(),
            image_name: attrs.take_string("image_name"),
            image_description: attrs.take_string("image_description"),
            image_version: attrs.take_string("image_version"),
            image_marketplace_id: attrs.take_string("image_marketplace_id"),
            image_os_family: attrs.take_string("image_os_family"),
            image_os_name: attrs.take_string("image_os_name"),
            image_os_version: attrs.take_string("image_os_version"),
            image_platform: attrs
                .take_string("image_platform")
                .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
            extensions: attrs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_keys_leave_the_extension_bag() {
        let mut attrs = ImageRecord::blank();
        attrs.insert("image_name", "centos");
        attrs.insert("image_native_id", "abc");
        attrs.insert("vmcatcher_event_ad_mpuri", "https://mp/1");

        let image = ImageRecord::from_attributes(attrs);

        assert_eq!(image.image_name.as_deref(), Some("centos"));
        assert_eq!(image.image_platform, "amd64");
        assert_eq!(image.image_description, None);
        assert_eq!(image.extensions.len(), 1);
        assert!(image.extensions.contains_key("vmcatcher_event_ad_mpuri"));
    }
}
