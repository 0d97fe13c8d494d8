use crate::cloud::Attributes;

/// Ordered list of metadata keys feeding one canonical field. The first key
/// that is present with a non-null value wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackChain {
    pub field: &'static str,
    pub keys: &'static [&'static str],
}

impl FallbackChain {
    pub const fn new(field: &'static str, keys: &'static [&'static str]) -> Self {
        Self { field, keys }
    }

    /// The winning value, or `None` once every candidate is exhausted. A
    /// present but empty value still stops the chain.
    pub fn resolve(&self, metadata: &Attributes) -> Option<String> {
        self.keys.iter().find_map(|key| metadata.get_str(key))
    }
}

/// Write `value` into `record` under `field` unless it is missing or empty.
/// Unresolved fields never erase what earlier layers put there.
pub fn apply(record: &mut Attributes, field: &str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        record.insert(field, value);
    }
}

/// Resolve and apply every chain in order.
pub fn apply_all(record: &mut Attributes, chains: &[FallbackChain], metadata: &Attributes) {
    for chain in chains {
        apply(record, chain.field, chain.resolve(metadata));
    }
}
