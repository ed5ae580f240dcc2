//! Instrument tag helpers. Tags are `-`-segmented, e.g. `FIT-100-PT`.

/// Key used for registry lookups: trimmed and upper-cased.
pub fn registry_key(tag: &str) -> String {
    tag.trim().to_uppercase()
}

/// All segments except the last. A tag without a separator is its own base.
pub fn tag_base(tag: &str) -> &str {
    match tag.rfind('-') {
        Some(idx) => &tag[..idx],
        None => tag,
    }
}

/// Temperature-element tags carry the `TE` marker somewhere in the tag.
pub fn is_temperature_element(tag: &str) -> bool {
    tag.contains("TE")
}
