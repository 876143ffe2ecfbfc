//! Attribute canonicalisation.
//!
//! The attributes of a fact are its input record minus the reserved keys
//! `entity_id` and `event_time` (spec §4.1, §6.2). Canonical encoding sorts
//! keys lexicographically at every nesting level and serialises
//! deterministically; byte equality of the canonical form is the definition
//! of semantic equality used for de-duplication (spec §3.2).
//!
//! `serde_json::Value`'s object variant is a `BTreeMap` (this crate does not
//! enable the `preserve_order` feature), so any `Value` we build already
//! iterates its keys in sorted order at every nesting level — canonicalising
//! is therefore just "build attributes into a `Value` the normal way, then
//! serialise it."

pub const RESERVED_KEYS: [&str; 2] = ["entity_id", "event_time"];

/// Strips the reserved keys from an input record, producing the canonical
/// attribute value for a fact.
pub fn extract_attributes(
    record: &serde_json::Map<String, serde_json::Value>,
) -> serde_json::Value {
    let mut attrs = serde_json::Map::new();
    for (k, v) in record {
        if !RESERVED_KEYS.contains(&k.as_str()) {
            attrs.insert(k.clone(), v.clone());
        }
    }
    serde_json::Value::Object(attrs)
}

/// Serialises a value to its canonical byte encoding. Two attribute sets are
/// semantically equal iff their canonical bytes are equal.
pub fn canonical_bytes(value: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(value).expect("serde_json::Value serialisation cannot fail")
}

/// Serialises a value to its canonical text encoding, for storage as the
/// `attributes` column (spec §6.3).
pub fn canonical_string(value: &serde_json::Value) -> String {
    serde_json::to_string(value).expect("serde_json::Value serialisation cannot fail")
}
