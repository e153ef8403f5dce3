//! Write-safe and compare-safe projections of a [`Resource`].
//!
//! The server assigns `uri`, `creationDate` and `updateDate` on every write,
//! so the original and its copy always differ there. Security descriptors
//! and bundles are bound to the original location and must not be written
//! elsewhere verbatim.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::remote::Resource;

/// Clone of `resource` that can be written under a different uri.
pub fn to_write_safe(resource: &Resource) -> Resource {
    let mut clone = resource.clone();
    clone.security_file = None;
    clone.bundles = None;
    clone
}

/// Immutable projection of a resource without server-assigned fields.
///
/// Only [`to_comparable`] builds one, and only [`logically_equal`] compares
/// two of them.
#[derive(Debug, Clone)]
pub struct ComparableResource {
    security_file: Option<Value>,
    bundles: Option<Value>,
    payload: Map<String, Value>,
}

pub fn to_comparable(resource: &Resource) -> ComparableResource {
    ComparableResource {
        security_file: resource.security_file.clone(),
        bundles: resource.bundles.clone(),
        payload: resource.payload.clone(),
    }
}

/// Strict structural equality of every remaining field.
pub fn logically_equal(a: &ComparableResource, b: &ComparableResource) -> bool {
    a.security_file == b.security_file && a.bundles == b.bundles && a.payload == b.payload
}

/// Names of the top-level fields on which `a` and `b` differ, sorted.
pub fn differing_fields(a: &ComparableResource, b: &ComparableResource) -> Vec<String> {
    let mut fields = Vec::new();
    if a.security_file != b.security_file {
        fields.push("securityFile".to_string());
    }
    if a.bundles != b.bundles {
        fields.push("bundles".to_string());
    }
    let keys: BTreeSet<&String> = a.payload.keys().chain(b.payload.keys()).collect();
    for key in keys {
        if a.payload.get(key) != b.payload.get(key) {
            fields.push(key.clone());
        }
    }
    fields.sort();
    fields
}
