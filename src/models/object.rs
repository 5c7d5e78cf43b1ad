//! Helpers for reading object references
//!
//! Objects travel through the graph builder as `DynamicObject`s. These
//! helpers expose the handful of fields the traversal needs and convert to
//! the typed k8s-openapi structs used by the typed visitors.

use crate::error::GraphError;
use crate::models::ObjectKind;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::core::DynamicObject;
use serde::de::DeserializeOwned;

/// apiVersion of the object, empty when unknown
pub fn api_version(object: &DynamicObject) -> &str {
    object
        .types
        .as_ref()
        .map(|t| t.api_version.as_str())
        .unwrap_or("")
}

/// Kind of the object, empty when unknown
pub fn kind(object: &DynamicObject) -> &str {
    object.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("")
}

/// Well-known kind of the object, if it is one and the apiVersion group matches
pub fn object_kind(object: &DynamicObject) -> Option<ObjectKind> {
    let known = ObjectKind::parse_optional(kind(object))?;
    if group_of(api_version(object)) == group_of(known.api_version()) {
        Some(known)
    } else {
        None
    }
}

pub fn name(object: &DynamicObject) -> &str {
    object.metadata.name.as_deref().unwrap_or("")
}

pub fn namespace(object: &DynamicObject) -> Option<&str> {
    object.metadata.namespace.as_deref()
}

pub fn uid(object: &DynamicObject) -> Option<&str> {
    object.metadata.uid.as_deref().filter(|uid| !uid.is_empty())
}

pub fn owner_references(object: &DynamicObject) -> &[OwnerReference] {
    object.metadata.owner_references.as_deref().unwrap_or(&[])
}

/// The owner reference flagged as controller, if any
pub fn controller_of(object: &DynamicObject) -> Option<&OwnerReference> {
    owner_references(object)
        .iter()
        .find(|owner| owner.controller == Some(true))
}

/// Whether `object` is controlled by the object with UID `owner_uid`
pub fn is_controlled_by(object: &DynamicObject, owner_uid: &str) -> bool {
    controller_of(object).is_some_and(|owner| owner.uid == owner_uid)
}

/// Human readable identifier used in logs and error messages
pub fn describe(object: &DynamicObject) -> String {
    match namespace(object) {
        Some(ns) => format!("{}/{}/{}", kind(object), ns, name(object)),
        None => format!("{}/{}", kind(object), name(object)),
    }
}

/// Split an apiVersion into (group, version)
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Lowercase plural resource name for a kind, as the API server spells it for built-in kinds
pub fn plural(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with("ss") || lower.ends_with("ch") || lower.ends_with('x') {
        format!("{}es", lower)
    } else if lower.ends_with('s') {
        lower
    } else if let Some(stem) = lower.strip_suffix('y') {
        if stem.ends_with(['a', 'e', 'o', 'u']) {
            format!("{}s", lower)
        } else {
            format!("{}ies", stem)
        }
    } else {
        format!("{}s", lower)
    }
}

fn group_of(api_version: &str) -> &str {
    split_api_version(api_version).0
}

/// Convert a dynamic object into a typed k8s-openapi struct
pub fn to_typed<K: DeserializeOwned>(object: &DynamicObject) -> Result<K, GraphError> {
    let conversion_error = |source| GraphError::Conversion {
        kind: kind(object).to_string(),
        name: name(object).to_string(),
        source,
    };
    let value = serde_json::to_value(object).map_err(conversion_error)?;
    serde_json::from_value(value).map_err(conversion_error)
}

/// Desired replica count of a ReplicaSet-family object (absent counts as zero)
pub fn desired_replicas(object: &DynamicObject) -> i64 {
    object
        .data
        .get("spec")
        .and_then(|spec| spec.get("replicas"))
        .and_then(|replicas| replicas.as_i64())
        .unwrap_or(0)
}

/// ReplicaSet-family object scaled to zero; such objects never become nodes
pub fn is_scaled_to_zero(object: &DynamicObject) -> bool {
    object_kind(object).is_some_and(|known| known.is_replica_set_family())
        && desired_replicas(object) == 0
}
