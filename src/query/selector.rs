//! Label selector matching for Service and Pod relationships
//!
//! Controllers stamp their pods with revision labels that never appear in a
//! user-written selector. Those keys are dropped from selectors before they
//! are matched or used as listing keys.

use std::collections::BTreeMap;

/// Label keys injected by workload controllers
pub const INJECTED_KEYS: &[&str] = &[
    "pod-template-hash",
    "controller-revision-hash",
    "pod-template-generation",
];

pub fn is_injected(key: &str) -> bool {
    INJECTED_KEYS.contains(&key)
}

/// Selector with controller-injected keys removed
pub fn normalized(selector: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    selector
        .iter()
        .filter(|(key, _)| !is_injected(key))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Whether `labels` satisfy `selector`
///
/// An empty selector (after normalization) selects nothing.
pub fn matches(selector: &BTreeMap<String, String>, labels: &BTreeMap<String, String>) -> bool {
    let selector = normalized(selector);
    !selector.is_empty() && selector.iter().all(|(k, v)| labels.get(k) == Some(v))
}
