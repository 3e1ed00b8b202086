//! Filter state model and the merge rules shared by prompt extraction and manual edits.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::search::extractor::ExtractedFilters;

/// Filter keys populated by prompt extraction. Every other key is opaque.
pub mod keys {
    pub const MIN_EXPERIENCE: &str = "minExperience";
    pub const SKILLS: &str = "skills";
    pub const LOCATION: &str = "location";
    pub const JOB_TITLE: &str = "jobTitle";
    pub const UNIVERSITIES: &str = "universities";

    pub const EXTRACTED: [&str; 5] = [MIN_EXPERIENCE, SKILLS, LOCATION, JOB_TITLE, UNIVERSITIES];
}

/// A sparse set of filter values keyed by filter name.
pub type FilterMap = BTreeMap<String, Value>;

/// Accumulated filters for one search session.
///
/// Values are never mutated in place. A merge that changes nothing hands back
/// the same allocation, so callers can use [`FilterState::ptr_eq`] to skip
/// redundant downstream work.
#[derive(Debug, Clone, Default)]
pub struct FilterState(Arc<FilterMap>);

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &FilterMap {
        &self.0
    }

    /// True when both handles point at the same underlying state.
    pub fn ptr_eq(&self, other: &FilterState) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for FilterState {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl From<FilterMap> for FilterState {
    fn from(map: FilterMap) -> Self {
        Self(Arc::new(map))
    }
}

impl Serialize for FilterState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_map().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FilterState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        FilterMap::deserialize(deserializer).map(FilterState::from)
    }
}

/// Merges `incoming` into `current`. Last write wins per key.
///
/// Keys absent from `incoming` are left alone. If every incoming value already
/// equals the current one, `current` itself is returned.
pub fn reconcile(current: &FilterState, incoming: &FilterMap) -> FilterState {
    let changed: Vec<(&String, &Value)> = incoming
        .iter()
        .filter(|(key, value)| current.get(key) != Some(*value))
        .collect();

    if changed.is_empty() {
        return current.clone();
    }

    let mut next = current.as_map().clone();
    for (key, value) in changed {
        next.insert(key.clone(), value.clone());
    }
    FilterState::from(next)
}

/// Direct user edit of one filter. Shares the no-op rule with [`reconcile`].
pub fn update_single_filter(
    current: &FilterState,
    key: impl Into<String>,
    value: Value,
) -> FilterState {
    let mut incoming = FilterMap::new();
    incoming.insert(key.into(), value);
    reconcile(current, &incoming)
}

pub fn reconcile_extracted(current: &FilterState, extracted: ExtractedFilters) -> FilterState {
    reconcile(current, &FilterMap::from(extracted))
}
