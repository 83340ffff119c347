//! Resources — the entities the engine deduplicates.
//!
//! The engine never owns a resource's lifecycle. It reads the id, type,
//! withdrawn flag and metadata, and asks the surrounding system of record to
//! resolve ids through [`ResourceLookup`].

use std::{collections::BTreeMap, fmt, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── ResourceType ────────────────────────────────────────────────────────────

/// Numeric type code of a resource. Both members of a pair always share it.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct ResourceType(pub i32);

impl ResourceType {
  /// Publication items.
  pub const ITEM: Self = Self(2);
  /// Researcher profiles.
  pub const PERSON: Self = Self(9);
  pub const PROJECT: Self = Self(10);
  pub const ORG_UNIT: Self = Self(11);
  /// First code of the generic (dynamically configured) entity types.
  pub const DYNAMIC_START: Self = Self(1000);

  /// The well-known types, in the order a full rebuild visits them.
  pub const WELL_KNOWN: [Self; 5] = [
    Self::DYNAMIC_START,
    Self::ORG_UNIT,
    Self::PROJECT,
    Self::PERSON,
    Self::ITEM,
  ];

  pub fn code(self) -> i32 { self.0 }

  /// Short label used in log lines.
  pub fn label(self) -> &'static str {
    match self {
      Self::ITEM => "item",
      Self::PERSON => "person",
      Self::PROJECT => "project",
      Self::ORG_UNIT => "orgunit",
      Self(code) if code >= Self::DYNAMIC_START.0 => "dynamic",
      _ => "other",
    }
  }
}

impl fmt::Display for ResourceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Resource ────────────────────────────────────────────────────────────────

/// A snapshot of a resource as seen by signature extractors and index
/// plugins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
  pub id:            i32,
  pub resource_type: ResourceType,
  pub withdrawn:     bool,
  /// When the resource last changed in the system of record, if known.
  pub last_modified: Option<DateTime<Utc>>,
  /// Metadata values keyed by field name (e.g. `dc.title`).
  pub metadata:      BTreeMap<String, Vec<String>>,
  /// Names of the containers the resource lives in (collections,
  /// communities, parent organisations).
  pub locations:     Vec<String>,
}

impl Resource {
  pub fn new(id: i32, resource_type: ResourceType) -> Self {
    Self {
      id,
      resource_type,
      withdrawn: false,
      last_modified: None,
      metadata: BTreeMap::new(),
      locations: Vec::new(),
    }
  }

  /// Append a metadata value.
  pub fn with_value(
    mut self,
    field: impl Into<String>,
    value: impl Into<String>,
  ) -> Self {
    self.metadata.entry(field.into()).or_default().push(value.into());
    self
  }

  pub fn with_location(mut self, location: impl Into<String>) -> Self {
    self.locations.push(location.into());
    self
  }

  pub fn withdrawn(mut self, withdrawn: bool) -> Self {
    self.withdrawn = withdrawn;
    self
  }

  /// All values of `field`, or an empty slice.
  pub fn values(&self, field: &str) -> &[String] {
    self.metadata.get(field).map(Vec::as_slice).unwrap_or(&[])
  }
}

// ─── Lookup trait ────────────────────────────────────────────────────────────

/// Read access to the system of record that owns resources.
pub trait ResourceLookup: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Resolve a resource. Returns `None` once it no longer exists.
  fn find(
    &self,
    id: i32,
    resource_type: ResourceType,
  ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send + '_;

  /// Every id of the given type, ascending.
  fn all_ids(
    &self,
    resource_type: ResourceType,
  ) -> impl Future<Output = Result<Vec<i32>, Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn labels_cover_dynamic_range() {
    assert_eq!(ResourceType::ITEM.label(), "item");
    assert_eq!(ResourceType(1003).label(), "dynamic");
    assert_eq!(ResourceType(7).label(), "other");
  }

  #[test]
  fn values_of_missing_field_are_empty() {
    let r = Resource::new(1, ResourceType::ITEM).with_value("dc.title", "A");
    assert_eq!(r.values("dc.title"), ["A".to_string()]);
    assert!(r.values("dc.identifier.doi").is_empty());
  }
}
