//! Index plugins: extra fields derived from the member resources of a pair.
//!
//! Plugins run when FAKE and MATCH records are built. They receive the
//! members that still resolve and mutate the record; they never touch the
//! index.

use std::fmt;

use crate::{record::DedupRecord, resource::Resource};

pub trait IndexPlugin: Send + Sync + fmt::Debug {
  fn name(&self) -> &str;

  fn enrich(&self, members: &[&Resource], record: &mut DedupRecord);
}

/// Marks a record withdrawn when any member is withdrawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawnPlugin;

impl IndexPlugin for WithdrawnPlugin {
  fn name(&self) -> &str { "withdrawn" }

  fn enrich(&self, members: &[&Resource], record: &mut DedupRecord) {
    if members.iter().any(|m| m.withdrawn) {
      record.withdrawn = true;
    }
  }
}

/// Copies the members' parent location names under `location`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationPlugin;

impl LocationPlugin {
  pub const FIELD: &'static str = "location";
}

impl IndexPlugin for LocationPlugin {
  fn name(&self) -> &str { "location" }

  fn enrich(&self, members: &[&Resource], record: &mut DedupRecord) {
    for location in members.iter().flat_map(|m| &m.locations) {
      record.add_extra(Self::FIELD, location.clone());
    }
  }
}

/// Copies the members' values of a metadata field under `target`.
#[derive(Debug, Clone)]
pub struct MetadataPlugin {
  field:  String,
  target: String,
}

impl MetadataPlugin {
  pub fn new(field: impl Into<String>, target: impl Into<String>) -> Self {
    Self { field: field.into(), target: target.into() }
  }
}

impl IndexPlugin for MetadataPlugin {
  fn name(&self) -> &str { &self.target }

  fn enrich(&self, members: &[&Resource], record: &mut DedupRecord) {
    for value in members.iter().flat_map(|m| m.values(&self.field)) {
      record.add_extra(&self.target, value.clone());
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{flag::DedupFlag, resource::ResourceType};

  fn record() -> DedupRecord {
    DedupRecord::new(1, 2, DedupFlag::Match, ResourceType::ITEM)
  }

  #[test]
  fn withdrawn_if_any_member_is() {
    let a = Resource::new(1, ResourceType::ITEM);
    let b = Resource::new(2, ResourceType::ITEM).withdrawn(true);
    let mut r = record();
    WithdrawnPlugin.enrich(&[&a], &mut r);
    assert!(!r.withdrawn);
    WithdrawnPlugin.enrich(&[&a, &b], &mut r);
    assert!(r.withdrawn);
  }

  #[test]
  fn locations_are_unioned() {
    let a = Resource::new(1, ResourceType::ITEM).with_location("Theses");
    let b = Resource::new(2, ResourceType::ITEM)
      .with_location("Theses")
      .with_location("Physics");
    let mut r = record();
    LocationPlugin.enrich(&[&a, &b], &mut r);
    assert_eq!(r.extra["location"], ["Theses", "Physics"]);
  }

  #[test]
  fn metadata_values_are_copied() {
    let a = Resource::new(1, ResourceType::ITEM).with_value("dc.date.issued", "2020");
    let mut r = record();
    MetadataPlugin::new("dc.date.issued", "year").enrich(&[&a], &mut r);
    assert_eq!(r.extra["year"], ["2020"]);
  }
}
