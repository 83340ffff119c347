//! The dedup record schema.
//!
//! Every record describes an unordered pair of resource ids (a self-pair for
//! FAKE records) under one flag. The pair is always normalised to
//! `(min, max)`, so `(a, b)` and `(b, a)` address the same record and later
//! writes overwrite earlier ones.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  flag::DedupFlag,
  resource::ResourceType,
  signature::SignatureSet,
};

// ─── Index field names ───────────────────────────────────────────────────────

pub const RESOURCE_TYPE_FIELD: &str = "dedup.resourcetype";
pub const RESOURCE_ID_FIELD: &str = "dedup.id";
pub const RESOURCE_IDS_FIELD: &str = "dedup.ids";
pub const FLAG_FIELD: &str = "dedup.flag";
pub const WITHDRAWN_FIELD: &str = "dedup.withdrawn";

// ─── PairKey ─────────────────────────────────────────────────────────────────

/// A sort-normalised pair of resource ids.
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
pub struct PairKey {
  low:  i32,
  high: i32,
}

impl PairKey {
  pub fn new(a: i32, b: i32) -> Self {
    let mut ids = [a, b];
    ids.sort_unstable();
    Self { low: ids[0], high: ids[1] }
  }

  /// The key of a resource's own FAKE record.
  pub fn of_self(id: i32) -> Self { Self { low: id, high: id } }

  pub fn low(self) -> i32 { self.low }

  pub fn high(self) -> i32 { self.high }

  pub fn is_self(self) -> bool { self.low == self.high }

  pub fn contains(self, id: i32) -> bool { self.low == id || self.high == id }

  /// The member that is not `id`, if `id` is one of two distinct members.
  pub fn other(self, id: i32) -> Option<i32> {
    match (self.low == id, self.high == id) {
      (true, false) => Some(self.high),
      (false, true) => Some(self.low),
      _ => None,
    }
  }

  /// One id for a self-pair, two otherwise.
  pub fn members(self) -> Vec<i32> {
    if self.is_self() { vec![self.low] } else { vec![self.low, self.high] }
  }

  /// `<low>-<high>-<flag>`: one record per pair and flag.
  pub fn unique_id(self, flag: DedupFlag) -> String { format!("{self}-{flag}") }
}

impl fmt::Display for PairKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.low, self.high)
  }
}

impl FromStr for PairKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::InvalidPairKey(s.to_owned());
    let (a, b) = s.split_once('-').ok_or_else(invalid)?;
    let a = a.parse().map_err(|_| invalid())?;
    let b = b.parse().map_err(|_| invalid())?;
    Ok(Self::new(a, b))
  }
}

// ─── DedupRecord ─────────────────────────────────────────────────────────────

/// The unit persisted to the dedup index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DedupRecord {
  pub pair:          PairKey,
  pub resource_type: ResourceType,
  pub flag:          DedupFlag,
  /// Overlapping (MATCH) or contributing (FAKE) signature values.
  pub signatures:    SignatureSet,
  pub note:          Option<String>,
  /// Set by the withdrawn plugin when a member is withdrawn.
  pub withdrawn:     bool,
  /// Plugin-contributed fields.
  pub extra:         BTreeMap<String, Vec<String>>,
  pub last_indexed:  DateTime<Utc>,
}

impl DedupRecord {
  pub fn new(
    first_id: i32,
    second_id: i32,
    flag: DedupFlag,
    resource_type: ResourceType,
  ) -> Self {
    Self {
      pair: PairKey::new(first_id, second_id),
      resource_type,
      flag,
      signatures: SignatureSet::new(),
      note: None,
      withdrawn: false,
      extra: BTreeMap::new(),
      last_indexed: Utc::now(),
    }
  }

  pub fn with_signatures(mut self, signatures: SignatureSet) -> Self {
    self.signatures = signatures;
    self
  }

  /// Attach a note; blank notes are dropped.
  pub fn with_note(mut self, note: Option<&str>) -> Self {
    self.note = note
      .map(str::trim)
      .filter(|n| !n.is_empty())
      .map(str::to_owned);
    self
  }

  pub fn unique_id(&self) -> String { self.pair.unique_id(self.flag) }

  /// The pair key without the flag suffix; groups all records of a pair.
  pub fn resource_id(&self) -> String { self.pair.to_string() }

  pub fn resource_ids(&self) -> Vec<i32> { self.pair.members() }

  /// Append a plugin-contributed value; empty values are ignored.
  pub fn add_extra(&mut self, field: &str, value: impl Into<String>) {
    let value = value.into();
    if value.is_empty() {
      return;
    }
    let values = self.extra.entry(field.to_owned()).or_default();
    if !values.contains(&value) {
      values.push(value);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pair_key_is_symmetric() {
    for flag in [DedupFlag::Match, DedupFlag::RejectAdmin] {
      let ab = DedupRecord::new(20, 10, flag, ResourceType::ITEM);
      let ba = DedupRecord::new(10, 20, flag, ResourceType::ITEM);
      assert_eq!(ab.unique_id(), ba.unique_id());
      assert_eq!(ab.resource_id(), "10-20");
      assert_eq!(ab.resource_ids(), [10, 20]);
    }
  }

  #[test]
  fn unique_id_carries_the_flag() {
    let fake = DedupRecord::new(7, 7, DedupFlag::Fake, ResourceType::ITEM);
    assert_eq!(fake.unique_id(), "7-7-fake");
    assert_eq!(fake.resource_ids(), [7]);
  }

  #[test]
  fn other_member() {
    let pair = PairKey::new(5, 3);
    assert_eq!(pair.other(3), Some(5));
    assert_eq!(pair.other(5), Some(3));
    assert_eq!(pair.other(4), None);
    assert_eq!(PairKey::of_self(3).other(3), None);
  }

  #[test]
  fn pair_key_parses_and_normalises() {
    assert_eq!("9-2".parse::<PairKey>().unwrap(), PairKey::new(2, 9));
    assert!("9".parse::<PairKey>().is_err());
    assert!("a-b".parse::<PairKey>().is_err());
  }

  #[test]
  fn blank_notes_are_dropped() {
    let r = DedupRecord::new(1, 2, DedupFlag::RejectWs, ResourceType::ITEM)
      .with_note(Some("  "));
    assert_eq!(r.note, None);
  }
}
