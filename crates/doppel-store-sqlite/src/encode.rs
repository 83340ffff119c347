//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Flags are stored by description
//! (`match`, `reject_admin`, ...). Plugin fields, resource metadata and
//! locations are compact JSON.

use std::{collections::BTreeMap, str::FromStr as _};

use chrono::{DateTime, Utc};
use doppel_core::{
  decision::DecisionRow,
  flag::DedupFlag,
  record::{DedupRecord, PairKey},
  resource::{Resource, ResourceType},
  signature::SignatureSet,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── DedupFlag ───────────────────────────────────────────────────────────────

pub fn decode_flag(s: &str) -> Result<DedupFlag> {
  DedupFlag::from_str(s).map_err(|_| Error::UnknownFlag(s.to_owned()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_fields(fields: &BTreeMap<String, Vec<String>>) -> Result<String> {
  Ok(serde_json::to_string(fields)?)
}

pub fn decode_fields(s: &str) -> Result<BTreeMap<String, Vec<String>>> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_list(values: &[String]) -> Result<String> {
  Ok(serde_json::to_string(values)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw columns of a `dedup_records` row, without the key it was looked up by.
pub struct RawRecord {
  pub low_id:        i32,
  pub high_id:       i32,
  pub resource_type: i32,
  pub flag:          String,
  pub note:          Option<String>,
  pub withdrawn:     bool,
  pub extra:         String,
  pub last_indexed:  String,
}

impl RawRecord {
  pub const COLUMNS: &'static str = "r.low_id, r.high_id, r.resource_type, \
    r.flag, r.note, r.withdrawn, r.extra, r.last_indexed";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      low_id:        row.get(0)?,
      high_id:       row.get(1)?,
      resource_type: row.get(2)?,
      flag:          row.get(3)?,
      note:          row.get(4)?,
      withdrawn:     row.get(5)?,
      extra:         row.get(6)?,
      last_indexed:  row.get(7)?,
    })
  }

  /// Assemble the record with the signature values read for it.
  pub fn into_record(self, signatures: SignatureSet) -> Result<DedupRecord> {
    Ok(DedupRecord {
      pair: PairKey::new(self.low_id, self.high_id),
      resource_type: ResourceType(self.resource_type),
      flag: decode_flag(&self.flag)?,
      signatures,
      note: self.note,
      withdrawn: self.withdrawn,
      extra: decode_fields(&self.extra)?,
      last_indexed: decode_dt(&self.last_indexed)?,
    })
  }
}

/// Raw columns of a `dedup_reject` row.
pub struct RawDecision {
  pub first_item_id:      i32,
  pub second_item_id:     i32,
  pub resource_type_id:   i32,
  pub submitter_decision: Option<String>,
  pub workflow_decision:  Option<String>,
  pub admin_decision:     Option<String>,
  pub note:               Option<String>,
  pub reader_note:        Option<String>,
  pub fake:               bool,
  pub tofix:              bool,
  pub updated_at:         String,
}

impl RawDecision {
  pub const COLUMNS: &'static str = "first_item_id, second_item_id, \
    resource_type_id, submitter_decision, workflow_decision, admin_decision, \
    note, reader_note, fake, tofix, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      first_item_id:      row.get(0)?,
      second_item_id:     row.get(1)?,
      resource_type_id:   row.get(2)?,
      submitter_decision: row.get(3)?,
      workflow_decision:  row.get(4)?,
      admin_decision:     row.get(5)?,
      note:               row.get(6)?,
      reader_note:        row.get(7)?,
      fake:               row.get(8)?,
      tofix:              row.get(9)?,
      updated_at:         row.get(10)?,
    })
  }

  pub fn into_row(self) -> Result<DecisionRow> {
    Ok(DecisionRow {
      pair:               PairKey::new(self.first_item_id, self.second_item_id),
      resource_type:      ResourceType(self.resource_type_id),
      submitter_decision: self.submitter_decision,
      workflow_decision:  self.workflow_decision,
      admin_decision:     self.admin_decision,
      note:               self.note,
      reader_note:        self.reader_note,
      not_duplicate:      self.fake,
      to_fix:             self.tofix,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw columns of a `resources` row.
pub struct RawResource {
  pub resource_id:   i32,
  pub resource_type: i32,
  pub withdrawn:     bool,
  pub last_modified: Option<String>,
  pub metadata:      String,
  pub locations:     String,
}

impl RawResource {
  pub fn into_resource(self) -> Result<Resource> {
    Ok(Resource {
      id:            self.resource_id,
      resource_type: ResourceType(self.resource_type),
      withdrawn:     self.withdrawn,
      last_modified: self.last_modified.as_deref().map(decode_dt).transpose()?,
      metadata:      decode_fields(&self.metadata)?,
      locations:     decode_list(&self.locations)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_decode_by_description() {
    assert_eq!(decode_flag("reject_wf").unwrap(), DedupFlag::RejectWf);
    assert!(matches!(decode_flag("nope"), Err(Error::UnknownFlag(_))));
  }

  #[test]
  fn timestamps_round_trip_at_second_precision() {
    let now = Utc::now();
    let decoded = decode_dt(&encode_dt(now)).unwrap();
    assert_eq!(decoded.timestamp(), now.timestamp());
  }
}
