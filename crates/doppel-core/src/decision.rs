//! Human decisions about candidate pairs.
//!
//! Decisions are durable ground truth kept outside the index, one row per
//! pair and resource type. Each of the three stage columns is independent;
//! every non-blank one is replayed into the index as its own record whenever
//! either member is reindexed.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  flag::{DedupFlag, ReviewStage},
  record::PairKey,
  resource::ResourceType,
};

// ─── DecisionRow ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRow {
  pub pair:               PairKey,
  pub resource_type:      ResourceType,
  pub submitter_decision: Option<String>,
  pub workflow_decision:  Option<String>,
  pub admin_decision:     Option<String>,
  /// Note attached to reject decisions.
  pub note:               Option<String>,
  /// Note attached to verify requests.
  pub reader_note:        Option<String>,
  /// The reviewer stated the pair is not a duplicate.
  pub not_duplicate:      bool,
  /// The reviewer asked for one of the records to be fixed.
  pub to_fix:             bool,
  pub updated_at:         DateTime<Utc>,
}

/// One non-blank stage column of a [`DecisionRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDecision<'a> {
  pub stage: ReviewStage,
  pub value: &'a str,
  pub note:  Option<&'a str>,
}

impl DecisionRow {
  pub fn new(pair: PairKey, resource_type: ResourceType) -> Self {
    Self {
      pair,
      resource_type,
      submitter_decision: None,
      workflow_decision: None,
      admin_decision: None,
      note: None,
      reader_note: None,
      not_duplicate: false,
      to_fix: false,
      updated_at: Utc::now(),
    }
  }

  pub fn decision(&self, stage: ReviewStage) -> Option<&str> {
    match stage {
      ReviewStage::Submitter => self.submitter_decision.as_deref(),
      ReviewStage::Workflow => self.workflow_decision.as_deref(),
      ReviewStage::Admin => self.admin_decision.as_deref(),
    }
  }

  pub fn set_decision(&mut self, stage: ReviewStage, flag: DedupFlag) {
    let value = Some(flag.description().to_owned());
    match stage {
      ReviewStage::Submitter => self.submitter_decision = value,
      ReviewStage::Workflow => self.workflow_decision = value,
      ReviewStage::Admin => self.admin_decision = value,
    }
  }

  /// The non-blank stage decisions, each with the note it carries: verify
  /// requests carry the reader note, rejections the reject note.
  pub fn stage_decisions(&self) -> Vec<StageDecision<'_>> {
    [ReviewStage::Submitter, ReviewStage::Workflow, ReviewStage::Admin]
      .into_iter()
      .filter_map(|stage| {
        let value = self.decision(stage)?.trim();
        if value.is_empty() {
          return None;
        }
        let note = if value.starts_with("verify") {
          self.reader_note.as_deref()
        } else {
          self.note.as_deref()
        };
        Some(StageDecision { stage, value, note })
      })
      .collect()
  }
}

// ─── Store trait ─────────────────────────────────────────────────────────────

/// Durable storage for decision rows (the `dedup_reject` table).
pub trait DecisionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every row where `id` is either member of the pair.
  fn decisions_for(
    &self,
    id: i32,
  ) -> impl Future<Output = Result<Vec<DecisionRow>, Self::Error>> + Send + '_;

  /// The row of one pair, if any.
  fn decision(
    &self,
    pair: PairKey,
    resource_type: ResourceType,
  ) -> impl Future<Output = Result<Option<DecisionRow>, Self::Error>> + Send + '_;

  /// Insert or replace the row of `row.pair`.
  fn save_decision(
    &self,
    row: DecisionRow,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stage_decisions_skip_blank_columns() {
    let mut row = DecisionRow::new(PairKey::new(1, 2), ResourceType::ITEM);
    row.submitter_decision = Some("  ".into());
    row.workflow_decision = Some("verify_wf".into());
    row.admin_decision = Some("reject_admin".into());
    row.note = Some("same thesis".into());
    row.reader_note = Some("check authors".into());

    let decisions = row.stage_decisions();
    assert_eq!(decisions.len(), 2);
    assert_eq!(decisions[0].stage, ReviewStage::Workflow);
    assert_eq!(decisions[0].note, Some("check authors"));
    assert_eq!(decisions[1].stage, ReviewStage::Admin);
    assert_eq!(decisions[1].note, Some("same thesis"));
  }

  #[test]
  fn set_decision_writes_the_stage_column() {
    let mut row = DecisionRow::new(PairKey::new(1, 2), ResourceType::ITEM);
    row.set_decision(ReviewStage::Submitter, DedupFlag::RejectWs);
    assert_eq!(row.decision(ReviewStage::Submitter), Some("reject_ws"));
    assert_eq!(row.decision(ReviewStage::Admin), None);
  }
}
