//! Record flags and review stages.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{Error, Result};

// ─── DedupFlag ───────────────────────────────────────────────────────────────

/// What a dedup record says about its pair.
///
/// The snake_case names are the external vocabulary stored in the index and
/// in the decision table.
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
  EnumString,
  EnumIter,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DedupFlag {
  /// Self-record: the resource is indexed with these signatures.
  Fake,
  /// Candidate duplicate found by signature overlap.
  Match,
  RejectWs,
  RejectWf,
  RejectAdmin,
  VerifyWs,
  VerifyWf,
}

impl DedupFlag {
  pub fn description(self) -> &'static str { self.into() }

  /// True for flags that only come from human decisions.
  pub fn is_decision(self) -> bool { !matches!(self, Self::Fake | Self::Match) }

  /// Parse a stage decision read from the decision table.
  ///
  /// Only reject/verify values are decisions; `fake`, `match` and anything
  /// else is reported as [`Error::UnknownDecision`].
  pub fn from_decision(value: &str) -> Result<Self> {
    value
      .trim()
      .parse::<Self>()
      .ok()
      .filter(|flag| flag.is_decision())
      .ok_or_else(|| Error::UnknownDecision(value.to_owned()))
  }
}

impl fmt::Display for DedupFlag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.description())
  }
}

// ─── ReviewStage ─────────────────────────────────────────────────────────────

/// The review stage at which a human took a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStage {
  Submitter,
  Workflow,
  Admin,
}

impl ReviewStage {
  pub fn reject_flag(self) -> DedupFlag {
    match self {
      Self::Submitter => DedupFlag::RejectWs,
      Self::Workflow => DedupFlag::RejectWf,
      Self::Admin => DedupFlag::RejectAdmin,
    }
  }

  /// Admins reject or accept; they never request verification.
  pub fn verify_flag(self) -> Option<DedupFlag> {
    match self {
      Self::Submitter => Some(DedupFlag::VerifyWs),
      Self::Workflow => Some(DedupFlag::VerifyWf),
      Self::Admin => None,
    }
  }

  /// Flags that are listed as candidates to a reviewer at this stage.
  pub fn candidate_flags(self) -> Vec<DedupFlag> {
    match self {
      Self::Workflow => vec![DedupFlag::Match, DedupFlag::VerifyWs],
      Self::Submitter | Self::Admin => vec![DedupFlag::Match],
    }
  }

  /// Decisions that hide a pair from a reviewer at this stage.
  pub fn hiding_flags(self) -> Vec<DedupFlag> {
    match self {
      Self::Admin => vec![DedupFlag::RejectAdmin],
      Self::Workflow => vec![
        DedupFlag::VerifyWf,
        DedupFlag::RejectWf,
        DedupFlag::RejectAdmin,
      ],
      Self::Submitter => vec![
        DedupFlag::VerifyWs,
        DedupFlag::VerifyWf,
        DedupFlag::RejectWs,
        DedupFlag::RejectWf,
        DedupFlag::RejectAdmin,
      ],
    }
  }
}

impl fmt::Display for ReviewStage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Submitter => "submitter",
      Self::Workflow => "workflow",
      Self::Admin => "admin",
    })
  }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator as _;

  use super::*;

  #[test]
  fn vocabulary_round_trips_through_from_str() {
    for flag in DedupFlag::iter() {
      assert_eq!(flag.description().parse::<DedupFlag>().unwrap(), flag);
    }
    assert_eq!(DedupFlag::RejectAdmin.description(), "reject_admin");
    assert_eq!(DedupFlag::VerifyWs.to_string(), "verify_ws");
  }

  #[test]
  fn decisions_reject_non_decision_values() {
    assert_eq!(
      DedupFlag::from_decision(" reject_wf ").unwrap(),
      DedupFlag::RejectWf
    );
    assert!(matches!(
      DedupFlag::from_decision("match"),
      Err(Error::UnknownDecision(_))
    ));
    assert!(matches!(
      DedupFlag::from_decision("REJECT_ADMIN"),
      Err(Error::UnknownDecision(_))
    ));
    assert!(DedupFlag::from_decision("bogus").is_err());
  }

  #[test]
  fn admin_stage_has_no_verify_flag() {
    assert_eq!(ReviewStage::Admin.verify_flag(), None);
    assert_eq!(ReviewStage::Workflow.reject_flag(), DedupFlag::RejectWf);
  }
}
