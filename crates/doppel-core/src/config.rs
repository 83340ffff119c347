//! Engine configuration.

use serde::Deserialize;

/// Tunables of [`DedupService`](crate::service::DedupService).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
  /// Worker count for bulk rebuilds.
  pub indexer_threads:     usize,
  /// Hide records of withdrawn resources from reviewers, and drop them
  /// during a consistency sweep.
  pub ignore_withdrawn:    bool,
  /// Run a probe query before the first use of a new index connection.
  pub validate_connection: bool,
  /// Write MATCH records whose signature intersection came out empty.
  pub write_empty_matches: bool,
}

impl Default for DedupConfig {
  fn default() -> Self {
    Self {
      indexer_threads:     5,
      ignore_withdrawn:    false,
      validate_connection: true,
      write_empty_matches: false,
    }
  }
}
