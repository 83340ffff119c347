//! Bulk rebuild plumbing: id partitioning and the worker pool.

use std::{future::Future, ops::AddAssign};

use tokio::task::JoinSet;
use tracing::error;

/// The two passes of a bulk rebuild. Every FAKE record must exist before
/// any resource is matched, or candidates indexed later in the same batch
/// would be missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  /// Replay decisions and write FAKE records.
  Seed,
  /// Recompute MATCH records against the complete FAKE pool.
  Match,
}

/// Per-resource outcome counts of a bulk run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkReport {
  pub processed: usize,
  /// Missing resources, or resources without signatures.
  pub skipped:   usize,
  pub failed:    usize,
}

impl BulkReport {
  pub fn total(&self) -> usize { self.processed + self.skipped + self.failed }
}

impl AddAssign for BulkReport {
  fn add_assign(&mut self, rhs: Self) {
    self.processed += rhs.processed;
    self.skipped += rhs.skipped;
    self.failed += rhs.failed;
  }
}

/// Outcome of a two-phase rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildReport {
  pub seeded:  BulkReport,
  pub matched: BulkReport,
}

/// Partition `ids` into at most `parts` contiguous, disjoint, non-empty
/// chunks whose sizes differ by at most one.
pub fn split_ids(ids: &[i32], parts: usize) -> Vec<Vec<i32>> {
  let parts = parts.max(1).min(ids.len());
  if parts == 0 {
    return Vec::new();
  }
  let base = ids.len() / parts;
  let extra = ids.len() % parts;
  let mut chunks = Vec::with_capacity(parts);
  let mut start = 0;
  for n in 0..parts {
    let len = base + usize::from(n < extra);
    chunks.push(ids[start..start + len].to_vec());
    start += len;
  }
  chunks
}

/// Run one task per chunk and wait for all of them.
///
/// A task that panics is logged and counted as a single failure; the
/// other tasks keep running.
pub async fn run_pool<F, Fut>(chunks: Vec<Vec<i32>>, worker: F) -> BulkReport
where
  F: Fn(usize, Vec<i32>) -> Fut,
  Fut: Future<Output = BulkReport> + Send + 'static,
{
  let mut tasks = JoinSet::new();
  for (n, chunk) in chunks.into_iter().enumerate() {
    tasks.spawn(worker(n, chunk));
  }

  let mut report = BulkReport::default();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok(chunk_report) => report += chunk_report,
      Err(e) => {
        error!(error = %e, "indexer worker failed");
        report.failed += 1;
      }
    }
  }
  report
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_is_balanced_and_disjoint() {
    let ids: Vec<i32> = (1..=11).collect();
    let chunks = split_ids(&ids, 5);
    let sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, [3, 2, 2, 2, 2]);
    assert_eq!(chunks.concat(), ids);
  }

  #[test]
  fn split_never_yields_empty_chunks() {
    assert_eq!(split_ids(&[1, 2], 5), vec![vec![1], vec![2]]);
    assert!(split_ids(&[], 5).is_empty());
    assert_eq!(split_ids(&[1, 2, 3], 0), vec![vec![1, 2, 3]]);
  }

  #[tokio::test]
  async fn pool_sums_worker_reports() {
    let chunks = split_ids(&[1, 2, 3, 4, 5, 6, 7], 3);
    let report = run_pool(chunks, |_, chunk| async move {
      BulkReport {
        processed: chunk.iter().filter(|id| *id % 2 == 1).count(),
        skipped:   chunk.iter().filter(|id| *id % 2 == 0).count(),
        failed:    0,
      }
    })
    .await;
    assert_eq!(report, BulkReport { processed: 4, skipped: 3, failed: 0 });
    assert_eq!(report.total(), 7);
  }

  #[tokio::test]
  async fn a_panicking_worker_does_not_stop_the_others() {
    let chunks = split_ids(&[1, 2, 3], 3);
    let report = run_pool(chunks, |n, chunk| async move {
      if n == 1 {
        panic!("worker {n} blew up");
      }
      BulkReport { processed: chunk.len(), ..BulkReport::default() }
    })
    .await;
    assert_eq!(report.processed, 2);
    assert_eq!(report.failed, 1);
  }
}
