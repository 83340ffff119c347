//! The `DedupIndex` trait — the search index that stores dedup records.
//!
//! The engine treats the index as an opaque document store keyed by
//! [`DedupRecord::unique_id`](crate::record::DedupRecord::unique_id): adding
//! a record whose unique id already exists replaces it.

use std::future::Future;

use crate::{query::IndexQuery, record::DedupRecord};

/// Abstraction over a dedup index backend.
///
/// Implementations are shared between bulk workers without extra locking,
/// so concurrent add/query/delete calls must be safe.
pub trait DedupIndex: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or replace a record.
  fn add(
    &self,
    record: DedupRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All records matching `query`, in unique-id order.
  fn query<'a>(
    &'a self,
    query: &'a IndexQuery,
  ) -> impl Future<Output = Result<Vec<DedupRecord>, Self::Error>> + Send + 'a;

  /// Delete every record matching `query`; returns how many were removed.
  fn delete<'a>(
    &'a self,
    query: &'a IndexQuery,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Make pending writes durable and visible.
  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Compact the index.
  fn optimize(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Opens connections to a dedup index.
///
/// The service calls [`connect`](IndexConnector::connect) lazily, on first
/// use, and keeps the first connection that succeeds.
pub trait IndexConnector: Send + Sync {
  type Index: DedupIndex + 'static;
  type Error: std::error::Error + Send + Sync + 'static;

  fn connect(
    &self,
  ) -> impl Future<Output = Result<Self::Index, Self::Error>> + Send + '_;
}
