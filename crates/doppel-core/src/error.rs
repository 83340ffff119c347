//! Error types for `doppel-core`.

use thiserror::Error;

use crate::flag::ReviewStage;

/// A backend error, boxed so the service stays generic over its stores.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("index error: {0}")]
  Index(#[source] BoxError),

  #[error("the dedup index is unavailable")]
  IndexUnavailable,

  #[error("decision store error: {0}")]
  Decisions(#[source] BoxError),

  #[error("resource lookup error: {0}")]
  Lookup(#[source] BoxError),

  #[error("unknown decision value: {0:?}")]
  UnknownDecision(String),

  #[error("invalid pair key: {0:?}")]
  InvalidPairKey(String),

  #[error("there is no verify decision at the {0} stage")]
  NoVerifyAtStage(ReviewStage),
}

impl Error {
  pub(crate) fn index(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Index(Box::new(e))
  }

  pub(crate) fn decisions(
    e: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::Decisions(Box::new(e))
  }

  pub(crate) fn lookup(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Lookup(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
