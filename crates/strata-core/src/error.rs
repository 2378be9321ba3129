//! Error types for `strata-core`.
//!
//! The pure stages (validation, key assignment) have their own small error
//! enums; [`Error`] is the pipeline-level type, generic over the backend's
//! error so storage failures propagate without boxing.

use thiserror::Error;

/// Source batch shape violations. Raised before any storage call is issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
  /// A record's attribute tuple does not match the schema's arity.
  #[error("record {index}: expected {expected} tracked attributes, found {found}")]
  SchemaMismatch {
    index:    usize,
    expected: usize,
    found:    usize,
  },

  /// A record has an empty natural key.
  #[error("record {index}: natural key is empty")]
  MissingNaturalKey { index: usize },

  /// The same natural key appears more than once in the batch. Two versions
  /// of one entity in a single batch cannot both be the active version.
  #[error("duplicate natural key in source batch: {0:?}")]
  DuplicateNaturalKey(String),
}

/// Surrogate key assignment failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
  /// `max_key + rank` overflowed the key type.
  #[error("surrogate key space exhausted past {0}")]
  KeySpaceExhausted(i64),
}

/// Pipeline-level error, generic over the storage backend's error type.
#[derive(Debug, Error)]
pub enum Error<S>
where
  S: std::error::Error + Send + Sync + 'static,
{
  #[error(transparent)]
  Schema(#[from] SchemaError),

  #[error(transparent)]
  Keys(#[from] KeyError),

  /// The table's max surrogate key advanced between assignment and commit —
  /// another writer ran concurrently. Retry the whole run from fresh reads.
  #[error(
    "surrogate keys assigned from max {assigned_from} but the live max is now \
     {live_max}; rerun from a fresh read"
  )]
  KeyCollision { assigned_from: i64, live_max: i64 },

  #[error("store error: {0}")]
  Store(#[source] S),
}

impl<S> Error<S>
where
  S: std::error::Error + Send + Sync + 'static,
{
  /// Whether rerunning the full pipeline from fresh reads can succeed.
  /// Storage-layer conflicts carry their own retriability; see the backend.
  pub fn is_retriable(&self) -> bool {
    matches!(self, Self::KeyCollision { .. })
  }
}

pub type Result<T, S> = std::result::Result<T, Error<S>>;
