//! Error type for `strata-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// An appended surrogate key already exists — the reconciler assigned
  /// from a stale max. Retry the whole run from a fresh read.
  #[error("surrogate key {0} already exists")]
  KeyCollision(i64),

  /// A concurrent writer held the database lock past the busy timeout.
  /// Retriable by restarting the full pipeline.
  #[error("merge conflict: concurrent modification of the dimension table")]
  MergeConflict,
}

impl Error {
  /// Whether rerunning the full pipeline from fresh reads can succeed.
  pub fn is_retriable(&self) -> bool {
    matches!(self, Self::KeyCollision(_) | Self::MergeConflict)
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
