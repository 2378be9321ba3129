//! The `DimensionStore` trait — the seam between the reconciler and the
//! storage engine.
//!
//! The trait is implemented by storage backends (e.g. `strata-store-sqlite`).
//! The reconciler consumes exactly the four primitives the algorithm needs:
//! a table read, a pure append, an atomic guarded merge, and the current
//! max surrogate key. Anything the engine does internally (parallelism,
//! snapshotting, its own conflict detection) is opaque here.

use std::future::Future;

use crate::{merge::MergeOp, row::DimensionRow};

/// Abstraction over a dimension table backend.
///
/// Version rows are append-only: the only mutation a backend ever performs
/// is the one-shot terminal-field update carried by a [`MergeOp`], executed
/// atomically over all rows it matches. A backend whose merge can conflict
/// with a concurrent writer should surface that as a retriable error in its
/// own error type.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait DimensionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the full dimension table, history included.
  fn read_table(
    &self,
  ) -> impl Future<Output = Result<Vec<DimensionRow>, Self::Error>> + Send + '_;

  /// Append fresh version rows. Pure insert — never update-in-place; a
  /// surrogate key collision must fail the whole append.
  fn append(
    &self,
    rows: Vec<DimensionRow>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Replace the table's contents wholesale. Initial loads only; never part
  /// of a reconciliation run.
  fn overwrite(
    &self,
    rows: Vec<DimensionRow>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Execute one guarded merge operation atomically. Returns the number of
  /// rows updated. Matching nothing is not an error — that is what makes
  /// retries of an already-applied operation no-ops.
  fn merge(
    &self,
    op: MergeOp,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Current maximum surrogate key, or 0 for an empty table.
  fn max_surrogate_key(
    &self,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;
}
