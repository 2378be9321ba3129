//! The merge vocabulary — stage 4's typed operations against the store.
//!
//! Mutations are expressed as guarded operations rather than raw SQL, the
//! same way lifecycle events are typed rather than generic updates. Each
//! [`MergeOp`] is executed by the backend as a single atomic transaction over
//! all matched rows; a re-run against already-expired rows matches nothing
//! and is a no-op, which is what makes whole-run retries safe.

use chrono::{DateTime, Utc};

use crate::{
  keys::KeyedRecord,
  row::{DimensionRow, open_end},
};

/// Join row for the expire-on-change branch: the entity plus the fingerprint
/// of its incoming replacement version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyFingerprint {
  pub natural_key: String,
  pub fingerprint: String,
}

/// A guarded, atomic multi-row update against the dimension table, keyed by
/// natural key.
#[derive(Debug, Clone)]
pub enum MergeOp {
  /// Expire-on-change: for each entry, update target rows where
  /// `natural_key` matches AND `is_current` AND the stored fingerprint
  /// differs from the incoming one — set `is_current = false`,
  /// `effective_to = at`. Must run before the insert of the replacement
  /// versions.
  ExpireChanged {
    changes: Vec<KeyFingerprint>,
    at:      DateTime<Utc>,
  },

  /// Expire-on-disappearance: for each key, update target rows where
  /// `natural_key` matches AND `is_current` AND NOT `is_deleted` — set
  /// `is_deleted = true`, `is_current = false`, `effective_to = at`.
  /// Flipping `is_current` too keeps the single-active-version invariant.
  MarkDeleted {
    keys: Vec<String>,
    at:   DateTime<Utc>,
  },
}

impl MergeOp {
  /// Number of join rows carried by the operation.
  pub fn len(&self) -> usize {
    match self {
      Self::ExpireChanged { changes, .. } => changes.len(),
      Self::MarkDeleted { keys, .. } => keys.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Build the insert rows for stage 4(b): fresh current versions with their
/// assigned surrogate keys, valid from `at` until the open-end sentinel.
pub fn build_inserts(
  keyed: Vec<KeyedRecord>,
  at: DateTime<Utc>,
) -> Vec<DimensionRow> {
  keyed
    .into_iter()
    .map(|k| DimensionRow {
      surrogate_key:  k.surrogate_key,
      natural_key:    k.record.natural_key,
      attributes:     k.record.attributes,
      fingerprint:    k.record.fingerprint,
      is_current:     true,
      is_deleted:     false,
      effective_from: at,
      effective_to:   open_end(),
    })
    .collect()
}
