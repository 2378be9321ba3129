//! Novelty, change, and disappearance detection — stage 2.
//!
//! Classifies an incoming fingerprinted batch against the active slice of
//! the target table into the minimal set of storage operations: rows that
//! need a fresh version (new or changed — not distinguished here, both get
//! an insert) and entities that have disappeared from the source.

use std::collections::HashSet;

use crate::row::{DimensionRow, FingerprintedRecord};

/// The result of classifying a source batch against the target's active
/// slice.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
  /// Source records with no active (natural_key, fingerprint) match: wholly
  /// new entities and changed entities alike. Sorted by natural key for
  /// deterministic downstream key assignment.
  pub to_upsert: Vec<FingerprintedRecord>,
  /// Natural keys of active target entities absent from the source batch.
  pub to_delete: Vec<String>,
  /// Count of source records that matched an active version exactly.
  pub unchanged: usize,
}

impl ChangeSet {
  /// True when the run would touch nothing.
  pub fn is_noop(&self) -> bool {
    self.to_upsert.is_empty() && self.to_delete.is_empty()
  }
}

/// Classify `source` against `target`.
///
/// `target` is the full table; only its active rows (`is_current` and not
/// deleted) participate. A source record whose (natural_key, fingerprint)
/// pair matches an active row is unchanged and excluded — no redundant
/// version is ever created. Deleted entities that reappear in the source
/// fall out naturally: their old rows are no longer active, so the pair
/// cannot match and a fresh version is inserted.
pub fn detect(
  source: &[FingerprintedRecord],
  target: &[DimensionRow],
) -> ChangeSet {
  let active: Vec<&DimensionRow> =
    target.iter().filter(|row| row.is_active()).collect();

  let active_pairs: HashSet<(&str, &str)> = active
    .iter()
    .map(|row| (row.natural_key.as_str(), row.fingerprint.as_str()))
    .collect();

  let source_keys: HashSet<&str> =
    source.iter().map(|r| r.natural_key.as_str()).collect();

  let mut to_upsert: Vec<FingerprintedRecord> = source
    .iter()
    .filter(|r| {
      !active_pairs.contains(&(r.natural_key.as_str(), r.fingerprint.as_str()))
    })
    .cloned()
    .collect();
  to_upsert.sort_by(|a, b| {
    (a.natural_key.as_str(), a.fingerprint.as_str())
      .cmp(&(b.natural_key.as_str(), b.fingerprint.as_str()))
  });

  let mut to_delete: Vec<String> = active
    .iter()
    .filter(|row| !source_keys.contains(row.natural_key.as_str()))
    .map(|row| row.natural_key.clone())
    .collect();
  to_delete.sort();

  let unchanged = source.len() - to_upsert.len();

  ChangeSet {
    to_upsert,
    to_delete,
    unchanged,
  }
}
