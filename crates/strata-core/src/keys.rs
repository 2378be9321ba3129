//! Surrogate key assignment — stage 3.
//!
//! Keys are `max_key + rank`, where rank is a dense 1-based ranking over the
//! (natural_key, fingerprint) total order of the upsert set. All existing
//! keys are ≤ `max_key`, so assigned keys cannot collide with persisted ones
//! under single-writer semantics; the pipeline re-checks the live max before
//! committing to catch the multi-writer case.

use crate::{error::KeyError, row::FingerprintedRecord};

/// An upsert record with its assigned surrogate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedRecord {
  pub surrogate_key: i64,
  pub record:        FingerprintedRecord,
}

/// Assign surrogate keys to `to_upsert`, starting after `max_key`.
///
/// `max_key` is 0 for an empty target. The input is (re)sorted by
/// (natural_key, fingerprint) so the ranking is a total order regardless of
/// caller ordering, and runs are reproducible.
pub fn assign(
  mut to_upsert: Vec<FingerprintedRecord>,
  max_key: i64,
) -> Result<Vec<KeyedRecord>, KeyError> {
  to_upsert.sort_by(|a, b| {
    (a.natural_key.as_str(), a.fingerprint.as_str())
      .cmp(&(b.natural_key.as_str(), b.fingerprint.as_str()))
  });

  to_upsert
    .into_iter()
    .enumerate()
    .map(|(rank0, record)| {
      let surrogate_key = max_key
        .checked_add(rank0 as i64 + 1)
        .ok_or(KeyError::KeySpaceExhausted(max_key))?;
      Ok(KeyedRecord {
        surrogate_key,
        record,
      })
    })
    .collect()
}
