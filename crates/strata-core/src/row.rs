//! Dimension rows and source records — the two record populations.
//!
//! A [`DimensionRow`] is one persisted version of one entity. Version history
//! is append-only: once a row is superseded or its entity deleted, only the
//! terminal fields (`is_current`, `is_deleted`, `effective_to`) are updated,
//! exactly once, at expiry time. Everything else is immutable.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A tracked attribute value. Nullable; `None` survives fingerprinting and
/// storage round-trips distinctly from the empty string.
pub type AttributeValue = Option<String>;

/// The open-ended `effective_to` sentinel carried by current rows —
/// the conventional warehouse end-of-time marker.
pub fn open_end() -> DateTime<Utc> {
  Utc
    .with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
    .single()
    .expect("sentinel date is valid")
}

// ─── Source side ─────────────────────────────────────────────────────────────

/// One incoming record from the source system: a natural key plus the tracked
/// attribute tuple, in schema order. No surrogate key yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
  pub natural_key: String,
  pub attributes:  Vec<AttributeValue>,
}

/// A full incoming batch. The batch is the unit of reconciliation: entities
/// absent from it are considered to have disappeared from the source system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceBatch {
  pub records: Vec<SourceRecord>,
}

impl SourceBatch {
  pub fn new(records: Vec<SourceRecord>) -> Self { Self { records } }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

/// A source record after stage 1 — carries its content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintedRecord {
  pub natural_key: String,
  pub attributes:  Vec<AttributeValue>,
  pub fingerprint: String,
}

// ─── Target side ─────────────────────────────────────────────────────────────

/// One persisted version of one entity in the dimension table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRow {
  /// Globally unique, monotonically assigned, never reused.
  pub surrogate_key:  i64,
  /// Stable identity of the real-world entity; shared by all its versions.
  pub natural_key:    String,
  /// Tracked attribute tuple, in schema order.
  pub attributes:     Vec<AttributeValue>,
  /// Content hash over `attributes`; see [`crate::fingerprint`].
  pub fingerprint:    String,
  pub is_current:     bool,
  pub is_deleted:     bool,
  pub effective_from: DateTime<Utc>,
  /// [`open_end`] while current; stamped with the transition timestamp when
  /// the row is superseded or its entity deleted.
  pub effective_to:   DateTime<Utc>,
}

impl DimensionRow {
  /// The "active version" predicate: current and not deleted. At most one
  /// row per natural key may satisfy this at any time.
  pub fn is_active(&self) -> bool { self.is_current && !self.is_deleted }
}
