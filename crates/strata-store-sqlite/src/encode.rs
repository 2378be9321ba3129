//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; the attribute tuple is stored
//! as a compact JSON array so nulls round-trip distinctly from empty strings.

use chrono::{DateTime, Utc};
use strata_core::row::{AttributeValue, DimensionRow};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Attributes ──────────────────────────────────────────────────────────────

pub fn encode_attributes(attributes: &[AttributeValue]) -> Result<String> {
  Ok(serde_json::to_string(attributes)?)
}

pub fn decode_attributes(s: &str) -> Result<Vec<AttributeValue>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw values read directly from a `dimension` row.
pub struct RawDimensionRow {
  pub surrogate_key:  i64,
  pub natural_key:    String,
  pub attributes:     String,
  pub fingerprint:    String,
  pub is_current:     bool,
  pub is_deleted:     bool,
  pub effective_from: String,
  pub effective_to:   String,
}

impl RawDimensionRow {
  pub fn into_row(self) -> Result<DimensionRow> {
    Ok(DimensionRow {
      surrogate_key:  self.surrogate_key,
      natural_key:    self.natural_key,
      attributes:     decode_attributes(&self.attributes)?,
      fingerprint:    self.fingerprint,
      is_current:     self.is_current,
      is_deleted:     self.is_deleted,
      effective_from: decode_dt(&self.effective_from)?,
      effective_to:   decode_dt(&self.effective_to)?,
    })
  }
}
