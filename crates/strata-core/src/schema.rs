//! Dimension schema — the named shape of the tracked attribute tuple.
//!
//! The reconciler itself works positionally; field names exist so callers
//! (and the CLI) can project external representations into [`SourceRecord`]
//! order, and so validation failures name what is missing.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
  error::SchemaError,
  row::{SourceBatch, SourceRecord},
};

/// The schema of one dimension: a natural-key field plus an ordered list of
/// tracked attribute fields (at least one).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSchema {
  /// Field name of the natural key in external representations.
  pub natural_key_field: String,
  /// Field names of the tracked attributes, in fingerprint order.
  pub attribute_fields:  Vec<String>,
}

impl DimensionSchema {
  pub fn new(
    natural_key_field: impl Into<String>,
    attribute_fields: Vec<String>,
  ) -> Self {
    Self {
      natural_key_field: natural_key_field.into(),
      attribute_fields,
    }
  }

  /// Number of tracked attributes.
  pub fn arity(&self) -> usize { self.attribute_fields.len() }

  /// Validate a source batch against this schema.
  ///
  /// A malformed batch aborts the run before any merge is issued. Checks
  /// attribute arity, non-empty natural keys, and rejects batches carrying
  /// the same natural key twice.
  pub fn validate(&self, batch: &SourceBatch) -> Result<(), SchemaError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(batch.len());

    for (index, record) in batch.records.iter().enumerate() {
      self.validate_record(index, record)?;

      if !seen.insert(record.natural_key.as_str()) {
        return Err(SchemaError::DuplicateNaturalKey(
          record.natural_key.clone(),
        ));
      }
    }
    Ok(())
  }

  fn validate_record(
    &self,
    index: usize,
    record: &SourceRecord,
  ) -> Result<(), SchemaError> {
    if record.natural_key.is_empty() {
      return Err(SchemaError::MissingNaturalKey { index });
    }
    if record.attributes.len() != self.arity() {
      return Err(SchemaError::SchemaMismatch {
        index,
        expected: self.arity(),
        found: record.attributes.len(),
      });
    }
    Ok(())
  }
}
