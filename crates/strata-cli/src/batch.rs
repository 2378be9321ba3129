//! Source batch loading: a JSON array of flat objects, projected through the
//! configured schema into positional [`SourceRecord`]s.
//!
//! A missing or `null` attribute field becomes `None`; numbers and booleans
//! are rendered as their JSON text so mixed-typed source extracts load
//! without a cast step.

use anyhow::{Context, bail};
use serde_json::Value;
use strata_core::{
  row::{AttributeValue, SourceBatch, SourceRecord},
  schema::DimensionSchema,
};

/// Parse the contents of a source file into a batch.
pub fn parse_batch(raw: &str, schema: &DimensionSchema) -> anyhow::Result<SourceBatch> {
  let values: Vec<Value> =
    serde_json::from_str(raw).context("source file is not a JSON array")?;

  let records = values
    .iter()
    .enumerate()
    .map(|(index, value)| {
      let object = value
        .as_object()
        .with_context(|| format!("record {index} is not a JSON object"))?;

      let natural_key = match object.get(&schema.natural_key_field) {
        Some(v) => scalar_to_string(v).with_context(|| {
          format!(
            "record {index}: field {:?} is not a scalar",
            schema.natural_key_field
          )
        })?,
        None => bail!(
          "record {index}: missing natural key field {:?}",
          schema.natural_key_field
        ),
      };

      let attributes: Vec<AttributeValue> = schema
        .attribute_fields
        .iter()
        .map(|field| match object.get(field) {
          None | Some(Value::Null) => Ok(None),
          Some(v) => scalar_to_string(v).map(Some).with_context(|| {
            format!("record {index}: field {field:?} is not a scalar")
          }),
        })
        .collect::<anyhow::Result<_>>()?;

      Ok(SourceRecord {
        natural_key,
        attributes,
      })
    })
    .collect::<anyhow::Result<Vec<_>>>()?;

  Ok(SourceBatch::new(records))
}

fn scalar_to_string(value: &Value) -> anyhow::Result<String> {
  match value {
    Value::String(s) => Ok(s.clone()),
    Value::Number(n) => Ok(n.to_string()),
    Value::Bool(b) => Ok(b.to_string()),
    other => bail!("expected a scalar, got {other}"),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn schema() -> DimensionSchema {
    DimensionSchema::new("id", vec!["col1".into(), "col2".into()])
  }

  #[test]
  fn parses_records_in_schema_order() {
    let raw = r#"[{"id": "13", "col2": "west", "col1": "100"}]"#;
    let batch = parse_batch(raw, &schema()).unwrap();
    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.records[0].natural_key, "13");
    assert_eq!(
      batch.records[0].attributes,
      vec![Some("100".into()), Some("west".into())]
    );
  }

  #[test]
  fn numeric_keys_and_values_are_stringified() {
    let raw = r#"[{"id": 13, "col1": 100, "col2": true}]"#;
    let batch = parse_batch(raw, &schema()).unwrap();
    assert_eq!(batch.records[0].natural_key, "13");
    assert_eq!(
      batch.records[0].attributes,
      vec![Some("100".into()), Some("true".into())]
    );
  }

  #[test]
  fn missing_and_null_fields_become_none() {
    let raw = r#"[{"id": "1", "col1": null}]"#;
    let batch = parse_batch(raw, &schema()).unwrap();
    assert_eq!(batch.records[0].attributes, vec![None, None]);
  }

  #[test]
  fn missing_natural_key_is_an_error() {
    let raw = r#"[{"col1": "a", "col2": "b"}]"#;
    assert!(parse_batch(raw, &schema()).is_err());
  }

  #[test]
  fn non_array_input_is_an_error() {
    assert!(parse_batch(r#"{"id": "1"}"#, &schema()).is_err());
  }
}
