//! [`SqliteDimensionStore`] — the SQLite implementation of
//! [`DimensionStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use strata_core::{
  merge::MergeOp,
  row::DimensionRow,
  store::DimensionStore,
};

use crate::{
  Error, Result,
  encode::{RawDimensionRow, encode_attributes, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A dimension table backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Each
/// [`MergeOp`] and each append runs inside one SQLite transaction, so every
/// stage-4 operation is all-or-nothing as the reconciler requires.
#[derive(Clone)]
pub struct SqliteDimensionStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteDimensionStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(map_db_err)?;
    Ok(())
  }

  /// Encode rows into the parameter tuples the insert loop binds.
  fn encode_rows(
    rows: Vec<DimensionRow>,
  ) -> Result<Vec<(i64, String, String, String, bool, bool, String, String)>>
  {
    rows
      .into_iter()
      .map(|row| {
        Ok((
          row.surrogate_key,
          row.natural_key,
          encode_attributes(&row.attributes)?,
          row.fingerprint,
          row.is_current,
          row.is_deleted,
          encode_dt(row.effective_from),
          encode_dt(row.effective_to),
        ))
      })
      .collect()
  }
}

/// Map a connection-level error, classifying lock contention as a retriable
/// merge conflict.
fn map_db_err(e: tokio_rusqlite::Error) -> Error {
  if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
    ffi_err,
    _,
  )) = &e
    && matches!(
      ffi_err.code,
      rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
    )
  {
    return Error::MergeConflict;
  }
  Error::Database(e)
}

// ─── DimensionStore impl ─────────────────────────────────────────────────────

impl DimensionStore for SqliteDimensionStore {
  type Error = Error;

  async fn read_table(&self) -> Result<Vec<DimensionRow>> {
    let raw: Vec<RawDimensionRow> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT surrogate_key, natural_key, attributes, fingerprint,
                  is_current, is_deleted, effective_from, effective_to
             FROM dimension
            ORDER BY surrogate_key",
        )?;
        let rows = stmt
          .query_map([], |r| {
            Ok(RawDimensionRow {
              surrogate_key:  r.get(0)?,
              natural_key:    r.get(1)?,
              attributes:     r.get(2)?,
              fingerprint:    r.get(3)?,
              is_current:     r.get(4)?,
              is_deleted:     r.get(5)?,
              effective_from: r.get(6)?,
              effective_to:   r.get(7)?,
            })
          })?
          .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
      })
      .await
      .map_err(map_db_err)?;

    raw.into_iter().map(RawDimensionRow::into_row).collect()
  }

  async fn append(&self, rows: Vec<DimensionRow>) -> Result<()> {
    let encoded = Self::encode_rows(rows)?;

    // The existence pre-check runs inside the same transaction as the
    // inserts, so a stale-max assignment is caught before commit and the
    // transaction rolls back whole.
    let collision: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        for (key, nk, attrs, fp, cur, del, from, to) in &encoded {
          let exists: bool = tx
            .query_row(
              "SELECT 1 FROM dimension WHERE surrogate_key = ?1",
              rusqlite::params![key],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if exists {
            return Ok(Some(*key));
          }
          tx.execute(
            "INSERT INTO dimension (
               surrogate_key, natural_key, attributes, fingerprint,
               is_current, is_deleted, effective_from, effective_to
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![key, nk, attrs, fp, cur, del, from, to],
          )?;
        }
        tx.commit()?;
        Ok(None)
      })
      .await
      .map_err(map_db_err)?;

    match collision {
      Some(key) => Err(Error::KeyCollision(key)),
      None => Ok(()),
    }
  }

  async fn overwrite(&self, rows: Vec<DimensionRow>) -> Result<()> {
    let encoded = Self::encode_rows(rows)?;

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM dimension", [])?;
        for (key, nk, attrs, fp, cur, del, from, to) in &encoded {
          tx.execute(
            "INSERT INTO dimension (
               surrogate_key, natural_key, attributes, fingerprint,
               is_current, is_deleted, effective_from, effective_to
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![key, nk, attrs, fp, cur, del, from, to],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(map_db_err)?;
    Ok(())
  }

  async fn merge(&self, op: MergeOp) -> Result<usize> {
    let affected = match op {
      MergeOp::ExpireChanged { changes, at } => {
        let at_str = encode_dt(at);
        self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0;
            for change in &changes {
              affected += tx.execute(
                "UPDATE dimension
                    SET is_current = 0, effective_to = ?3
                  WHERE natural_key = ?1
                    AND is_current = 1
                    AND fingerprint != ?2",
                rusqlite::params![
                  change.natural_key,
                  change.fingerprint,
                  at_str
                ],
              )?;
            }
            tx.commit()?;
            Ok(affected)
          })
          .await
          .map_err(map_db_err)?
      }

      MergeOp::MarkDeleted { keys, at } => {
        let at_str = encode_dt(at);
        self
          .conn
          .call(move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0;
            for key in &keys {
              affected += tx.execute(
                "UPDATE dimension
                    SET is_deleted = 1, is_current = 0, effective_to = ?2
                  WHERE natural_key = ?1
                    AND is_current = 1
                    AND is_deleted = 0",
                rusqlite::params![key, at_str],
              )?;
            }
            tx.commit()?;
            Ok(affected)
          })
          .await
          .map_err(map_db_err)?
      }
    };

    tracing::debug!(affected, "merge operation applied");
    Ok(affected)
  }

  async fn max_surrogate_key(&self) -> Result<i64> {
    self
      .conn
      .call(|conn| {
        let max: i64 = conn.query_row(
          "SELECT COALESCE(MAX(surrogate_key), 0) FROM dimension",
          [],
          |r| r.get(0),
        )?;
        Ok(max)
      })
      .await
      .map_err(map_db_err)
  }
}
