//! The reconciliation pipeline — stages 1–4 wired together.
//!
//! Control flow is strictly sequential: validate → fingerprint → read →
//! detect → assign keys → expire-on-change → append → mark-deleted. Stages
//! 1–3 are pure in-memory transforms; only stage 4 touches the store, so a
//! failed run has either committed nothing or left individually-retriable
//! merge state behind. Retries restart the whole run from fresh reads.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error,
  clock::Clock,
  detect,
  fingerprint::fingerprint_batch,
  keys,
  merge::{self, KeyFingerprint, MergeOp},
  row::SourceBatch,
  schema::DimensionSchema,
  store::DimensionStore,
};

// ─── Run report ──────────────────────────────────────────────────────────────

/// What one reconciliation run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub run_id:    Uuid,
  /// The transition instant stamped on every row this run touched.
  pub at:        DateTime<Utc>,
  /// Fresh version rows appended (new and changed entities alike).
  pub inserted:  usize,
  /// Old versions expired because their entity's content changed.
  pub expired:   usize,
  /// Active versions marked deleted because their entity disappeared.
  pub deleted:   usize,
  /// Source records that matched an active version exactly.
  pub unchanged: usize,
}

impl RunReport {
  /// True when the run committed no changes.
  pub fn is_noop(&self) -> bool {
    self.inserted == 0 && self.expired == 0 && self.deleted == 0
  }
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

/// The SCD2 reconciler: one schema, one store, one clock.
///
/// Assumes single-writer semantics per target table; concurrent runs are
/// detected (stale max key, backend merge conflicts) and surfaced as
/// retriable errors, not resolved internally.
pub struct Reconciler<S, C> {
  store:  S,
  clock:  C,
  schema: DimensionSchema,
}

impl<S, C> Reconciler<S, C>
where
  S: DimensionStore,
  C: Clock,
{
  pub fn new(store: S, clock: C, schema: DimensionSchema) -> Self {
    Self {
      store,
      clock,
      schema,
    }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn schema(&self) -> &DimensionSchema { &self.schema }

  /// Run the full pipeline for one source batch.
  pub async fn run(
    &self,
    batch: &SourceBatch,
  ) -> Result<RunReport, Error<S::Error>> {
    let run_id = Uuid::new_v4();
    tracing::info!(%run_id, records = batch.len(), "reconciliation run started");

    // Stage 0: shape check. Fatal before any storage call.
    self.schema.validate(batch)?;

    // Stage 1: fingerprint the batch.
    let fingerprinted = fingerprint_batch(&batch.records);

    // Stage 2: classify against the target's active slice.
    let target = self.store.read_table().await.map_err(Error::Store)?;
    let changes = detect::detect(&fingerprinted, &target);
    tracing::debug!(
      %run_id,
      to_upsert = changes.to_upsert.len(),
      to_delete = changes.to_delete.len(),
      unchanged = changes.unchanged,
      "change detection complete"
    );

    let at = self.clock.now();

    if changes.is_noop() {
      tracing::info!(%run_id, "no changes detected");
      return Ok(RunReport {
        run_id,
        at,
        inserted: 0,
        expired: 0,
        deleted: 0,
        unchanged: changes.unchanged,
      });
    }

    // Stage 3: assign surrogate keys from the live max.
    let max_key = self.store.max_surrogate_key().await.map_err(Error::Store)?;
    let keyed = keys::assign(changes.to_upsert, max_key)?;

    // Another writer may have advanced the key space since assignment;
    // commit only against the max we assigned from.
    let live_max =
      self.store.max_surrogate_key().await.map_err(Error::Store)?;
    if live_max != max_key {
      return Err(Error::KeyCollision {
        assigned_from: max_key,
        live_max,
      });
    }

    // Stage 4a: expire old versions of changed entities. Must precede the
    // insert so no entity ever has two active versions. New entities match
    // no rows and pass through.
    let expire = MergeOp::ExpireChanged {
      changes: keyed
        .iter()
        .map(|k| KeyFingerprint {
          natural_key: k.record.natural_key.clone(),
          fingerprint: k.record.fingerprint.clone(),
        })
        .collect(),
      at,
    };
    let expired = if expire.is_empty() {
      0
    } else {
      self.store.merge(expire).await.map_err(Error::Store)?
    };

    // Stage 4b: append the fresh versions.
    let inserts = merge::build_inserts(keyed, at);
    let inserted = inserts.len();
    if inserted > 0 {
      self.store.append(inserts).await.map_err(Error::Store)?;
    }

    // Stage 4c: mark disappeared entities deleted.
    let deleted = if changes.to_delete.is_empty() {
      0
    } else {
      self
        .store
        .merge(MergeOp::MarkDeleted {
          keys: changes.to_delete,
          at,
        })
        .await
        .map_err(Error::Store)?
    };

    let report = RunReport {
      run_id,
      at,
      inserted,
      expired,
      deleted,
      unchanged: changes.unchanged,
    };
    tracing::info!(
      %run_id,
      inserted = report.inserted,
      expired = report.expired,
      deleted = report.deleted,
      unchanged = report.unchanged,
      "reconciliation run complete"
    );
    Ok(report)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
