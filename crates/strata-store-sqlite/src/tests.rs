//! Integration tests for `SqliteDimensionStore` against an in-memory
//! database, driving the full reconciliation pipeline end-to-end.

use chrono::{TimeZone, Utc};
use strata_core::{
  clock::FixedClock,
  merge::{KeyFingerprint, MergeOp},
  reconcile::Reconciler,
  row::{DimensionRow, SourceBatch, SourceRecord, open_end},
  schema::DimensionSchema,
  store::DimensionStore,
};

use crate::{Error, SqliteDimensionStore};

async fn store() -> SqliteDimensionStore {
  SqliteDimensionStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn schema() -> DimensionSchema {
  DimensionSchema::new("id", vec!["col1".into(), "col2".into()])
}

fn record(key: &str, col1: &str, col2: &str) -> SourceRecord {
  SourceRecord {
    natural_key: key.into(),
    attributes:  vec![Some(col1.into()), Some(col2.into())],
  }
}

async fn reconciler(secs: i64) -> Reconciler<SqliteDimensionStore, FixedClock> {
  Reconciler::new(
    store().await,
    FixedClock(Utc.timestamp_opt(secs, 0).unwrap()),
    schema(),
  )
}

fn active<'a>(rows: &'a [DimensionRow], key: &str) -> Vec<&'a DimensionRow> {
  rows
    .iter()
    .filter(|r| r.natural_key == key && r.is_active())
    .collect()
}

// ─── Store primitives ────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_table_reads_empty_and_max_is_zero() {
  let s = store().await;
  assert!(s.read_table().await.unwrap().is_empty());
  assert_eq!(s.max_surrogate_key().await.unwrap(), 0);
}

#[tokio::test]
async fn append_and_read_round_trip() {
  let s = store().await;
  let from = Utc.timestamp_opt(1_000, 0).unwrap();
  let row = DimensionRow {
    surrogate_key:  1,
    natural_key:    "1".into(),
    attributes:     vec![Some("a".into()), None],
    fingerprint:    "fp".into(),
    is_current:     true,
    is_deleted:     false,
    effective_from: from,
    effective_to:   open_end(),
  };

  s.append(vec![row.clone()]).await.unwrap();

  let rows = s.read_table().await.unwrap();
  assert_eq!(rows, vec![row]);
  assert_eq!(s.max_surrogate_key().await.unwrap(), 1);
}

#[tokio::test]
async fn append_null_attribute_survives_round_trip() {
  let s = store().await;
  let row = DimensionRow {
    surrogate_key:  1,
    natural_key:    "1".into(),
    attributes:     vec![None, Some("".into())],
    fingerprint:    "fp".into(),
    is_current:     true,
    is_deleted:     false,
    effective_from: Utc.timestamp_opt(1_000, 0).unwrap(),
    effective_to:   open_end(),
  };
  s.append(vec![row]).await.unwrap();

  let rows = s.read_table().await.unwrap();
  assert_eq!(rows[0].attributes, vec![None, Some(String::new())]);
}

#[tokio::test]
async fn duplicate_surrogate_key_is_collision_and_rolls_back() {
  let s = store().await;
  let make = |key: i64, nk: &str| DimensionRow {
    surrogate_key:  key,
    natural_key:    nk.into(),
    attributes:     vec![Some("a".into())],
    fingerprint:    "fp".into(),
    is_current:     true,
    is_deleted:     false,
    effective_from: Utc.timestamp_opt(1_000, 0).unwrap(),
    effective_to:   open_end(),
  };

  s.append(vec![make(1, "1")]).await.unwrap();

  // One fresh row, one colliding row: the whole batch must be rejected.
  let err = s.append(vec![make(2, "2"), make(1, "dup")]).await.unwrap_err();
  assert!(matches!(err, Error::KeyCollision(1)));
  assert!(err.is_retriable());
  assert_eq!(s.read_table().await.unwrap().len(), 1);
}

#[tokio::test]
async fn overwrite_replaces_contents() {
  let s = store().await;
  let make = |key: i64| DimensionRow {
    surrogate_key:  key,
    natural_key:    key.to_string(),
    attributes:     vec![Some("a".into())],
    fingerprint:    "fp".into(),
    is_current:     true,
    is_deleted:     false,
    effective_from: Utc.timestamp_opt(1_000, 0).unwrap(),
    effective_to:   open_end(),
  };

  s.append(vec![make(1), make(2)]).await.unwrap();
  s.overwrite(vec![make(10)]).await.unwrap();

  let rows = s.read_table().await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].surrogate_key, 10);
}

#[tokio::test]
async fn merge_matching_nothing_is_noop() {
  let s = store().await;
  let at = Utc.timestamp_opt(2_000, 0).unwrap();

  let affected = s
    .merge(MergeOp::ExpireChanged {
      changes: vec![KeyFingerprint {
        natural_key: "absent".into(),
        fingerprint: "fp".into(),
      }],
      at,
    })
    .await
    .unwrap();
  assert_eq!(affected, 0);

  let affected = s
    .merge(MergeOp::MarkDeleted {
      keys: vec!["absent".into()],
      at,
    })
    .await
    .unwrap();
  assert_eq!(affected, 0);
}

#[tokio::test]
async fn expire_merge_rerun_is_noop() {
  // Re-running expire-on-change against already-expired rows must match
  // nothing: the guard re-checks is_current.
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![record("13", "200", "x")]))
    .await
    .unwrap();

  let at = Utc.timestamp_opt(2_000, 0).unwrap();
  let changes = vec![KeyFingerprint {
    natural_key: "13".into(),
    fingerprint: "different".into(),
  }];

  let first = r
    .store()
    .merge(MergeOp::ExpireChanged {
      changes: changes.clone(),
      at,
    })
    .await
    .unwrap();
  assert_eq!(first, 1);

  let second = r
    .store()
    .merge(MergeOp::ExpireChanged { changes, at })
    .await
    .unwrap();
  assert_eq!(second, 0);
}

// ─── Pipeline end-to-end ─────────────────────────────────────────────────────

#[tokio::test]
async fn change_detection_scenario() {
  // Target: "13" with Col1="200" active. Source: "13" with Col1="100".
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![record("13", "200", "x")]))
    .await
    .unwrap();

  let report = r
    .run(&SourceBatch::new(vec![record("13", "100", "x")]))
    .await
    .unwrap();
  assert_eq!(report.inserted, 1);
  assert_eq!(report.expired, 1);

  let rows = r.store().read_table().await.unwrap();
  assert_eq!(rows.len(), 2);

  let old = rows.iter().find(|r| !r.is_current).unwrap();
  let new = rows.iter().find(|r| r.is_current).unwrap();
  assert_eq!(old.attributes[0], Some("200".into()));
  assert_eq!(new.attributes[0], Some("100".into()));
  assert_ne!(old.fingerprint, new.fingerprint);
  assert_eq!(old.effective_to, report.at);
  assert!(new.surrogate_key > old.surrogate_key);
}

#[tokio::test]
async fn new_record_insertion_scenario() {
  // Source contains "59", absent from the target.
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![record("1", "a", "b")]))
    .await
    .unwrap();
  let old_max = r.store().max_surrogate_key().await.unwrap();

  r.run(&SourceBatch::new(vec![
    record("1", "a", "b"),
    record("59", "z", "w"),
  ]))
  .await
  .unwrap();

  let rows = r.store().read_table().await.unwrap();
  let new = active(&rows, "59");
  assert_eq!(new.len(), 1);
  assert_eq!(new[0].surrogate_key, old_max + 1);
}

#[tokio::test]
async fn deletion_marking_scenario() {
  // Target has an active "6"; the source batch omits it entirely.
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![
    record("1", "a", "b"),
    record("6", "c", "d"),
  ]))
  .await
  .unwrap();

  let report = r
    .run(&SourceBatch::new(vec![record("1", "a", "b")]))
    .await
    .unwrap();
  assert_eq!(report.deleted, 1);
  assert_eq!(report.inserted, 0);

  let rows = r.store().read_table().await.unwrap();
  let six: Vec<_> =
    rows.iter().filter(|r| r.natural_key == "6").collect();
  assert_eq!(six.len(), 1, "no new row appended for a deleted entity");
  assert!(six[0].is_deleted);
  assert!(!six[0].is_current);
  assert_eq!(six[0].effective_to, report.at);
}

#[tokio::test]
async fn unchanged_passthrough_scenario() {
  // Source row for "1" is identical to the target's active row.
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![record("1", "a", "b")]))
    .await
    .unwrap();
  let before = r.store().read_table().await.unwrap();

  let report = r
    .run(&SourceBatch::new(vec![record("1", "a", "b")]))
    .await
    .unwrap();
  assert!(report.is_noop());
  assert_eq!(report.unchanged, 1);
  assert_eq!(r.store().read_table().await.unwrap(), before);
}

#[tokio::test]
async fn idempotence_of_unchanged_input() {
  let r = reconciler(1_000).await;
  let batch = SourceBatch::new(vec![
    record("1", "a", "b"),
    record("2", "c", "d"),
    record("3", "e", "f"),
  ]);

  r.run(&batch).await.unwrap();
  let report = r.run(&batch).await.unwrap();
  assert!(report.is_noop());
}

#[tokio::test]
async fn single_active_version_invariant() {
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![
    record("1", "a", "b"),
    record("2", "c", "d"),
  ]))
  .await
  .unwrap();
  r.run(&SourceBatch::new(vec![
    record("1", "a2", "b"),
    record("3", "g", "h"),
  ]))
  .await
  .unwrap();
  r.run(&SourceBatch::new(vec![record("1", "a3", "b")]))
    .await
    .unwrap();

  let rows = r.store().read_table().await.unwrap();
  for key in ["1", "2", "3"] {
    assert!(
      active(&rows, key).len() <= 1,
      "natural key {key:?} has more than one active version"
    );
  }
}

#[tokio::test]
async fn key_monotonicity_across_runs() {
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![
    record("1", "a", "b"),
    record("2", "c", "d"),
  ]))
  .await
  .unwrap();

  let max_before = r.store().max_surrogate_key().await.unwrap();
  let keys_before: Vec<i64> = r
    .store()
    .read_table()
    .await
    .unwrap()
    .iter()
    .map(|r| r.surrogate_key)
    .collect();

  r.run(&SourceBatch::new(vec![
    record("1", "changed", "b"),
    record("2", "c", "d"),
    record("4", "i", "j"),
  ]))
  .await
  .unwrap();

  let rows = r.store().read_table().await.unwrap();
  for row in rows.iter().filter(|r| !keys_before.contains(&r.surrogate_key)) {
    assert!(row.surrogate_key > max_before);
  }
}

#[tokio::test]
async fn no_silent_data_loss() {
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![
    record("1", "a", "b"),
    record("2", "c", "d"),
    record("3", "e", "f"),
  ]))
  .await
  .unwrap();
  let before = r.store().read_table().await.unwrap();

  // One change, one deletion, one unchanged.
  r.run(&SourceBatch::new(vec![
    record("1", "a2", "b"),
    record("3", "e", "f"),
  ]))
  .await
  .unwrap();

  let after = r.store().read_table().await.unwrap();
  for old in &before {
    assert!(
      after.iter().any(|r| r.natural_key == old.natural_key),
      "natural key {:?} lost",
      old.natural_key
    );
    let by_key = after
      .iter()
      .find(|r| r.surrogate_key == old.surrogate_key)
      .expect("row retrievable by surrogate key");
    assert_eq!(by_key.attributes, old.attributes);
    assert_eq!(by_key.fingerprint, old.fingerprint);
  }
}

#[tokio::test]
async fn history_intervals_partition_time() {
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![record("1", "v1", "x")]))
    .await
    .unwrap();

  let r2 = Reconciler::new(
    r.store().clone(),
    FixedClock(Utc.timestamp_opt(2_000, 0).unwrap()),
    schema(),
  );
  r2.run(&SourceBatch::new(vec![record("1", "v2", "x")]))
    .await
    .unwrap();

  let r3 = Reconciler::new(
    r.store().clone(),
    FixedClock(Utc.timestamp_opt(3_000, 0).unwrap()),
    schema(),
  );
  r3.run(&SourceBatch::new(vec![record("1", "v3", "x")]))
    .await
    .unwrap();

  let mut versions = r.store().read_table().await.unwrap();
  versions.sort_by_key(|r| r.effective_from);
  assert_eq!(versions.len(), 3);

  // Gap-free, non-overlapping chronological partition.
  for pair in versions.windows(2) {
    assert_eq!(pair[0].effective_to, pair[1].effective_from);
  }
  assert_eq!(versions[2].effective_to, open_end());
  assert!(versions[2].is_current);
}

#[tokio::test]
async fn mixed_run_applies_all_three_operations() {
  let r = reconciler(1_000).await;
  r.run(&SourceBatch::new(vec![
    record("1", "keep", "x"),
    record("2", "change-me", "x"),
    record("3", "delete-me", "x"),
  ]))
  .await
  .unwrap();

  let report = r
    .run(&SourceBatch::new(vec![
      record("1", "keep", "x"),
      record("2", "changed", "x"),
      record("4", "new", "x"),
    ]))
    .await
    .unwrap();

  assert_eq!(report.unchanged, 1);
  assert_eq!(report.expired, 1);
  assert_eq!(report.inserted, 2); // changed "2" + new "4"
  assert_eq!(report.deleted, 1);

  let rows = r.store().read_table().await.unwrap();
  assert_eq!(active(&rows, "1").len(), 1);
  assert_eq!(active(&rows, "2").len(), 1);
  assert_eq!(active(&rows, "3").len(), 0);
  assert_eq!(active(&rows, "4").len(), 1);
}
