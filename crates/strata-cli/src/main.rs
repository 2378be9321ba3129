//! `strata` — reconcile JSON source batches into an SCD2 dimension table.
//!
//! Reads `strata.toml` (or the path specified with `--config`), opens an
//! in-process SQLite dimension store, and runs the requested command.
//!
//! ```toml
//! store_path = "dimension.db"
//!
//! [schema]
//! natural_key_field = "id"
//! attribute_fields  = ["col1", "col2"]
//! ```

mod batch;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use strata_core::{
  clock::SystemClock, reconcile::Reconciler, schema::DimensionSchema,
  store::DimensionStore as _,
};
use strata_store_sqlite::SqliteDimensionStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Strata SCD2 dimension reconciler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "strata.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Reconcile a JSON source batch into the dimension table.
  Load {
    /// Path to a JSON array of source objects.
    file: PathBuf,
  },
  /// Print the active (current, non-deleted) snapshot.
  Current,
  /// Print all versions of one entity, oldest first.
  History {
    /// The entity's natural key.
    natural_key: String,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct Settings {
  /// Path of the SQLite dimension table file.
  store_path: String,
  schema:     DimensionSchema,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings: Settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("STRATA").separator("__"))
    .build()
    .context("failed to read configuration")?
    .try_deserialize()
    .with_context(|| {
      format!("failed to deserialise settings from {:?}", cli.config)
    })?;

  let store = SqliteDimensionStore::open(&settings.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", settings.store_path)
    })?;

  match cli.command {
    Command::Load { file } => load(store, settings.schema, &file).await,
    Command::Current => current(store).await,
    Command::History { natural_key } => history(store, &natural_key).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn load(
  store: SqliteDimensionStore,
  schema: DimensionSchema,
  file: &PathBuf,
) -> anyhow::Result<()> {
  let raw = std::fs::read_to_string(file)
    .with_context(|| format!("reading source file {}", file.display()))?;
  let batch = batch::parse_batch(&raw, &schema)?;

  let reconciler = Reconciler::new(store, SystemClock, schema);
  let report = reconciler.run(&batch).await?;

  println!("run {} at {}", report.run_id, report.at.to_rfc3339());
  println!("  inserted:  {}", report.inserted);
  println!("  expired:   {}", report.expired);
  println!("  deleted:   {}", report.deleted);
  println!("  unchanged: {}", report.unchanged);
  Ok(())
}

async fn current(store: SqliteDimensionStore) -> anyhow::Result<()> {
  let mut rows = store.read_table().await?;
  rows.retain(|r| r.is_active());
  rows.sort_by(|a, b| a.natural_key.cmp(&b.natural_key));

  for row in rows {
    println!(
      "{}\t{}\t{}",
      row.surrogate_key,
      row.natural_key,
      render_attributes(&row.attributes)
    );
  }
  Ok(())
}

async fn history(
  store: SqliteDimensionStore,
  natural_key: &str,
) -> anyhow::Result<()> {
  let mut rows = store.read_table().await?;
  rows.retain(|r| r.natural_key == natural_key);
  rows.sort_by_key(|r| r.effective_from);

  if rows.is_empty() {
    anyhow::bail!("no versions found for natural key {natural_key:?}");
  }

  for row in rows {
    let state = if row.is_deleted {
      "deleted"
    } else if row.is_current {
      "current"
    } else {
      "expired"
    };
    println!(
      "{}\t{}\t{} -> {}\t{}",
      row.surrogate_key,
      state,
      row.effective_from.to_rfc3339(),
      row.effective_to.to_rfc3339(),
      render_attributes(&row.attributes)
    );
  }
  Ok(())
}

fn render_attributes(attributes: &[Option<String>]) -> String {
  attributes
    .iter()
    .map(|a| a.as_deref().unwrap_or("NULL"))
    .collect::<Vec<_>>()
    .join("\t")
}
