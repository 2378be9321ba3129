//! SQLite backend for the Strata dimension store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Merge operations execute inside
//! a single SQLite transaction, giving the all-or-nothing semantics the
//! reconciler expects from each stage-4 operation.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteDimensionStore;

#[cfg(test)]
mod tests;
