//! Core types and the reconciliation pipeline for the Strata dimension store.
//!
//! This crate is deliberately free of database and CLI dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod detect;
pub mod error;
pub mod fingerprint;
pub mod keys;
pub mod merge;
pub mod reconcile;
pub mod row;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
