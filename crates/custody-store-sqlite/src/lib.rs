//! SQLite backend for the custody tracker.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One shared connection serves every
//! operation; acquisition is scoped to a closure, so release is guaranteed on
//! all exit paths.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
