//! Core types and trait definitions for the custody item tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod error;
pub mod item;
pub mod request;
pub mod store;
pub mod transaction;
pub mod user;

pub use error::{Error, Result};

/// External stable numeric id of a chat user.
pub type UserId = i64;
/// Row id of a tracked item.
pub type ItemId = i64;
/// Row id of a transfer request.
pub type RequestId = i64;
/// Row id of an audit-trail transaction.
pub type TransactionId = i64;
