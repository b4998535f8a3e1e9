//! Error types for `custody-core`.

use thiserror::Error;

use crate::{ItemId, RequestId};

#[derive(Debug, Error)]
pub enum Error {
  /// Item names are globally unique (exact, case-sensitive match).
  #[error("an item named {0:?} already exists")]
  DuplicateName(String),

  #[error("item not found: {0}")]
  ItemNotFound(ItemId),

  /// The item exists but has no current owner to request it from.
  #[error("item {0} has no current owner")]
  UnownedItem(ItemId),

  #[error("request not found: {0}")]
  RequestNotFound(RequestId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
