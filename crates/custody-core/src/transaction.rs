//! The custody audit trail.
//!
//! One row per ownership change, appended as a side effect of registering an
//! item or accepting a request. Rows are never mutated or deleted. The core
//! never reads them back; read access is a reporting concern of the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, TransactionId, UserId};

/// How an item came to its `to_user_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
  /// Ownership set when the item was first registered.
  InitialAssignment,
  /// Ownership moved through an accepted transfer request.
  Transfer,
}

/// One entry in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  pub transaction_id: TransactionId,
  pub item_id:        ItemId,
  /// `None` for the initial assignment.
  pub from_user_id:   Option<UserId>,
  pub to_user_id:     UserId,
  pub kind:           TransactionKind,
  pub created_at:     DateTime<Utc>,
}
