//! Transfer requests and their lifecycle.
//!
//! A request is created `pending` and resolves exactly once, to `accepted` or
//! `rejected`. Both resolved states are terminal: a later accept or reject of
//! the same request is a no-op that reports failure, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, RequestId, UserId, user::UserRef};

/// Lifecycle state of a [`TransferRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
  Pending,
  Accepted,
  Rejected,
}

impl RequestStatus {
  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending) }

  pub fn is_resolved(&self) -> bool { !self.is_pending() }
}

/// A request by `requester_id` to take over an item.
///
/// `owner_id` is the item's owner *at creation time*, snapshotted and never
/// recomputed — the approval is addressed to that user even if the item
/// changes hands before the request resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
  pub request_id:   RequestId,
  pub item_id:      ItemId,
  pub requester_id: UserId,
  pub owner_id:     UserId,
  pub status:       RequestStatus,
  pub message:      Option<String>,
  pub created_at:   DateTime<Utc>,
  /// Set exactly once, when the request leaves `pending`.
  pub resolved_at:  Option<DateTime<Utc>>,
}

/// Input for [`crate::store::CustodyStore::create_request`]. The owner
/// snapshot is taken by the store at call time.
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub item_id:      ItemId,
  pub requester_id: UserId,
  pub message:      Option<String>,
}

/// A pending request as seen by the item's owner: who is asking, for what.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingRequest {
  pub request:   TransferRequest,
  pub item_name: String,
  pub requester: UserRef,
}

/// A request as seen by the person who made it: what was asked for, from
/// whom, and how it went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingRequest {
  pub request:   TransferRequest,
  pub item_name: String,
  pub owner:     UserRef,
}
