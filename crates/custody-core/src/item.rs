//! Items — the physical things whose custody is tracked.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ItemId, UserId, user::UserRef};

/// A tracked item. `owner_id` is the user who currently holds it; it is
/// reassigned only through an accepted transfer request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
  pub item_id:     ItemId,
  /// Globally unique (exact, case-sensitive match).
  pub name:        String,
  pub description: Option<String>,
  pub owner_id:    Option<UserId>,
  pub created_at:  DateTime<Utc>,
}

/// Input for [`crate::store::CustodyStore::register_item`].
#[derive(Debug, Clone)]
pub struct NewItem {
  pub name:        String,
  pub description: Option<String>,
  pub owner_id:    UserId,
}

/// An item joined with its current owner's display fields — the read model
/// for listings and search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemWithOwner {
  pub item:  Item,
  /// `None` only when the item has no current owner.
  pub owner: Option<UserRef>,
}

impl ItemWithOwner {
  /// Name to show for the current holder; `"nobody"` for an unowned item.
  pub fn owner_display(&self) -> String {
    self
      .owner
      .as_ref()
      .map(UserRef::display_name)
      .unwrap_or_else(|| "nobody".to_owned())
  }
}
