//! Per-user staged conversation state.
//!
//! Multi-step flows (adding an item, attaching a message to a request) stage
//! an explicit pending action keyed by user id. Records are short-lived: they
//! expire after a TTL and are dropped on the next access, and `/cancel`
//! clears them. Nothing here is persisted — a restart simply forgets
//! half-finished conversations.

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use custody_core::{ItemId, UserId};

/// What the bot is waiting for from a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
  /// `/add_item` sent; waiting for the item name.
  AwaitingItemName,
  /// Name received; waiting for a description (or `skip`).
  AwaitingItemDescription { name: String },
  /// Request button pressed; waiting for a message (or `skip`).
  AwaitingRequestMessage { item_id: ItemId },
}

struct Staged {
  action:    PendingAction,
  staged_at: Instant,
}

/// In-memory map of staged actions with TTL expiry.
pub struct SessionMap {
  ttl:    Duration,
  staged: HashMap<UserId, Staged>,
}

impl SessionMap {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, staged: HashMap::new() }
  }

  /// Stage an action for `user`, replacing any previous one.
  pub fn stage(&mut self, user: UserId, action: PendingAction) {
    self
      .staged
      .insert(user, Staged { action, staged_at: Instant::now() });
  }

  /// Remove and return the staged action for `user`, if any and not expired.
  /// An expired record is dropped and reported as absent.
  pub fn take(&mut self, user: UserId) -> Option<PendingAction> {
    let staged = self.staged.remove(&user)?;
    if staged.staged_at.elapsed() >= self.ttl {
      return None;
    }
    Some(staged.action)
  }

  /// Drop the staged action for `user`. Returns whether one was present
  /// (expired or not).
  pub fn cancel(&mut self, user: UserId) -> bool {
    self.staged.remove(&user).is_some()
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::{PendingAction, SessionMap};

  #[test]
  fn stage_and_take() {
    let mut sessions = SessionMap::new(Duration::from_secs(600));
    sessions.stage(1, PendingAction::AwaitingItemName);

    assert_eq!(sessions.take(1), Some(PendingAction::AwaitingItemName));
    // take removes: a second take finds nothing.
    assert_eq!(sessions.take(1), None);
  }

  #[test]
  fn staging_replaces_previous_action() {
    let mut sessions = SessionMap::new(Duration::from_secs(600));
    sessions.stage(1, PendingAction::AwaitingItemName);
    sessions.stage(1, PendingAction::AwaitingRequestMessage { item_id: 7 });

    assert_eq!(
      sessions.take(1),
      Some(PendingAction::AwaitingRequestMessage { item_id: 7 })
    );
  }

  #[test]
  fn expired_action_is_dropped_on_access() {
    let mut sessions = SessionMap::new(Duration::ZERO);
    sessions.stage(1, PendingAction::AwaitingItemName);

    assert_eq!(sessions.take(1), None);
  }

  #[test]
  fn cancel_clears_staged_action() {
    let mut sessions = SessionMap::new(Duration::from_secs(600));
    sessions.stage(1, PendingAction::AwaitingItemName);

    assert!(sessions.cancel(1));
    assert!(!sessions.cancel(1));
    assert_eq!(sessions.take(1), None);
  }

  #[test]
  fn sessions_are_per_user() {
    let mut sessions = SessionMap::new(Duration::from_secs(600));
    sessions.stage(1, PendingAction::AwaitingItemName);

    assert_eq!(sessions.take(2), None);
    assert_eq!(sessions.take(1), Some(PendingAction::AwaitingItemName));
  }
}
