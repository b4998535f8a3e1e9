//! Users — the people custody is tracked between.
//!
//! Users arrive from the chat transport with a stable numeric id and whatever
//! display fields the transport knows. They are upserted on every interaction
//! and never deleted. User rows are only ever read back as display fields
//! joined onto items and requests ([`UserRef`]); there is no whole-user read.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Input for [`crate::store::CustodyStore::upsert_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub user_id:     UserId,
  pub handle:      Option<String>,
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
}

/// The display fields of a user as joined onto another row (an item's owner,
/// a request's requester). Carried wherever a name is shown to avoid a second
/// lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
  pub user_id:     UserId,
  pub handle:      Option<String>,
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
}

impl UserRef {
  /// Resolve the name to show for this user: given name if non-empty after
  /// trimming, else handle, else family name, else `User {id}`.
  pub fn display_name(&self) -> String {
    [&self.given_name, &self.handle, &self.family_name]
      .into_iter()
      .flatten()
      .map(|s| s.trim())
      .find(|s| !s.is_empty())
      .map(str::to_owned)
      .unwrap_or_else(|| format!("User {}", self.user_id))
  }
}

#[cfg(test)]
mod tests {
  use super::UserRef;

  fn user_ref(
    handle: Option<&str>,
    given: Option<&str>,
    family: Option<&str>,
  ) -> UserRef {
    UserRef {
      user_id:     42,
      handle:      handle.map(str::to_owned),
      given_name:  given.map(str::to_owned),
      family_name: family.map(str::to_owned),
    }
  }

  #[test]
  fn given_name_wins() {
    let u = user_ref(Some("jsmith"), Some("Jane"), Some("Smith"));
    assert_eq!(u.display_name(), "Jane");
  }

  #[test]
  fn falls_back_to_handle_then_family() {
    let u = user_ref(Some("jsmith"), Some(""), Some("Smith"));
    assert_eq!(u.display_name(), "jsmith");

    let u = user_ref(Some(""), Some(""), Some("Smith"));
    assert_eq!(u.display_name(), "Smith");
  }

  #[test]
  fn whitespace_only_counts_as_empty() {
    let u = user_ref(Some("   "), Some("  "), Some("Smith"));
    assert_eq!(u.display_name(), "Smith");
  }

  #[test]
  fn synthetic_fallback_when_all_empty() {
    let u = user_ref(Some(""), Some(""), Some(""));
    assert_eq!(u.display_name(), "User 42");

    let u = user_ref(None, None, None);
    assert_eq!(u.display_name(), "User 42");
  }

  #[test]
  fn display_name_is_trimmed() {
    let u = user_ref(None, Some("  Jane "), None);
    assert_eq!(u.display_name(), "Jane");
  }
}
