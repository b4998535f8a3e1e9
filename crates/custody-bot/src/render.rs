//! Reply text and inline keyboards.
//!
//! Pure functions from read models to the strings and button rows the bot
//! sends. All owner/requester names go through
//! [`UserRef::display_name`](custody_core::user::UserRef::display_name).

use chrono::{DateTime, Utc};
use custody_core::{
  UserId,
  item::{Item, ItemWithOwner},
  request::{IncomingRequest, OutgoingRequest, RequestStatus},
};

use crate::telegram::InlineKeyboardButton;

fn date(dt: DateTime<Utc>) -> String {
  dt.format("%Y-%m-%d").to_string()
}

fn status_glyph(status: RequestStatus) -> &'static str {
  match status {
    RequestStatus::Pending => "⏳",
    RequestStatus::Accepted => "✅",
    RequestStatus::Rejected => "❌",
  }
}

fn status_word(status: RequestStatus) -> &'static str {
  match status {
    RequestStatus::Pending => "Pending",
    RequestStatus::Accepted => "Accepted",
    RequestStatus::Rejected => "Rejected",
  }
}

// ─── Static replies ──────────────────────────────────────────────────────────

pub fn welcome(name: &str) -> String {
  format!(
    "👋 Welcome to the custody tracker, {name}!\n\n\
     This bot helps you and your team keep track of shared items.\n\n\
     Available commands:\n\
     • /my_items — view items you currently hold\n\
     • /add_item — add a new item to the system\n\
     • /list — view all items in the system\n\
     • /search — search for specific items\n\
     • /my_requests — view your pending requests\n\
     • /pending_requests — view requests waiting for your approval\n\
     • /help — show the help message"
  )
}

pub fn help() -> String {
  "🔧 Custody Tracker Help\n\n\
   Main commands:\n\
   • /my_items — see all items you currently hold\n\
   • /add_item — register a new item in the system\n\
   • /list — view all items with their current holders\n\
   • /search <term> — find items by name or description\n\
   • /my_requests — check the status of your requests\n\
   • /pending_requests — approve or reject incoming requests\n\n\
   How it works:\n\
   1. Add items to the system using /add_item\n\
   2. Browse all items using /list or search using /search\n\
   3. Request items from other users\n\
   4. Accept or reject requests from others\n\
   5. Every change of hands is recorded automatically"
    .to_owned()
}

pub fn search_usage() -> String {
  "🔍 Please provide a search term.\n\
   Usage: /search <item name>\n\
   Example: /search usb drive"
    .to_owned()
}

pub fn add_item_prompt() -> String {
  "📝 Let's add a new item to the system!\n\n\
   Please enter the name of the item:"
    .to_owned()
}

pub fn description_prompt(name: &str) -> String {
  format!(
    "Great! Now please enter a description for '{name}':\n\
     (You can also type 'skip' to leave it empty)"
  )
}

pub fn item_added(name: &str) -> String {
  format!(
    "✅ Successfully added '{name}' to the system!\n\
     You are now the holder of this item.\n\n\
     Others can find it using /search {name}"
  )
}

pub fn duplicate_name(name: &str) -> String {
  format!(
    "❌ Failed to add '{name}'. An item with this name already exists.\n\
     Please choose a different name."
  )
}

// ─── Item listings ───────────────────────────────────────────────────────────

pub fn my_items(items: &[Item]) -> String {
  if items.is_empty() {
    return "📦 You don't currently hold any items.\n\
            Use /search to find available items or /add_item to register new ones."
      .to_owned();
  }

  let mut text = String::from("📦 Your current items:\n\n");
  for item in items {
    text.push_str(&format!("• {}\n", item.name));
    if let Some(description) = &item.description {
      text.push_str(&format!("  {description}\n"));
    }
    text.push_str(&format!("  📅 Added: {}\n\n", date(item.created_at)));
  }
  text
}

/// One keyboard row requesting `item`, shown only to non-holders.
fn request_button(item: &ItemWithOwner) -> Vec<InlineKeyboardButton> {
  vec![InlineKeyboardButton {
    text:          format!("🙋 Request {}", item.item.name),
    callback_data: format!("request_{}", item.item.item_id),
  }]
}

pub fn all_items(
  items: &[ItemWithOwner],
  viewer: UserId,
) -> (String, Vec<Vec<InlineKeyboardButton>>) {
  if items.is_empty() {
    let text = "📦 No items are registered in the system yet.\n\
                Use /add_item to register the first one!"
      .to_owned();
    return (text, vec![]);
  }

  let mut text = String::from("📦 All items in the system:\n\n");
  let mut keyboard = Vec::new();

  for item in items {
    text.push_str(&format!("• {}\n", item.item.name));
    if let Some(description) = &item.item.description {
      text.push_str(&format!("  {description}\n"));
    }
    text.push_str(&format!("  📍 Currently with: {}\n", item.owner_display()));
    text.push_str(&format!("  📅 Added: {}\n\n", date(item.item.created_at)));

    if item.item.owner_id != Some(viewer) {
      keyboard.push(request_button(item));
    }
  }

  if keyboard.is_empty() {
    text.push_str("You currently hold all items in the system.");
  }
  (text, keyboard)
}

pub fn search_results(
  term: &str,
  items: &[ItemWithOwner],
  viewer: UserId,
) -> (String, Vec<Vec<InlineKeyboardButton>>) {
  if items.is_empty() {
    let text = format!(
      "❌ No items found matching '{term}'\n\
       Try a different search term or check the spelling."
    );
    return (text, vec![]);
  }

  let mut text = format!("🔍 Search results for '{term}':\n\n");
  let mut keyboard = Vec::new();

  for item in items {
    text.push_str(&format!("• {}\n", item.item.name));
    if let Some(description) = &item.item.description {
      text.push_str(&format!("  {description}\n"));
    }
    text.push_str(&format!("  📍 Currently with: {}\n\n", item.owner_display()));

    if item.item.owner_id != Some(viewer) {
      keyboard.push(request_button(item));
    }
  }
  (text, keyboard)
}

// ─── Request flows ───────────────────────────────────────────────────────────

pub fn request_prompt(item: &ItemWithOwner) -> String {
  format!(
    "📝 You're requesting {} from {}.\n\n\
     Would you like to include a message with your request?\n\
     (Type your message or 'skip' to send without a message)",
    item.item.name,
    item.owner_display()
  )
}

pub fn request_sent(item_name: &str) -> String {
  format!(
    "✅ Your request for {item_name} has been sent!\n\
     The current holder will be notified and can accept or reject it.\n\n\
     Check the status anytime with /my_requests"
  )
}

pub fn owner_notification(requester: &str, item_name: &str) -> String {
  format!(
    "🔔 New request!\n\n\
     {requester} has asked for your {item_name}\n\
     Use /pending_requests to respond."
  )
}

pub fn incoming_requests(
  requests: &[IncomingRequest],
) -> (String, Vec<Vec<InlineKeyboardButton>>) {
  if requests.is_empty() {
    let text = "📬 No pending requests for your items.\n\
                You'll be notified when someone asks for one!"
      .to_owned();
    return (text, vec![]);
  }

  let mut text = String::from("📬 Pending requests for your items:\n\n");
  let mut keyboard = Vec::new();

  for incoming in requests {
    text.push_str(&format!(
      "🙋 {} requested by {}\n",
      incoming.item_name,
      incoming.requester.display_name()
    ));
    if let Some(message) = &incoming.request.message {
      text.push_str(&format!("  Message: {message}\n"));
    }
    text.push_str(&format!(
      "  📅 Requested: {}\n\n",
      date(incoming.request.created_at)
    ));

    keyboard.push(vec![
      InlineKeyboardButton {
        text:          "✅ Accept".to_owned(),
        callback_data: format!("accept_{}", incoming.request.request_id),
      },
      InlineKeyboardButton {
        text:          "❌ Reject".to_owned(),
        callback_data: format!("reject_{}", incoming.request.request_id),
      },
    ]);
  }
  (text, keyboard)
}

pub fn outgoing_requests(requests: &[OutgoingRequest]) -> String {
  if requests.is_empty() {
    return "📋 You haven't made any requests yet.\n\
            Use /search to find items and request them!"
      .to_owned();
  }

  let mut text = String::from("📋 Your requests:\n\n");
  for outgoing in requests {
    text.push_str(&format!(
      "{} {}\n",
      status_glyph(outgoing.request.status),
      outgoing.item_name
    ));
    text.push_str(&format!("  From: {}\n", outgoing.owner.display_name()));
    text.push_str(&format!(
      "  Status: {}\n",
      status_word(outgoing.request.status)
    ));
    text.push_str(&format!(
      "  📅 Requested: {}\n\n",
      date(outgoing.request.created_at)
    ));
  }
  text
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use custody_core::{
    item::{Item, ItemWithOwner},
    user::UserRef,
  };

  use super::all_items;

  fn item_with_owner(item_id: i64, name: &str, owner: i64) -> ItemWithOwner {
    ItemWithOwner {
      item:  Item {
        item_id,
        name: name.into(),
        description: None,
        owner_id: Some(owner),
        created_at: Utc::now(),
      },
      owner: Some(UserRef {
        user_id:     owner,
        handle:      None,
        given_name:  Some("Alice".into()),
        family_name: None,
      }),
    }
  }

  #[test]
  fn request_buttons_only_for_items_held_by_others() {
    let items = vec![
      item_with_owner(1, "Drive A", 10),
      item_with_owner(2, "Disk B", 20),
    ];

    let (_, keyboard) = all_items(&items, 10);
    assert_eq!(keyboard.len(), 1);
    assert_eq!(keyboard[0][0].callback_data, "request_2");
  }

  #[test]
  fn holder_of_everything_sees_note_instead_of_buttons() {
    let items = vec![item_with_owner(1, "Drive A", 10)];

    let (text, keyboard) = all_items(&items, 10);
    assert!(keyboard.is_empty());
    assert!(text.contains("You currently hold all items"));
  }
}
