//! The update dispatcher.
//!
//! [`App::handle_update`] turns one incoming Telegram update into a list of
//! [`Outgoing`] actions. It talks to the store and the session map but never
//! to the network — delivery happens in `main`, which is what keeps the
//! command flows testable against an in-memory store.

use std::time::Duration;

use anyhow::Result;
use custody_core::{
  ItemId, RequestId,
  item::NewItem,
  request::NewRequest,
  store::CustodyStore,
  user::{NewUser, UserRef},
};
use custody_store_sqlite::SqliteStore;

use crate::{
  render,
  session::{PendingAction, SessionMap},
  telegram::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, Message, TgUser,
    Update,
  },
};

const ITEM_GONE: &str = "❌ This item no longer exists.";
const ACCEPT_STALE: &str =
  "❌ Failed to accept request. It may have already been processed.";
const REJECT_STALE: &str =
  "❌ Failed to reject request. It may have already been processed.";
const NOT_YOUR_CALL: &str =
  "⛔ Only the holder this request was sent to can accept or reject it.";

// ─── Outgoing actions ────────────────────────────────────────────────────────

/// A side effect the dispatcher wants performed on the chat transport.
#[derive(Debug)]
pub enum Outgoing {
  Send {
    chat_id: i64,
    text:    String,
    markup:  Option<InlineKeyboardMarkup>,
    /// Notification to a third party: a delivery failure is logged and
    /// swallowed, never retried.
    best_effort: bool,
  },
  Edit {
    chat_id:    i64,
    message_id: i64,
    text:       String,
  },
  AnswerCallback {
    query_id: String,
  },
}

impl Outgoing {
  fn send(chat_id: i64, text: String) -> Self {
    Self::Send { chat_id, text, markup: None, best_effort: false }
  }

  fn send_with_keyboard(
    chat_id: i64,
    text: String,
    keyboard: Vec<Vec<InlineKeyboardButton>>,
  ) -> Self {
    let markup = (!keyboard.is_empty())
      .then(|| InlineKeyboardMarkup { inline_keyboard: keyboard });
    Self::Send { chat_id, text, markup, best_effort: false }
  }

  fn notify(chat_id: i64, text: String) -> Self {
    Self::Send { chat_id, text, markup: None, best_effort: true }
  }
}

// ─── Input parsing ───────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Command {
  Start,
  Help,
  MyItems,
  AddItem,
  List,
  Search(String),
  MyRequests,
  PendingRequests,
  Cancel,
  Unknown,
}

/// `None` for ordinary text; `Unknown` for an unrecognised slash command.
fn parse_command(text: &str) -> Option<Command> {
  let trimmed = text.trim();
  if !trimmed.starts_with('/') {
    return None;
  }
  let (token, rest) = trimmed
    .split_once(char::is_whitespace)
    .unwrap_or((trimmed, ""));
  // Group chats address commands as `/search@botname`.
  let token = token.split('@').next().unwrap_or(token);

  Some(match token {
    "/start" => Command::Start,
    "/help" => Command::Help,
    "/my_items" => Command::MyItems,
    "/add_item" => Command::AddItem,
    "/list" => Command::List,
    "/search" => Command::Search(rest.trim().to_owned()),
    "/my_requests" => Command::MyRequests,
    "/pending_requests" => Command::PendingRequests,
    "/cancel" => Command::Cancel,
    _ => Command::Unknown,
  })
}

#[derive(Debug, PartialEq, Eq)]
enum CallbackAction {
  Request(ItemId),
  Accept(RequestId),
  Reject(RequestId),
}

fn parse_callback(data: &str) -> Option<CallbackAction> {
  if let Some(id) = data.strip_prefix("request_") {
    return id.parse().ok().map(CallbackAction::Request);
  }
  if let Some(id) = data.strip_prefix("accept_") {
    return id.parse().ok().map(CallbackAction::Accept);
  }
  if let Some(id) = data.strip_prefix("reject_") {
    return id.parse().ok().map(CallbackAction::Reject);
  }
  None
}

fn user_ref(user: &TgUser) -> UserRef {
  UserRef {
    user_id:     user.id,
    handle:      user.username.clone(),
    given_name:  user.first_name.clone(),
    family_name: user.last_name.clone(),
  }
}

fn new_user(user: &TgUser) -> NewUser {
  NewUser {
    user_id:     user.id,
    handle:      user.username.clone(),
    given_name:  user.first_name.clone(),
    family_name: user.last_name.clone(),
  }
}

// ─── App ─────────────────────────────────────────────────────────────────────

pub struct App {
  store:    SqliteStore,
  sessions: SessionMap,
}

impl App {
  pub fn new(store: SqliteStore, session_ttl: Duration) -> Self {
    Self { store, sessions: SessionMap::new(session_ttl) }
  }

  pub async fn handle_update(&mut self, update: Update) -> Result<Vec<Outgoing>> {
    if let Some(message) = update.message {
      return self.handle_message(message).await;
    }
    if let Some(query) = update.callback_query {
      return self.handle_callback(query).await;
    }
    Ok(vec![])
  }

  // ── Messages ──────────────────────────────────────────────────────────────

  async fn handle_message(&mut self, message: Message) -> Result<Vec<Outgoing>> {
    let Some(from) = message.from else {
      return Ok(vec![]);
    };
    let Some(text) = message.text else {
      return Ok(vec![]);
    };

    // Keep display fields fresh on every interaction.
    self.store.upsert_user(new_user(&from)).await?;

    let chat_id = message.chat.id;
    if let Some(command) = parse_command(&text) {
      return self.handle_command(chat_id, &from, command).await;
    }
    if let Some(action) = self.sessions.take(from.id) {
      return self.handle_staged(chat_id, &from, action, text.trim()).await;
    }
    // Plain text outside any conversation is ignored.
    Ok(vec![])
  }

  async fn handle_command(
    &mut self,
    chat_id: i64,
    from: &TgUser,
    command: Command,
  ) -> Result<Vec<Outgoing>> {
    let out = match command {
      Command::Start => {
        let name = user_ref(from).display_name();
        vec![Outgoing::send(chat_id, render::welcome(&name))]
      }
      Command::Help => vec![Outgoing::send(chat_id, render::help())],
      Command::MyItems => {
        let items = self.store.list_owned_by(from.id).await?;
        vec![Outgoing::send(chat_id, render::my_items(&items))]
      }
      Command::AddItem => {
        self.sessions.stage(from.id, PendingAction::AwaitingItemName);
        vec![Outgoing::send(chat_id, render::add_item_prompt())]
      }
      Command::List => {
        let items = self.store.list_items().await?;
        let (text, keyboard) = render::all_items(&items, from.id);
        vec![Outgoing::send_with_keyboard(chat_id, text, keyboard)]
      }
      Command::Search(term) if term.is_empty() => {
        vec![Outgoing::send(chat_id, render::search_usage())]
      }
      Command::Search(term) => {
        let items = self.store.search_items(&term).await?;
        let (text, keyboard) = render::search_results(&term, &items, from.id);
        vec![Outgoing::send_with_keyboard(chat_id, text, keyboard)]
      }
      Command::MyRequests => {
        let requests = self.store.list_by_requester(from.id).await?;
        vec![Outgoing::send(chat_id, render::outgoing_requests(&requests))]
      }
      Command::PendingRequests => {
        let requests = self.store.list_pending_for(from.id).await?;
        let (text, keyboard) = render::incoming_requests(&requests);
        vec![Outgoing::send_with_keyboard(chat_id, text, keyboard)]
      }
      Command::Cancel => {
        let text = if self.sessions.cancel(from.id) {
          "Operation cancelled."
        } else {
          "Nothing to cancel."
        };
        vec![Outgoing::send(chat_id, text.to_owned())]
      }
      Command::Unknown => vec![],
    };
    Ok(out)
  }

  // ── Conversation steps ────────────────────────────────────────────────────

  async fn handle_staged(
    &mut self,
    chat_id: i64,
    from: &TgUser,
    action: PendingAction,
    text: &str,
  ) -> Result<Vec<Outgoing>> {
    match action {
      PendingAction::AwaitingItemName => {
        let name = text.to_owned();
        let prompt = render::description_prompt(&name);
        self
          .sessions
          .stage(from.id, PendingAction::AwaitingItemDescription { name });
        Ok(vec![Outgoing::send(chat_id, prompt)])
      }

      PendingAction::AwaitingItemDescription { name } => {
        let description =
          (!text.eq_ignore_ascii_case("skip")).then(|| text.to_owned());
        let input = NewItem { name, description, owner_id: from.id };

        match self.store.register_item(input).await {
          Ok(item) => {
            Ok(vec![Outgoing::send(chat_id, render::item_added(&item.name))])
          }
          Err(custody_store_sqlite::Error::Core(
            custody_core::Error::DuplicateName(name),
          )) => Ok(vec![Outgoing::send(chat_id, render::duplicate_name(&name))]),
          Err(e) => Err(e.into()),
        }
      }

      PendingAction::AwaitingRequestMessage { item_id } => {
        let message =
          (!text.eq_ignore_ascii_case("skip")).then(|| text.to_owned());

        let Some(view) = self.store.get_item(item_id).await? else {
          return Ok(vec![Outgoing::send(chat_id, ITEM_GONE.to_owned())]);
        };
        if view.item.owner_id == Some(from.id) {
          return Ok(vec![Outgoing::send(
            chat_id,
            "❌ You already hold this item!".to_owned(),
          )]);
        }

        let input = NewRequest { item_id, requester_id: from.id, message };
        match self.store.create_request(input).await {
          Ok(request) => {
            let requester = user_ref(from).display_name();
            Ok(vec![
              Outgoing::send(chat_id, render::request_sent(&view.item.name)),
              // Private chats share the user's id, so the owner's user id
              // doubles as the notification chat id.
              Outgoing::notify(
                request.owner_id,
                render::owner_notification(&requester, &view.item.name),
              ),
            ])
          }
          Err(custody_store_sqlite::Error::Core(
            custody_core::Error::ItemNotFound(_)
            | custody_core::Error::UnownedItem(_),
          )) => Ok(vec![Outgoing::send(chat_id, ITEM_GONE.to_owned())]),
          Err(e) => Err(e.into()),
        }
      }
    }
  }

  // ── Callbacks ─────────────────────────────────────────────────────────────

  async fn handle_callback(
    &mut self,
    query: CallbackQuery,
  ) -> Result<Vec<Outgoing>> {
    self.store.upsert_user(new_user(&query.from)).await?;

    let mut out = vec![Outgoing::AnswerCallback { query_id: query.id.clone() }];
    let Some(action) = query.data.as_deref().and_then(parse_callback) else {
      return Ok(out);
    };

    let chat_id = query
      .message
      .as_ref()
      .map(|m| m.chat.id)
      .unwrap_or(query.from.id);
    // Edit the button-bearing message in place when we still know it.
    let reply = |text: String| match &query.message {
      Some(m) => Outgoing::Edit { chat_id, message_id: m.message_id, text },
      None => Outgoing::send(chat_id, text),
    };

    match action {
      CallbackAction::Request(item_id) => {
        match self.store.get_item(item_id).await? {
          None => out.push(reply(ITEM_GONE.to_owned())),
          Some(view) => {
            self
              .sessions
              .stage(query.from.id, PendingAction::AwaitingRequestMessage {
                item_id,
              });
            out.push(reply(render::request_prompt(&view)));
          }
        }
      }

      CallbackAction::Accept(request_id) => {
        match self.store.get_request(request_id).await? {
          None => {
            tracing::info!(request_id, "accept for unknown request");
            out.push(reply(ACCEPT_STALE.to_owned()));
          }
          Some(request) if request.owner_id != query.from.id => {
            out.push(reply(NOT_YOUR_CALL.to_owned()));
          }
          Some(_) => {
            if self.store.accept_request(request_id).await? {
              out.push(reply(
                "✅ Request accepted! The item has changed hands.\n\
                 Use /pending_requests to see other pending requests."
                  .to_owned(),
              ));
            } else {
              tracing::info!(request_id, "accept for already-resolved request");
              out.push(reply(ACCEPT_STALE.to_owned()));
            }
          }
        }
      }

      CallbackAction::Reject(request_id) => {
        match self.store.get_request(request_id).await? {
          None => {
            tracing::info!(request_id, "reject for unknown request");
            out.push(reply(REJECT_STALE.to_owned()));
          }
          Some(request) if request.owner_id != query.from.id => {
            out.push(reply(NOT_YOUR_CALL.to_owned()));
          }
          Some(_) => {
            if self.store.reject_request(request_id).await? {
              out.push(reply(
                "❌ Request rejected.\n\
                 Use /pending_requests to see other pending requests."
                  .to_owned(),
              ));
            } else {
              tracing::info!(request_id, "reject for already-resolved request");
              out.push(reply(REJECT_STALE.to_owned()));
            }
          }
        }
      }
    }

    Ok(out)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
