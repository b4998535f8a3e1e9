//! Async HTTP client for the slice of the Telegram Bot API this bot uses:
//! long-polled updates, plain and keyboard-bearing messages, message edits,
//! and callback-query acknowledgement.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

// ─── Wire types ──────────────────────────────────────────────────────────────

/// One entry from `getUpdates`. Only the update kinds the bot handles are
/// deserialised; everything else leaves both fields `None` and is skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
  pub update_id:      i64,
  #[serde(default)]
  pub message:        Option<Message>,
  #[serde(default)]
  pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
  pub message_id: i64,
  #[serde(default)]
  pub from:       Option<TgUser>,
  pub chat:       Chat,
  #[serde(default)]
  pub text:       Option<String>,
}

/// The sender identity Telegram attaches to messages and callbacks.
#[derive(Debug, Clone, Deserialize)]
pub struct TgUser {
  pub id:         i64,
  #[serde(default)]
  pub username:   Option<String>,
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name:  Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
  pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
  pub id:      String,
  pub from:    TgUser,
  /// The message the pressed button was attached to. Absent for buttons on
  /// messages Telegram no longer retains.
  #[serde(default)]
  pub message: Option<Message>,
  #[serde(default)]
  pub data:    Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
  pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
  pub text:          String,
  pub callback_data: String,
}

/// The Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
  ok:          bool,
  #[serde(default)]
  result:      Option<T>,
  #[serde(default)]
  description: Option<String>,
}

impl<T> ApiResponse<T> {
  fn into_result(self, method: &str) -> Result<T> {
    if !self.ok {
      let reason = self.description.unwrap_or_else(|| "no description".into());
      return Err(anyhow!("{method} rejected: {reason}"));
    }
    self
      .result
      .ok_or_else(|| anyhow!("{method} returned ok with no result"))
  }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async client for the Telegram Bot API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct BotClient {
  client:       Client,
  base_url:     String,
  poll_timeout: Duration,
}

impl BotClient {
  /// `poll_timeout` is the long-poll hold time passed to `getUpdates`; the
  /// HTTP timeout is set comfortably above it.
  pub fn new(token: &str, poll_timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(poll_timeout + Duration::from_secs(10))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self {
      client,
      base_url: format!("https://api.telegram.org/bot{token}"),
      poll_timeout,
    })
  }

  fn url(&self, method: &str) -> String {
    format!("{}/{method}", self.base_url)
  }

  /// `POST /getUpdates` — blocks server-side up to the poll timeout.
  pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
    let resp = self
      .client
      .post(self.url("getUpdates"))
      .json(&json!({
        "offset": offset,
        "timeout": self.poll_timeout.as_secs(),
        "allowed_updates": ["message", "callback_query"],
      }))
      .send()
      .await
      .context("getUpdates failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("getUpdates → {}", resp.status()));
    }
    let envelope: ApiResponse<Vec<Update>> =
      resp.json().await.context("deserialising updates")?;
    envelope.into_result("getUpdates")
  }

  /// `POST /sendMessage`, optionally with an inline keyboard.
  pub async fn send_message(
    &self,
    chat_id: i64,
    text: &str,
    markup: Option<&InlineKeyboardMarkup>,
  ) -> Result<()> {
    let mut body = json!({ "chat_id": chat_id, "text": text });
    if let Some(markup) = markup {
      body["reply_markup"] = serde_json::to_value(markup)?;
    }

    let resp = self
      .client
      .post(self.url("sendMessage"))
      .json(&body)
      .send()
      .await
      .context("sendMessage failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("sendMessage → {}", resp.status()));
    }
    let envelope: ApiResponse<serde_json::Value> =
      resp.json().await.context("deserialising sendMessage response")?;
    envelope.into_result("sendMessage").map(|_| ())
  }

  /// `POST /editMessageText` — replaces a previously-sent message (and drops
  /// its keyboard).
  pub async fn edit_message_text(
    &self,
    chat_id: i64,
    message_id: i64,
    text: &str,
  ) -> Result<()> {
    let resp = self
      .client
      .post(self.url("editMessageText"))
      .json(&json!({
        "chat_id": chat_id,
        "message_id": message_id,
        "text": text,
      }))
      .send()
      .await
      .context("editMessageText failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("editMessageText → {}", resp.status()));
    }
    let envelope: ApiResponse<serde_json::Value> =
      resp.json().await.context("deserialising editMessageText response")?;
    envelope.into_result("editMessageText").map(|_| ())
  }

  /// `POST /answerCallbackQuery` — stops the client-side spinner on a pressed
  /// button.
  pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
    let resp = self
      .client
      .post(self.url("answerCallbackQuery"))
      .json(&json!({ "callback_query_id": callback_query_id }))
      .send()
      .await
      .context("answerCallbackQuery failed")?;

    if !resp.status().is_success() {
      return Err(anyhow!("answerCallbackQuery → {}", resp.status()));
    }
    Ok(())
  }
}
