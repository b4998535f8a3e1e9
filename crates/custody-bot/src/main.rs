//! `custody-bot` — Telegram bot that tracks shared-item custody.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and long-polls the Telegram Bot API. Configuration keys can also be
//! supplied as `CUSTODY_`-prefixed environment variables, e.g.
//! `CUSTODY_BOT_TOKEN`.

mod app;
mod render;
mod session;
mod telegram;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context as _, bail};
use app::{App, Outgoing};
use clap::Parser;
use custody_store_sqlite::SqliteStore;
use serde::Deserialize;
use telegram::BotClient;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Custody tracker Telegram bot")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct BotConfig {
  /// Telegram bot token. Required; no default.
  #[serde(default)]
  bot_token: String,

  /// Location of the SQLite store file.
  #[serde(default = "default_store_path")]
  store_path: PathBuf,

  /// How long `getUpdates` may hold the long poll open, in seconds.
  #[serde(default = "default_poll_timeout")]
  poll_timeout_secs: u64,

  /// How long a half-finished conversation survives, in seconds.
  #[serde(default = "default_session_ttl")]
  session_ttl_secs: u64,
}

fn default_store_path() -> PathBuf {
  PathBuf::from("./custody.db")
}

fn default_poll_timeout() -> u64 {
  25
}

fn default_session_ttl() -> u64 {
  600
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("CUSTODY"))
    .build()
    .context("failed to read config file")?;

  let bot_cfg: BotConfig = settings
    .try_deserialize()
    .context("failed to deserialise BotConfig")?;

  if bot_cfg.bot_token.is_empty() {
    bail!("bot_token is not set (config file or CUSTODY_BOT_TOKEN)");
  }

  let store = SqliteStore::open(&bot_cfg.store_path)
    .await
    .with_context(|| {
      format!("failed to open store at {:?}", bot_cfg.store_path)
    })?;

  let client = BotClient::new(
    &bot_cfg.bot_token,
    Duration::from_secs(bot_cfg.poll_timeout_secs),
  )?;
  let app = App::new(store, Duration::from_secs(bot_cfg.session_ttl_secs));

  tracing::info!(store = %bot_cfg.store_path.display(), "custody bot starting");
  run(client, app).await
}

// ─── Poll loop ────────────────────────────────────────────────────────────────

async fn run(client: BotClient, mut app: App) -> anyhow::Result<()> {
  let mut offset = 0i64;

  loop {
    let updates = match client.get_updates(offset).await {
      Ok(updates) => updates,
      Err(e) => {
        tracing::warn!("getUpdates failed: {e:#}");
        tokio::time::sleep(Duration::from_secs(5)).await;
        continue;
      }
    };

    for update in updates {
      offset = offset.max(update.update_id + 1);

      // Updates are handled strictly in sequence; a failure affects only the
      // update that caused it.
      let outgoing = match app.handle_update(update).await {
        Ok(outgoing) => outgoing,
        Err(e) => {
          tracing::error!("update handling failed: {e:#}");
          continue;
        }
      };

      deliver(&client, outgoing).await;
    }
  }
}

/// Perform the dispatcher's outgoing actions. Best-effort notifications may
/// fail without consequence — the mutation they announce has already been
/// committed.
async fn deliver(client: &BotClient, outgoing: Vec<Outgoing>) {
  for action in outgoing {
    match action {
      Outgoing::Send { chat_id, text, markup, best_effort } => {
        if let Err(e) = client.send_message(chat_id, &text, markup.as_ref()).await {
          if best_effort {
            tracing::info!(chat_id, "could not notify user: {e:#}");
          } else {
            tracing::warn!(chat_id, "sendMessage failed: {e:#}");
          }
        }
      }
      Outgoing::Edit { chat_id, message_id, text } => {
        if let Err(e) = client.edit_message_text(chat_id, message_id, &text).await {
          tracing::warn!(chat_id, message_id, "editMessageText failed: {e:#}");
        }
      }
      Outgoing::AnswerCallback { query_id } => {
        if let Err(e) = client.answer_callback_query(&query_id).await {
          tracing::debug!("answerCallbackQuery failed: {e:#}");
        }
      }
    }
  }
}
