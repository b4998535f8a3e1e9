//! [`SqliteStore`] — the SQLite implementation of [`CustodyStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use custody_core::{
  ItemId, RequestId, UserId,
  item::{Item, ItemWithOwner, NewItem},
  request::{
    IncomingRequest, NewRequest, OutgoingRequest, RequestStatus, TransferRequest,
  },
  store::CustodyStore,
  transaction::{Transaction, TransactionKind},
  user::NewUser,
};

use crate::{
  Error, Result,
  encode::{
    RawIncomingRequest, RawItem, RawItemWithOwner, RawOutgoingRequest,
    RawRequest, RawTransaction, encode_dt, encode_request_status,
    encode_transaction_kind,
  },
  schema::SCHEMA,
};

/// Outcome of the create-request write, carried out of the `conn.call`
/// closure so the domain error is raised outside it.
enum CreatedRequest {
  Missing,
  Unowned,
  Created { request_id: i64, owner_id: i64 },
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A custody store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Every
/// operation borrows the same connection; there is no per-call open/close.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The audit trail for one item, oldest first.
  ///
  /// Deliberately not part of [`CustodyStore`]: the tracker itself never
  /// reads the log back. This is the access path for external reporting.
  pub async fn transactions_for_item(
    &self,
    item_id: ItemId,
  ) -> Result<Vec<Transaction>> {
    let raws: Vec<RawTransaction> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT transaction_id, item_id, from_user_id, to_user_id, kind, created_at
           FROM transactions
           WHERE item_id = ?1
           ORDER BY created_at, transaction_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![item_id], |row| {
            Ok(RawTransaction {
              transaction_id: row.get(0)?,
              item_id:        row.get(1)?,
              from_user_id:   row.get(2)?,
              to_user_id:     row.get(3)?,
              kind:           row.get(4)?,
              created_at:     row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawTransaction::into_transaction)
      .collect()
  }
}

// ─── CustodyStore impl ───────────────────────────────────────────────────────

impl CustodyStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn upsert_user(&self, user: NewUser) -> Result<()> {
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, handle, given_name, family_name, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(user_id) DO UPDATE SET
             handle      = excluded.handle,
             given_name  = excluded.given_name,
             family_name = excluded.family_name",
          rusqlite::params![
            user.user_id,
            user.handle,
            user.given_name,
            user.family_name,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Item registry ─────────────────────────────────────────────────────────

  async fn register_item(&self, input: NewItem) -> Result<Item> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let kind_str = encode_transaction_kind(TransactionKind::InitialAssignment);

    let NewItem { name, description, owner_id } = input;
    let name_out = name.clone();
    let description_out = description.clone();

    // Item row and initial audit entry commit together or not at all.
    let inserted: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM items WHERE name = ?1",
            rusqlite::params![name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if exists {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO items (name, description, owner_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![name, description, owner_id, at_str],
        )?;
        let item_id = tx.last_insert_rowid();

        tx.execute(
          "INSERT INTO transactions (item_id, from_user_id, to_user_id, kind, created_at)
           VALUES (?1, NULL, ?2, ?3, ?4)",
          rusqlite::params![item_id, owner_id, kind_str, at_str],
        )?;

        tx.commit()?;
        Ok(Some(item_id))
      })
      .await?;

    match inserted {
      Some(item_id) => Ok(Item {
        item_id,
        name: name_out,
        description: description_out,
        owner_id: Some(owner_id),
        created_at,
      }),
      None => Err(custody_core::Error::DuplicateName(name_out).into()),
    }
  }

  async fn get_item(&self, id: ItemId) -> Result<Option<ItemWithOwner>> {
    let raw: Option<RawItemWithOwner> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT i.item_id, i.name, i.description, i.owner_id, i.created_at,
                      u.handle, u.given_name, u.family_name
               FROM items i
               LEFT JOIN users u ON i.owner_id = u.user_id
               WHERE i.item_id = ?1",
              rusqlite::params![id],
              item_with_owner_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawItemWithOwner::into_item_with_owner).transpose()
  }

  async fn list_items(&self) -> Result<Vec<ItemWithOwner>> {
    let raws: Vec<RawItemWithOwner> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT i.item_id, i.name, i.description, i.owner_id, i.created_at,
                  u.handle, u.given_name, u.family_name
           FROM items i
           LEFT JOIN users u ON i.owner_id = u.user_id
           ORDER BY i.created_at DESC, i.item_id DESC",
        )?;
        let rows = stmt
          .query_map([], item_with_owner_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawItemWithOwner::into_item_with_owner)
      .collect()
  }

  async fn list_owned_by(&self, user: UserId) -> Result<Vec<Item>> {
    let raws: Vec<RawItem> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT item_id, name, description, owner_id, created_at
           FROM items
           WHERE owner_id = ?1
           ORDER BY created_at, item_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user], |row| {
            Ok(RawItem {
              item_id:     row.get(0)?,
              name:        row.get(1)?,
              description: row.get(2)?,
              owner_id:    row.get(3)?,
              created_at:  row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn search_items(&self, term: &str) -> Result<Vec<ItemWithOwner>> {
    // SQLite LIKE is case-insensitive for ASCII, which is the contract here.
    let pattern = format!("%{term}%");

    let raws: Vec<RawItemWithOwner> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT i.item_id, i.name, i.description, i.owner_id, i.created_at,
                  u.handle, u.given_name, u.family_name
           FROM items i
           LEFT JOIN users u ON i.owner_id = u.user_id
           WHERE i.name LIKE ?1 OR i.description LIKE ?1
           ORDER BY i.created_at DESC, i.item_id DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pattern], item_with_owner_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawItemWithOwner::into_item_with_owner)
      .collect()
  }

  // ── Transfer ledger ───────────────────────────────────────────────────────

  async fn create_request(&self, input: NewRequest) -> Result<TransferRequest> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    let status_str = encode_request_status(RequestStatus::Pending);

    let NewRequest { item_id, requester_id, message } = input;
    let message_out = message.clone();

    // Owner snapshot and request insert stay consistent inside one
    // transaction.
    let created: CreatedRequest = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let owner: Option<Option<i64>> = tx
          .query_row(
            "SELECT owner_id FROM items WHERE item_id = ?1",
            rusqlite::params![item_id],
            |row| row.get(0),
          )
          .optional()?;

        let owner_id = match owner {
          None => return Ok(CreatedRequest::Missing),
          Some(None) => return Ok(CreatedRequest::Unowned),
          Some(Some(id)) => id,
        };

        tx.execute(
          "INSERT INTO requests
             (item_id, requester_id, owner_id, status, message, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            item_id,
            requester_id,
            owner_id,
            status_str,
            message,
            at_str,
          ],
        )?;
        let request_id = tx.last_insert_rowid();

        tx.commit()?;
        Ok(CreatedRequest::Created { request_id, owner_id })
      })
      .await?;

    match created {
      CreatedRequest::Missing => {
        Err(custody_core::Error::ItemNotFound(item_id).into())
      }
      CreatedRequest::Unowned => {
        Err(custody_core::Error::UnownedItem(item_id).into())
      }
      CreatedRequest::Created { request_id, owner_id } => Ok(TransferRequest {
        request_id,
        item_id,
        requester_id,
        owner_id,
        status: RequestStatus::Pending,
        message: message_out,
        created_at,
        resolved_at: None,
      }),
    }
  }

  async fn get_request(&self, id: RequestId) -> Result<Option<TransferRequest>> {
    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT request_id, item_id, requester_id, owner_id,
                      status, message, created_at, resolved_at
               FROM requests
               WHERE request_id = ?1",
              rusqlite::params![id],
              request_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn list_pending_for(&self, owner: UserId) -> Result<Vec<IncomingRequest>> {
    let status_str = encode_request_status(RequestStatus::Pending);

    let raws: Vec<RawIncomingRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.request_id, r.item_id, r.requester_id, r.owner_id,
                  r.status, r.message, r.created_at, r.resolved_at,
                  i.name, u.handle, u.given_name, u.family_name
           FROM requests r
           JOIN items i ON r.item_id = i.item_id
           JOIN users u ON r.requester_id = u.user_id
           WHERE r.owner_id = ?1 AND r.status = ?2
           ORDER BY r.created_at, r.request_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![owner, status_str], |row| {
            Ok(RawIncomingRequest {
              request:     request_row(row)?,
              item_name:   row.get(8)?,
              handle:      row.get(9)?,
              given_name:  row.get(10)?,
              family_name: row.get(11)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawIncomingRequest::into_incoming)
      .collect()
  }

  async fn list_by_requester(
    &self,
    requester: UserId,
  ) -> Result<Vec<OutgoingRequest>> {
    let raws: Vec<RawOutgoingRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.request_id, r.item_id, r.requester_id, r.owner_id,
                  r.status, r.message, r.created_at, r.resolved_at,
                  i.name, u.handle, u.given_name, u.family_name
           FROM requests r
           JOIN items i ON r.item_id = i.item_id
           JOIN users u ON r.owner_id = u.user_id
           WHERE r.requester_id = ?1
           ORDER BY r.created_at DESC, r.request_id DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![requester], |row| {
            Ok(RawOutgoingRequest {
              request:     request_row(row)?,
              item_name:   row.get(8)?,
              handle:      row.get(9)?,
              given_name:  row.get(10)?,
              family_name: row.get(11)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawOutgoingRequest::into_outgoing)
      .collect()
  }

  async fn accept_request(&self, id: RequestId) -> Result<bool> {
    let resolved_str = encode_dt(Utc::now());
    let pending_str = encode_request_status(RequestStatus::Pending);
    let accepted_str = encode_request_status(RequestStatus::Accepted);
    let kind_str = encode_transaction_kind(TransactionKind::Transfer);

    // Read-check-write-write-write as one transaction. The pending-status
    // predicate is the concurrency guard: the first accept to commit flips
    // the status, and any racing accept finds no pending row and no-ops.
    let accepted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let pending: Option<(i64, i64, i64)> = tx
          .query_row(
            "SELECT item_id, requester_id, owner_id
             FROM requests
             WHERE request_id = ?1 AND status = ?2",
            rusqlite::params![id, pending_str],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
          )
          .optional()?;

        let Some((item_id, requester_id, owner_id)) = pending else {
          return Ok(false);
        };

        tx.execute(
          "UPDATE items SET owner_id = ?1 WHERE item_id = ?2",
          rusqlite::params![requester_id, item_id],
        )?;

        tx.execute(
          "UPDATE requests SET status = ?1, resolved_at = ?2 WHERE request_id = ?3",
          rusqlite::params![accepted_str, resolved_str, id],
        )?;

        // The transfer is logged from the snapshotted owner, not whoever
        // holds the item now.
        tx.execute(
          "INSERT INTO transactions (item_id, from_user_id, to_user_id, kind, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![item_id, owner_id, requester_id, kind_str, resolved_str],
        )?;

        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(accepted)
  }

  async fn reject_request(&self, id: RequestId) -> Result<bool> {
    let resolved_str = encode_dt(Utc::now());
    let pending_str = encode_request_status(RequestStatus::Pending);
    let rejected_str = encode_request_status(RequestStatus::Rejected);

    let affected: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE requests SET status = ?1, resolved_at = ?2
           WHERE request_id = ?3 AND status = ?4",
          rusqlite::params![rejected_str, resolved_str, id, pending_str],
        )?)
      })
      .await?;

    Ok(affected > 0)
  }
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

/// Map an item row joined with owner display columns (columns 0..=7).
fn item_with_owner_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawItemWithOwner> {
  Ok(RawItemWithOwner {
    item:        RawItem {
      item_id:     row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      owner_id:    row.get(3)?,
      created_at:  row.get(4)?,
    },
    handle:      row.get(5)?,
    given_name:  row.get(6)?,
    family_name: row.get(7)?,
  })
}

/// Map a full request row (columns 0..=7).
fn request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRequest> {
  Ok(RawRequest {
    request_id:   row.get(0)?,
    item_id:      row.get(1)?,
    requester_id: row.get(2)?,
    owner_id:     row.get(3)?,
    status:       row.get(4)?,
    message:      row.get(5)?,
    created_at:   row.get(6)?,
    resolved_at:  row.get(7)?,
  })
}
