//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Status and kind enums are
//! stored as their lowercase discriminants. The `Raw*` structs hold a row
//! exactly as read, with named fields; positional access stops at the
//! row-mapper closure.

use chrono::{DateTime, Utc};
use custody_core::{
  item::{Item, ItemWithOwner},
  request::{IncomingRequest, OutgoingRequest, RequestStatus, TransferRequest},
  transaction::{Transaction, TransactionKind},
  user::UserRef,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RequestStatus ───────────────────────────────────────────────────────────

pub fn encode_request_status(s: RequestStatus) -> &'static str {
  match s {
    RequestStatus::Pending => "pending",
    RequestStatus::Accepted => "accepted",
    RequestStatus::Rejected => "rejected",
  }
}

pub fn decode_request_status(s: &str) -> Result<RequestStatus> {
  match s {
    "pending" => Ok(RequestStatus::Pending),
    "accepted" => Ok(RequestStatus::Accepted),
    "rejected" => Ok(RequestStatus::Rejected),
    other => Err(Error::Decode(format!("unknown request status: {other:?}"))),
  }
}

// ─── TransactionKind ─────────────────────────────────────────────────────────

pub fn encode_transaction_kind(k: TransactionKind) -> &'static str {
  match k {
    TransactionKind::InitialAssignment => "initial_assignment",
    TransactionKind::Transfer => "transfer",
  }
}

pub fn decode_transaction_kind(s: &str) -> Result<TransactionKind> {
  match s {
    "initial_assignment" => Ok(TransactionKind::InitialAssignment),
    "transfer" => Ok(TransactionKind::Transfer),
    other => Err(Error::Decode(format!("unknown transaction kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `items` row.
pub struct RawItem {
  pub item_id:     i64,
  pub name:        String,
  pub description: Option<String>,
  pub owner_id:    Option<i64>,
  pub created_at:  String,
}

impl RawItem {
  pub fn into_item(self) -> Result<Item> {
    Ok(Item {
      item_id:     self.item_id,
      name:        self.name,
      description: self.description,
      owner_id:    self.owner_id,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// An `items` row joined (LEFT) with the owner's display columns.
pub struct RawItemWithOwner {
  pub item:        RawItem,
  pub handle:      Option<String>,
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
}

impl RawItemWithOwner {
  pub fn into_item_with_owner(self) -> Result<ItemWithOwner> {
    let owner = self.item.owner_id.map(|user_id| UserRef {
      user_id,
      handle: self.handle,
      given_name: self.given_name,
      family_name: self.family_name,
    });
    Ok(ItemWithOwner { item: self.item.into_item()?, owner })
  }
}

/// Raw values read directly from a `requests` row.
pub struct RawRequest {
  pub request_id:   i64,
  pub item_id:      i64,
  pub requester_id: i64,
  pub owner_id:     i64,
  pub status:       String,
  pub message:      Option<String>,
  pub created_at:   String,
  pub resolved_at:  Option<String>,
}

impl RawRequest {
  pub fn into_request(self) -> Result<TransferRequest> {
    Ok(TransferRequest {
      request_id:   self.request_id,
      item_id:      self.item_id,
      requester_id: self.requester_id,
      owner_id:     self.owner_id,
      status:       decode_request_status(&self.status)?,
      message:      self.message,
      created_at:   decode_dt(&self.created_at)?,
      resolved_at:  self.resolved_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// A `requests` row joined with the item name and the requester's display
/// columns — backs the owner-facing pending list.
pub struct RawIncomingRequest {
  pub request:     RawRequest,
  pub item_name:   String,
  pub handle:      Option<String>,
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
}

impl RawIncomingRequest {
  pub fn into_incoming(self) -> Result<IncomingRequest> {
    let requester = UserRef {
      user_id:     self.request.requester_id,
      handle:      self.handle,
      given_name:  self.given_name,
      family_name: self.family_name,
    };
    Ok(IncomingRequest {
      request: self.request.into_request()?,
      item_name: self.item_name,
      requester,
    })
  }
}

/// A `requests` row joined with the item name and the snapshotted owner's
/// display columns — backs the requester-facing history.
pub struct RawOutgoingRequest {
  pub request:     RawRequest,
  pub item_name:   String,
  pub handle:      Option<String>,
  pub given_name:  Option<String>,
  pub family_name: Option<String>,
}

impl RawOutgoingRequest {
  pub fn into_outgoing(self) -> Result<OutgoingRequest> {
    let owner = UserRef {
      user_id:     self.request.owner_id,
      handle:      self.handle,
      given_name:  self.given_name,
      family_name: self.family_name,
    };
    Ok(OutgoingRequest {
      request: self.request.into_request()?,
      item_name: self.item_name,
      owner,
    })
  }
}

/// Raw values read directly from a `transactions` row.
pub struct RawTransaction {
  pub transaction_id: i64,
  pub item_id:        i64,
  pub from_user_id:   Option<i64>,
  pub to_user_id:     i64,
  pub kind:           String,
  pub created_at:     String,
}

impl RawTransaction {
  pub fn into_transaction(self) -> Result<Transaction> {
    Ok(Transaction {
      transaction_id: self.transaction_id,
      item_id:        self.item_id,
      from_user_id:   self.from_user_id,
      to_user_id:     self.to_user_id,
      kind:           decode_transaction_kind(&self.kind)?,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}
