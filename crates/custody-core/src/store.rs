//! The `CustodyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `custody-store-sqlite`).
//! Higher layers (the bot dispatcher) depend on this abstraction, not on any
//! concrete backend.
//!
//! Contract toward callers: every mutating operation reports expected failure
//! conditions in its return value (a typed error variant or `false`), never by
//! panicking; every read returns an empty collection, not an error, when
//! nothing matches.

use std::future::Future;

use crate::{
  ItemId, RequestId, UserId,
  item::{Item, ItemWithOwner, NewItem},
  request::{IncomingRequest, NewRequest, OutgoingRequest, TransferRequest},
  user::NewUser,
};

/// Abstraction over a custody tracker storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait CustodyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Insert or refresh a user's display fields. Called on every interaction;
  /// an existing row keeps its original `created_at`.
  fn upsert_user(
    &self,
    user: NewUser,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Item registry ─────────────────────────────────────────────────────

  /// Register a new item owned by `input.owner_id`.
  ///
  /// Fails with a duplicate-name error if an item with the same name (exact
  /// match) already exists, leaving the store unchanged. On success the item
  /// row and one `initial_assignment` audit entry are written atomically.
  fn register_item(
    &self,
    input: NewItem,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  /// Retrieve an item with its owner's display fields. `None` if not found.
  fn get_item(
    &self,
    id: ItemId,
  ) -> impl Future<Output = Result<Option<ItemWithOwner>, Self::Error>> + Send + '_;

  /// All items, newest first, with owner display fields.
  fn list_items(
    &self,
  ) -> impl Future<Output = Result<Vec<ItemWithOwner>, Self::Error>> + Send + '_;

  /// All items currently held by `user`.
  fn list_owned_by(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  /// Case-insensitive substring search over item names and descriptions.
  ///
  /// An empty term is a caller-side precondition violation and is not
  /// validated here.
  fn search_items<'a>(
    &'a self,
    term: &'a str,
  ) -> impl Future<Output = Result<Vec<ItemWithOwner>, Self::Error>> + Send + 'a;

  // ── Transfer ledger ───────────────────────────────────────────────────

  /// Create a transfer request for an item.
  ///
  /// The item's *current* owner is looked up at call time and snapshotted
  /// into the request. Fails if the item does not exist or has no owner.
  /// Whether `requester_id` differs from the owner is NOT checked here — a
  /// self-request is persisted if the caller skips its own check. A requester
  /// may hold any number of concurrent pending requests for the same item.
  fn create_request(
    &self,
    input: NewRequest,
  ) -> impl Future<Output = Result<TransferRequest, Self::Error>> + Send + '_;

  /// Retrieve a request by id. `None` if not found.
  fn get_request(
    &self,
    id: RequestId,
  ) -> impl Future<Output = Result<Option<TransferRequest>, Self::Error>> + Send + '_;

  /// Pending requests addressed to `owner` (by snapshot), with item and
  /// requester display info.
  fn list_pending_for(
    &self,
    owner: UserId,
  ) -> impl Future<Output = Result<Vec<IncomingRequest>, Self::Error>> + Send + '_;

  /// Every request `requester` has made, all statuses, newest first.
  fn list_by_requester(
    &self,
    requester: UserId,
  ) -> impl Future<Output = Result<Vec<OutgoingRequest>, Self::Error>> + Send + '_;

  /// Accept a pending request: reassign the item to the requester, mark the
  /// request accepted, and append a `transfer` audit entry — all in one
  /// storage transaction.
  ///
  /// Returns `false`, changing nothing, if the request does not exist or has
  /// already been resolved. The pending-status check is the concurrency
  /// guard: of two racing accepts, the first to flip the status wins and the
  /// second observes `false`.
  fn accept_request(
    &self,
    id: RequestId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Reject a pending request. Returns `false` if the request does not exist
  /// or has already been resolved. Ownership and the audit trail are
  /// untouched either way.
  fn reject_request(
    &self,
    id: RequestId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
