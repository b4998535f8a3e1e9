//! Integration tests for `SqliteStore` against an in-memory database.

use custody_core::{
  UserId,
  item::NewItem,
  request::{NewRequest, RequestStatus},
  store::CustodyStore,
  transaction::TransactionKind,
  user::NewUser,
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn add_user(s: &SqliteStore, id: UserId, given: &str) {
  s.upsert_user(NewUser {
    user_id:     id,
    handle:      Some(format!("user{id}")),
    given_name:  Some(given.into()),
    family_name: None,
  })
  .await
  .unwrap();
}

fn new_item(name: &str, description: &str, owner: UserId) -> NewItem {
  NewItem {
    name:        name.into(),
    description: (!description.is_empty()).then(|| description.into()),
    owner_id:    owner,
  }
}

fn new_request(item_id: i64, requester: UserId) -> NewRequest {
  NewRequest {
    item_id,
    requester_id: requester,
    message: None,
  }
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_user_refreshes_display_fields() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  let item = s.register_item(new_item("Drill", "", 1)).await.unwrap();
  let view = s.get_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(view.owner_display(), "Alice");

  // Re-upserting the same id replaces the display fields in place.
  add_user(&s, 1, "Alicia").await;
  let view = s.get_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(view.owner_display(), "Alicia");
}

// ─── Item registry ───────────────────────────────────────────────────────────

#[tokio::test]
async fn register_item_and_list_owned() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  let item = s
    .register_item(new_item("Drive A", "", 1))
    .await
    .unwrap();
  assert_eq!(item.owner_id, Some(1));

  let owned = s.list_owned_by(1).await.unwrap();
  assert_eq!(owned.len(), 1);
  assert_eq!(owned[0].name, "Drive A");
}

#[tokio::test]
async fn register_logs_initial_assignment() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();

  let log = s.transactions_for_item(item.item_id).await.unwrap();
  assert_eq!(log.len(), 1);
  assert_eq!(log[0].kind, TransactionKind::InitialAssignment);
  assert_eq!(log[0].from_user_id, None);
  assert_eq!(log[0].to_user_id, 1);
}

#[tokio::test]
async fn duplicate_name_fails_and_leaves_store_unchanged() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;

  let first = s.register_item(new_item("Drive A", "", 1)).await.unwrap();

  let err = s
    .register_item(new_item("Drive A", "second attempt", 2))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(custody_core::Error::DuplicateName(ref name)) if name == "Drive A"
  ));

  // Exactly one item, still with its original owner and audit entry.
  let all = s.list_items().await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].item.owner_id, Some(1));
  assert_eq!(s.transactions_for_item(first.item_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_check_is_case_sensitive() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  // Different case is a different name.
  s.register_item(new_item("drive a", "", 1)).await.unwrap();

  assert_eq!(s.list_items().await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_item_missing_returns_none() {
  let s = store().await;
  assert!(s.get_item(999).await.unwrap().is_none());
}

#[tokio::test]
async fn list_items_newest_first() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  s.register_item(new_item("First", "", 1)).await.unwrap();
  s.register_item(new_item("Second", "", 1)).await.unwrap();
  s.register_item(new_item("Third", "", 1)).await.unwrap();

  let names: Vec<_> = s
    .list_items()
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.item.name)
    .collect();
  assert_eq!(names, ["Third", "Second", "First"]);
}

#[tokio::test]
async fn search_matches_name_and_description() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  s.register_item(new_item("USB Drive", "", 1)).await.unwrap();
  s.register_item(new_item("Backup Disk", "spare drive", 1))
    .await
    .unwrap();
  s.register_item(new_item("Keyboard", "mechanical", 1))
    .await
    .unwrap();

  let mut names: Vec<_> = s
    .search_items("drive")
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.item.name)
    .collect();
  names.sort();
  assert_eq!(names, ["Backup Disk", "USB Drive"]);
}

#[tokio::test]
async fn search_is_case_insensitive() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  s.register_item(new_item("USB Drive", "", 1)).await.unwrap();

  assert_eq!(s.search_items("DRIVE").await.unwrap().len(), 1);
  assert_eq!(s.search_items("usb").await.unwrap().len(), 1);
}

#[tokio::test]
async fn search_with_no_match_returns_empty() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  s.register_item(new_item("USB Drive", "", 1)).await.unwrap();

  assert!(s.search_items("projector").await.unwrap().is_empty());
}

// ─── Request creation ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_request_snapshots_owner_at_creation() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;
  add_user(&s, 3, "Carol").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();

  let r_bob = s.create_request(new_request(item.item_id, 2)).await.unwrap();
  let r_carol = s.create_request(new_request(item.item_id, 3)).await.unwrap();
  assert_eq!(r_bob.owner_id, 1);

  // Carol's request resolves first; the item now belongs to Carol.
  assert!(s.accept_request(r_carol.request_id).await.unwrap());

  // Bob's request still carries the owner it was addressed to.
  let r_bob = s.get_request(r_bob.request_id).await.unwrap().unwrap();
  assert_eq!(r_bob.owner_id, 1);
  assert!(r_bob.status.is_pending());

  // Accepting it transfers from the snapshot, not the current holder.
  assert!(s.accept_request(r_bob.request_id).await.unwrap());
  let log = s.transactions_for_item(item.item_id).await.unwrap();
  assert_eq!(log.len(), 3);
  assert_eq!(log[2].kind, TransactionKind::Transfer);
  assert_eq!(log[2].from_user_id, Some(1));
  assert_eq!(log[2].to_user_id, 2);
}

#[tokio::test]
async fn create_request_for_missing_item_errors() {
  let s = store().await;
  add_user(&s, 2, "Bob").await;

  let err = s.create_request(new_request(999, 2)).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(custody_core::Error::ItemNotFound(999))
  ));
}

#[tokio::test]
async fn self_request_is_persisted() {
  // The storage layer does not police requester == owner; that check belongs
  // to the caller.
  let s = store().await;
  add_user(&s, 1, "Alice").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  let req = s.create_request(new_request(item.item_id, 1)).await.unwrap();

  assert_eq!(req.requester_id, 1);
  assert_eq!(req.owner_id, 1);
  assert_eq!(s.list_pending_for(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_pending_requests_for_same_item_allowed() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  s.create_request(new_request(item.item_id, 2)).await.unwrap();
  s.create_request(new_request(item.item_id, 2)).await.unwrap();

  assert_eq!(s.list_pending_for(1).await.unwrap().len(), 2);
}

// ─── Accept / reject ─────────────────────────────────────────────────────────

#[tokio::test]
async fn accept_transfers_ownership_end_to_end() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  let req = s
    .create_request(NewRequest {
      item_id:      item.item_id,
      requester_id: 2,
      message:      Some("need it for the offsite".into()),
    })
    .await
    .unwrap();

  assert!(s.accept_request(req.request_id).await.unwrap());

  let view = s.get_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(view.item.owner_id, Some(2));

  let req = s.get_request(req.request_id).await.unwrap().unwrap();
  assert_eq!(req.status, RequestStatus::Accepted);
  assert!(req.resolved_at.is_some());

  let log = s.transactions_for_item(item.item_id).await.unwrap();
  assert_eq!(log.len(), 2);
  assert_eq!(log[0].kind, TransactionKind::InitialAssignment);
  assert_eq!(log[0].to_user_id, 1);
  assert_eq!(log[1].kind, TransactionKind::Transfer);
  assert_eq!(log[1].from_user_id, Some(1));
  assert_eq!(log[1].to_user_id, 2);
}

#[tokio::test]
async fn double_accept_is_a_no_op() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  let req = s.create_request(new_request(item.item_id, 2)).await.unwrap();

  assert!(s.accept_request(req.request_id).await.unwrap());
  assert!(!s.accept_request(req.request_id).await.unwrap());

  // Ownership keeps its new value and no second transfer is logged.
  let view = s.get_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(view.item.owner_id, Some(2));
  assert_eq!(s.transactions_for_item(item.item_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn reject_is_terminal() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;

  let item = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  let req = s.create_request(new_request(item.item_id, 2)).await.unwrap();

  assert!(s.reject_request(req.request_id).await.unwrap());

  let stored = s.get_request(req.request_id).await.unwrap().unwrap();
  assert_eq!(stored.status, RequestStatus::Rejected);
  assert!(stored.resolved_at.is_some());

  // No transition out of a terminal state.
  assert!(!s.accept_request(req.request_id).await.unwrap());
  assert!(!s.reject_request(req.request_id).await.unwrap());

  // Ownership untouched, audit trail untouched.
  let view = s.get_item(item.item_id).await.unwrap().unwrap();
  assert_eq!(view.item.owner_id, Some(1));
  assert_eq!(s.transactions_for_item(item.item_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn accept_missing_request_returns_false() {
  let s = store().await;
  assert!(!s.accept_request(999).await.unwrap());
  assert!(!s.reject_request(999).await.unwrap());
}

// ─── Request listings ────────────────────────────────────────────────────────

#[tokio::test]
async fn list_pending_for_filters_owner_and_status() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;
  add_user(&s, 3, "Carol").await;

  let drive = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  let disk = s.register_item(new_item("Disk B", "", 3)).await.unwrap();

  let pending = s.create_request(new_request(drive.item_id, 2)).await.unwrap();
  let rejected = s.create_request(new_request(drive.item_id, 3)).await.unwrap();
  s.reject_request(rejected.request_id).await.unwrap();
  // Addressed to Carol, not Alice.
  s.create_request(new_request(disk.item_id, 2)).await.unwrap();

  let incoming = s.list_pending_for(1).await.unwrap();
  assert_eq!(incoming.len(), 1);
  assert_eq!(incoming[0].request.request_id, pending.request_id);
  assert_eq!(incoming[0].item_name, "Drive A");
  assert_eq!(incoming[0].requester.display_name(), "Bob");
}

#[tokio::test]
async fn list_by_requester_covers_all_statuses_newest_first() {
  let s = store().await;
  add_user(&s, 1, "Alice").await;
  add_user(&s, 2, "Bob").await;

  let drive = s.register_item(new_item("Drive A", "", 1)).await.unwrap();
  let disk = s.register_item(new_item("Disk B", "", 1)).await.unwrap();

  let first = s.create_request(new_request(drive.item_id, 2)).await.unwrap();
  let second = s.create_request(new_request(disk.item_id, 2)).await.unwrap();
  s.accept_request(first.request_id).await.unwrap();

  let outgoing = s.list_by_requester(2).await.unwrap();
  assert_eq!(outgoing.len(), 2);
  assert_eq!(outgoing[0].request.request_id, second.request_id);
  assert!(outgoing[0].request.status.is_pending());
  assert_eq!(outgoing[1].request.request_id, first.request_id);
  assert_eq!(outgoing[1].request.status, RequestStatus::Accepted);
  assert_eq!(outgoing[1].owner.display_name(), "Alice");
}

#[tokio::test]
async fn listings_empty_when_nothing_matches() {
  let s = store().await;
  assert!(s.list_pending_for(1).await.unwrap().is_empty());
  assert!(s.list_by_requester(1).await.unwrap().is_empty());
  assert!(s.list_owned_by(1).await.unwrap().is_empty());
}
