//! Behaviour tests for the creation form and the list view
//!
//! These drive the views against a recording backend so every call the
//! views make (or skip) can be asserted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use bookmarks::client::BackendClient;
use bookmarks::error::BackendError;
use bookmarks::feed::{ChangeFeed, Subscription};
use bookmarks::form::{BookmarkForm, SubmitOutcome};
use bookmarks::list::{
    BookmarkList, Decision, DeleteOutcome, CHANNEL_NAME, DELETE_FAILED_ALERT,
};
use bookmarks::model::{Bookmark, ChangeEvent, ChangeKind, NewBookmark, Trigger, User};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    GetUser,
    Select(String),
    Insert(NewBookmark),
    Delete(String),
    Subscribe(String, Vec<Trigger>),
}

/// Backend double that records calls and serves rows from memory
struct RecordingClient {
    user: Option<User>,
    rows: Mutex<Vec<Bookmark>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicU64,
    fail_insert: bool,
    fail_select: bool,
    fail_delete: bool,
    feed: ChangeFeed,
}

impl RecordingClient {
    fn signed_in(id: &str) -> Self {
        Self::with_user(Some(User {
            id: id.to_string(),
            email: None,
        }))
    }

    fn anonymous() -> Self {
        Self::with_user(None)
    }

    fn with_user(user: Option<User>) -> Self {
        Self {
            user,
            rows: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_insert: false,
            fail_select: false,
            fail_delete: false,
            feed: ChangeFeed::new(16),
        }
    }

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn seed(&self, user_id: &str, title: &str) -> Bookmark {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let bookmark = Bookmark {
            id: format!("b{n}"),
            user_id: user_id.to_string(),
            url: format!("https://example.com/{title}"),
            title: title.to_string(),
            created_at: Self::base_time() + Duration::seconds(n as i64),
        };
        self.rows.lock().unwrap().push(bookmark.clone());
        bookmark
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn count(&self, matcher: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| matcher(c)).count()
    }
}

impl BackendClient for RecordingClient {
    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        self.record(Call::GetUser);
        Ok(self.user.clone())
    }

    async fn select_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, BackendError> {
        self.record(Call::Select(user_id.to_string()));
        if self.fail_select {
            return Err(BackendError::Closed);
        }
        let mut rows: Vec<Bookmark> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_bookmark(&self, row: NewBookmark) -> Result<Bookmark, BackendError> {
        self.record(Call::Insert(row.clone()));
        if self.fail_insert {
            return Err(BackendError::PolicyViolation("bookmarks".into()));
        }
        Ok(self.seed(&row.user_id, &row.title))
    }

    async fn delete_bookmark(&self, id: &str) -> Result<bool, BackendError> {
        self.record(Call::Delete(id.to_string()));
        if self.fail_delete {
            return Err(BackendError::Closed);
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|b| b.id != id);
        Ok(rows.len() != before)
    }

    async fn subscribe(
        &self,
        channel: &str,
        triggers: Vec<Trigger>,
    ) -> Result<Subscription, BackendError> {
        self.record(Call::Subscribe(channel.to_string(), triggers.clone()));
        Ok(self.feed.subscribe(channel, triggers))
    }

    fn remove_channel(&self, subscription: Subscription) {
        self.feed.remove_channel(subscription)
    }
}

#[tokio::test]
async fn test_submit_inserts_owned_row_and_clears_fields() {
    let client = RecordingClient::signed_in("u1");
    let mut form = BookmarkForm::new("https://example.com", "Example");

    let outcome = form.submit(&client).await;

    assert!(matches!(outcome, SubmitOutcome::Created(_)));
    assert!(client.calls().contains(&Call::Insert(NewBookmark {
        user_id: "u1".to_string(),
        url: "https://example.com".to_string(),
        title: "Example".to_string(),
    })));
    assert_eq!(form.url, "");
    assert_eq!(form.title, "");
    assert!(!form.is_loading());
}

#[tokio::test]
async fn test_submit_trims_values() {
    let client = RecordingClient::signed_in("u1");
    let mut form = BookmarkForm::new("  https://example.com/a \n", "\tA title ");

    form.submit(&client).await;

    assert!(client.calls().contains(&Call::Insert(NewBookmark {
        user_id: "u1".to_string(),
        url: "https://example.com/a".to_string(),
        title: "A title".to_string(),
    })));
}

#[tokio::test]
async fn test_blank_fields_make_no_backend_call() {
    for (url, title) in [("", "Example"), ("https://example.com", "   "), (" \t", "\n")] {
        let client = RecordingClient::signed_in("u1");
        let mut form = BookmarkForm::new(url, title);

        assert_eq!(form.submit(&client).await, SubmitOutcome::Invalid);
        assert!(client.calls().is_empty());
        assert_eq!(form.url, url);
        assert_eq!(form.title, title);
    }
}

#[tokio::test]
async fn test_submit_without_user_aborts_silently() {
    let client = RecordingClient::anonymous();
    let mut form = BookmarkForm::new("https://example.com", "Example");

    assert_eq!(form.submit(&client).await, SubmitOutcome::Unauthenticated);
    assert_eq!(client.calls(), vec![Call::GetUser]);
    assert_eq!(form.url, "https://example.com");
    assert!(!form.is_loading());
}

#[tokio::test]
async fn test_failed_insert_keeps_fields() {
    let mut client = RecordingClient::signed_in("u1");
    client.fail_insert = true;
    let mut form = BookmarkForm::new("https://example.com", "Example");

    assert_eq!(form.submit(&client).await, SubmitOutcome::Failed);
    assert_eq!(form.url, "https://example.com");
    assert_eq!(form.title, "Example");
    assert!(!form.is_loading());
}

#[tokio::test]
async fn test_load_orders_newest_first() {
    let client = RecordingClient::signed_in("u1");
    client.seed("u1", "t1");
    client.seed("u1", "t2");
    client.seed("u1", "t3");

    let mut list = BookmarkList::new();
    list.load(&client).await;

    let titles: Vec<&str> = list.bookmarks().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["t3", "t2", "t1"]);
    assert!(!list.is_loading());
}

#[tokio::test]
async fn test_load_without_user_fetches_nothing() {
    let client = RecordingClient::anonymous();
    client.seed("u1", "hidden");

    let mut list = BookmarkList::new();
    list.load(&client).await;

    assert!(list.is_empty());
    assert!(!list.is_loading());
    assert_eq!(client.count(|c| matches!(c, Call::Select(_))), 0);
}

#[tokio::test]
async fn test_load_error_keeps_previous_rows() {
    let mut client = RecordingClient::signed_in("u1");
    client.seed("u1", "kept");

    let mut list = BookmarkList::new();
    list.load(&client).await;
    assert_eq!(list.bookmarks().len(), 1);

    client.fail_select = true;
    list.load(&client).await;
    assert_eq!(list.bookmarks().len(), 1);
}

#[tokio::test]
async fn test_declined_delete_makes_no_backend_call() {
    let client = RecordingClient::signed_in("u1");
    let bookmark = client.seed("u1", "keep me");
    let mut list = BookmarkList::new();
    list.load(&client).await;

    let confirmation = list.request_delete(&bookmark.id);
    let outcome = list
        .resolve_delete(&client, confirmation, Decision::Decline)
        .await;

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert_eq!(client.count(|c| matches!(c, Call::Delete(_))), 0);
    assert_eq!(list.bookmarks().len(), 1);
}

#[tokio::test]
async fn test_confirmed_delete_removes_row_and_reloads() {
    let client = RecordingClient::signed_in("u1");
    let bookmark = client.seed("u1", "gone");
    client.seed("u1", "stays");
    let mut list = BookmarkList::new();
    list.load(&client).await;

    let confirmation = list.request_delete(&bookmark.id);
    let outcome = list
        .resolve_delete(&client, confirmation, Decision::Confirm)
        .await;

    assert_eq!(outcome, DeleteOutcome::Deleted);
    assert!(list.find(&bookmark.id).is_none());
    assert_eq!(list.bookmarks().len(), 1);
}

#[tokio::test]
async fn test_failed_delete_alerts_and_still_reloads() {
    let mut client = RecordingClient::signed_in("u1");
    client.fail_delete = true;
    let bookmark = client.seed("u1", "stuck");
    let mut list = BookmarkList::new();

    let confirmation = list.request_delete(&bookmark.id);
    let outcome = list
        .resolve_delete(&client, confirmation, Decision::Confirm)
        .await;

    assert_eq!(
        outcome,
        DeleteOutcome::Failed {
            alert: DELETE_FAILED_ALERT
        }
    );
    let calls = client.calls();
    let delete_at = calls
        .iter()
        .position(|c| matches!(c, Call::Delete(_)))
        .unwrap();
    assert!(calls[delete_at..]
        .iter()
        .any(|c| matches!(c, Call::Select(_))));
    assert_eq!(list.bookmarks().len(), 1);
}

#[tokio::test]
async fn test_mount_subscribes_to_inserts_and_deletes() {
    let client = RecordingClient::signed_in("u1");
    let mut list = BookmarkList::new();

    list.mount(&client).await;

    assert!(list.is_subscribed());
    let subscribe = client
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Subscribe(channel, triggers) => Some((channel, triggers)),
            _ => None,
        })
        .unwrap();
    assert_eq!(subscribe.0, CHANNEL_NAME);
    let kinds: Vec<ChangeKind> = subscribe.1.iter().map(|t| t.event).collect();
    assert_eq!(kinds, [ChangeKind::Insert, ChangeKind::Delete]);
    assert!(subscribe
        .1
        .iter()
        .all(|t| t.schema == "public" && t.table == "bookmarks"));

    list.unmount(&client);
    assert!(!list.is_subscribed());
    assert_eq!(client.feed.active_channels(), 0);
}

#[tokio::test]
async fn test_mount_without_user_does_not_subscribe() {
    let client = RecordingClient::anonymous();
    let mut list = BookmarkList::new();

    list.mount(&client).await;

    assert!(!list.is_subscribed());
    assert_eq!(client.feed.active_channels(), 0);
}

#[tokio::test]
async fn test_notification_burst_converges_to_single_reload() {
    let client = RecordingClient::signed_in("u1");
    client.seed("u1", "one");
    let mut list = BookmarkList::new();
    list.mount(&client).await;
    let selects_after_mount = client.count(|c| matches!(c, Call::Select(_)));

    // Another session inserts, and an unrelated user's row also changes.
    let added = client.seed("u1", "two");
    client.feed.publish(ChangeEvent::bookmarks(ChangeKind::Insert, &added.id));
    client.feed.publish(ChangeEvent::bookmarks(ChangeKind::Delete, "someone-else"));

    assert!(list.next_change(&client).await);
    assert!(list.next_change(&client).await);

    let mut single = BookmarkList::new();
    single.load(&client).await;

    assert_eq!(list.bookmarks(), single.bookmarks());
    assert_eq!(list.bookmarks().len(), 2);
    assert_eq!(
        client.count(|c| matches!(c, Call::Select(_))) - selects_after_mount,
        3
    );
}

#[tokio::test]
async fn test_next_change_stops_when_unmounted_or_closed() {
    let client = RecordingClient::signed_in("u1");
    let mut list = BookmarkList::new();
    assert!(!list.next_change(&client).await);

    list.mount(&client).await;
    client.feed.close();
    assert!(!list.next_change(&client).await);
    assert!(!list.is_subscribed());
}

#[tokio::test]
async fn test_rows_show_title_url_and_date() {
    let client = RecordingClient::signed_in("u1");
    client.seed("u1", "docs");
    let mut list = BookmarkList::new();
    list.load(&client).await;

    let rows = list.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].title, "docs");
    assert_eq!(rows[0].url, "https://example.com/docs");
    assert_eq!(rows[0].created, "1/1/2026");
}
