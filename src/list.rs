//! Bookmark list view
//!
//! Keeps the caller's bookmarks (newest first), reloads the whole list on
//! every INSERT or DELETE seen on the change feed, and drives deletion as a
//! two-step interaction: [`BookmarkList::request_delete`] yields a
//! confirmation, [`BookmarkList::resolve_delete`] acts on the decision.

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::client::BackendClient;
use crate::feed::{Notification, Subscription};
use crate::model::{Bookmark, ChangeKind, Trigger, BOOKMARKS_TABLE_NAME, SCHEMA_PUBLIC};

/// Change-feed channel opened by a mounted list
pub const CHANNEL_NAME: &str = "bookmarks-changes";

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this bookmark?";

/// Alert shown when the backend rejects a delete
pub const DELETE_FAILED_ALERT: &str = "Failed to delete bookmark";

pub const EMPTY_MESSAGE: &str = "No bookmarks yet. Add your first bookmark above!";

/// First step of a delete: what the user is asked to confirm
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub id: String,
    pub prompt: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Confirm,
    Decline,
}

impl Decision {
    /// Reads a form answer; only `"yes"` confirms
    pub fn from_answer(answer: &str) -> Self {
        if answer.trim().eq_ignore_ascii_case("yes") {
            Decision::Confirm
        } else {
            Decision::Decline
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Declined; no backend call was made
    Cancelled,
    Deleted,
    /// The delete failed; `alert` is meant for the user
    Failed { alert: &'static str },
}

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created: String,
}

#[derive(Debug)]
pub struct BookmarkList {
    bookmarks: Vec<Bookmark>,
    loading: bool,
    subscription: Option<Subscription>,
}

impl Default for BookmarkList {
    fn default() -> Self {
        Self::new()
    }
}

impl BookmarkList {
    pub fn new() -> Self {
        Self {
            bookmarks: Vec::new(),
            loading: true,
            subscription: None,
        }
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn find(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    /// Replaces the list with the caller's bookmarks, newest first
    ///
    /// Without a session user nothing is fetched. Errors are logged and the
    /// current list is kept.
    pub async fn load<B: BackendClient>(&mut self, client: &B) {
        let user = match client.get_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                self.loading = false;
                return;
            }
            Err(e) => {
                error!(error = %e, "Error fetching bookmarks");
                self.loading = false;
                return;
            }
        };

        match client.select_bookmarks(&user.id).await {
            Ok(rows) => {
                debug!(user_id = %user.id, rows = rows.len(), "bookmarks loaded");
                self.bookmarks = rows;
            }
            Err(e) => error!(error = %e, "Error fetching bookmarks"),
        }
        self.loading = false;
    }

    /// Loads, then subscribes to INSERT and DELETE on the bookmarks table
    pub async fn mount<B: BackendClient>(&mut self, client: &B) {
        self.load(client).await;

        match client.get_user().await {
            Ok(Some(_)) => {}
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "Error setting up bookmark feed");
                return;
            }
        }

        let triggers = vec![
            Trigger::new(ChangeKind::Insert, SCHEMA_PUBLIC, BOOKMARKS_TABLE_NAME),
            Trigger::new(ChangeKind::Delete, SCHEMA_PUBLIC, BOOKMARKS_TABLE_NAME),
        ];
        match client.subscribe(CHANNEL_NAME, triggers).await {
            Ok(subscription) => {
                if let Some(previous) = self.subscription.replace(subscription) {
                    client.remove_channel(previous);
                }
            }
            Err(e) => error!(error = %e, "Error setting up bookmark feed"),
        }
    }

    /// Waits for the next change notification and reloads the list
    ///
    /// Returns false when not subscribed or once the feed has closed.
    pub async fn next_change<B: BackendClient>(&mut self, client: &B) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        match subscription.recv().await {
            Ok(Notification::Change(event)) => {
                debug!(event = ?event.event, record_id = %event.record_id, "bookmarks changed");
            }
            Ok(Notification::Lagged(missed)) => {
                warn!(missed, "bookmark feed lagged, reloading");
            }
            Err(e) => {
                warn!(error = %e, "bookmark feed ended");
                self.subscription = None;
                return false;
            }
        }

        self.load(client).await;
        true
    }

    /// Releases the change-feed subscription
    pub fn unmount<B: BackendClient>(&mut self, client: &B) {
        if let Some(subscription) = self.subscription.take() {
            client.remove_channel(subscription);
        }
    }

    pub fn request_delete(&self, id: &str) -> DeleteConfirmation {
        DeleteConfirmation {
            id: id.to_string(),
            prompt: DELETE_PROMPT,
        }
    }

    /// Acts on the user's answer to a [`DeleteConfirmation`]
    ///
    /// A confirmed delete always reloads the list afterwards, whether or not
    /// the delete succeeded.
    pub async fn resolve_delete<B: BackendClient>(
        &mut self,
        client: &B,
        confirmation: DeleteConfirmation,
        decision: Decision,
    ) -> DeleteOutcome {
        if decision == Decision::Decline {
            return DeleteOutcome::Cancelled;
        }

        let outcome = match client.delete_bookmark(&confirmation.id).await {
            Ok(_) => DeleteOutcome::Deleted,
            Err(e) => {
                error!(error = %e, id = %confirmation.id, "Error deleting bookmark");
                DeleteOutcome::Failed {
                    alert: DELETE_FAILED_ALERT,
                }
            }
        };
        self.load(client).await;

        outcome
    }

    pub fn rows(&self) -> Vec<BookmarkRow> {
        self.bookmarks
            .iter()
            .map(|b| BookmarkRow {
                id: b.id.clone(),
                title: b.title.clone(),
                url: b.url.clone(),
                created: format_created_date(&b.created_at),
            })
            .collect()
    }
}

/// Short date in `M/D/YYYY` form
pub fn format_created_date(created_at: &DateTime<Utc>) -> String {
    created_at.format("%-m/%-d/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn decision_only_confirms_on_yes() {
        assert_eq!(Decision::from_answer("yes"), Decision::Confirm);
        assert_eq!(Decision::from_answer(" YES "), Decision::Confirm);
        assert_eq!(Decision::from_answer("no"), Decision::Decline);
        assert_eq!(Decision::from_answer(""), Decision::Decline);
    }

    #[test]
    fn created_date_is_short_form() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 22, 15, 0).unwrap();
        assert_eq!(format_created_date(&at), "3/7/2026");
    }

    #[test]
    fn new_list_is_loading_and_unsubscribed() {
        let list = BookmarkList::new();
        assert!(list.is_loading());
        assert!(list.is_empty());
        assert!(!list.is_subscribed());
    }

    #[test]
    fn request_delete_carries_prompt() {
        let confirmation = BookmarkList::new().request_delete("abc");
        assert_eq!(confirmation.id, "abc");
        assert_eq!(confirmation.prompt, DELETE_PROMPT);
    }
}
