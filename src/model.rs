//! Data models for the bookmark service
//!
//! This module defines the rows stored by the data backend, the change-feed
//! event types and the request payloads accepted by the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema that owns the bookmarks table
pub const SCHEMA_PUBLIC: &str = "public";

/// Name of the bookmarks table as seen by change-feed triggers
pub const BOOKMARKS_TABLE_NAME: &str = "bookmarks";

/// A bookmark row as stored by the backend
///
/// `id` and `created_at` are assigned by the backend on insert. `user_id` is
/// the owning user and never changes after creation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Backend-assigned identifier (UUID v4)
    pub id: String,

    /// Owner of this bookmark
    pub user_id: String,

    /// Target link
    pub url: String,

    /// Display label
    pub title: String,

    /// Timestamp when this bookmark was created
    pub created_at: DateTime<Utc>,
}

/// Row payload for an insert, before the backend assigns `id` and `created_at`
///
/// # Example
/// ```json
/// {
///   "user_id": "u1",
///   "url": "https://example.com",
///   "title": "Example"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewBookmark {
    pub user_id: String,
    pub url: String,
    pub title: String,
}

/// The identity attached to an authenticated session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Kind of row change published on the change feed
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// A single (event, schema, table) filter a subscription listens for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub event: ChangeKind,
    pub schema: String,
    pub table: String,
}

impl Trigger {
    pub fn new(event: ChangeKind, schema: &str, table: &str) -> Self {
        Self {
            event,
            schema: schema.to_string(),
            table: table.to_string(),
        }
    }

    /// Returns true if `change` falls under this trigger
    pub fn matches(&self, change: &ChangeEvent) -> bool {
        self.event == change.event && self.schema == change.schema && self.table == change.table
    }
}

/// Notification emitted by the backend after a committed insert or delete
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub event: ChangeKind,
    pub schema: String,
    pub table: String,

    /// Identifier of the row that changed
    pub record_id: String,
}

impl ChangeEvent {
    pub fn bookmarks(event: ChangeKind, record_id: &str) -> Self {
        Self {
            event,
            schema: SCHEMA_PUBLIC.to_string(),
            table: BOOKMARKS_TABLE_NAME.to_string(),
            record_id: record_id.to_string(),
        }
    }
}

/// Request payload for creating a bookmark
///
/// Accepted both as a urlencoded form body (`POST /bookmarks`) and as JSON
/// (`POST /api/bookmarks`). The owner is never taken from the payload.
///
/// # Example
/// ```json
/// {
///   "url": "https://example.com",
///   "title": "Example"
/// }
/// ```
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CreateBookmarkRequest {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub title: String,
}

/// Form body answering the delete confirmation step
#[derive(Deserialize, Debug)]
pub struct DeleteDecisionForm {
    /// `"yes"` confirms the deletion, anything else declines it
    #[serde(default)]
    pub confirm: String,
}

/// Query parameters of the auth callback
///
/// Query string: `?code=<one-time sign-in code>&next=/`
#[derive(Deserialize, Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub next: Option<String>,
}
