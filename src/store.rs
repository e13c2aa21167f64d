//! Embedded data backend
//!
//! [`Store`] owns the redb database and the change feed. Every bookmark
//! operation takes the calling user and applies the row-level access policy:
//! callers only read and delete their own rows, and may only insert rows they
//! own. Commits are followed by a change notification.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::{
    owner_index_key, TABLE_BOOKMARKS, TABLE_OWNER_INDEX, TABLE_SESSIONS, TABLE_SIGNIN_CODES,
};
use crate::error::BackendError;
use crate::feed::{ChangeFeed, Subscription};
use crate::model::{self, Bookmark, ChangeEvent, ChangeKind, NewBookmark, Trigger, User};

/// Length of issued session tokens and sign-in codes
const TOKEN_LEN: usize = 32;

#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
    feed: ChangeFeed,
    last_created_micros: Arc<AtomicI64>,
}

impl Store {
    pub fn new(db: Database, feed_capacity: usize) -> Self {
        Self {
            db: Arc::new(db),
            feed: ChangeFeed::new(feed_capacity),
            last_created_micros: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Creates a session for `user` and returns its token
    pub fn issue_session(&self, user: &User) -> Result<String, BackendError> {
        let token = random_token();
        let user_json = serde_json::to_string(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            sessions.insert(token.as_str(), user_json.as_str())?;
        }
        write_txn.commit()?;

        info!(user_id = %user.id, "session issued");
        Ok(token)
    }

    /// Creates a one-time sign-in code for `user`
    ///
    /// The code is redeemed once through [`Store::exchange_code`]; it is never
    /// a session token itself.
    pub fn issue_code(&self, user: &User) -> Result<String, BackendError> {
        let code = random_token();
        let user_json = serde_json::to_string(user)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut codes = write_txn.open_table(TABLE_SIGNIN_CODES)?;
            codes.insert(code.as_str(), user_json.as_str())?;
        }
        write_txn.commit()?;

        info!(user_id = %user.id, "sign-in code issued");
        Ok(code)
    }

    /// Redeems a sign-in code for a fresh session
    ///
    /// The code is removed in the same transaction that stores the session,
    /// so a second exchange of the same code yields `None`.
    pub fn exchange_code(&self, code: &str) -> Result<Option<(String, User)>, BackendError> {
        let write_txn = self.db.begin_write()?;
        let session = {
            let mut codes = write_txn.open_table(TABLE_SIGNIN_CODES)?;
            let user_json = match codes.remove(code)? {
                Some(guard) => guard.value().to_string(),
                None => return Ok(None),
            };
            let user: User = serde_json::from_str(&user_json)?;

            let token = random_token();
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            sessions.insert(token.as_str(), user_json.as_str())?;
            (token, user)
        };
        write_txn.commit()?;

        info!(user_id = %session.1.id, "sign-in code exchanged");
        Ok(Some(session))
    }

    /// Revokes a session; returns false if the token was unknown
    pub fn revoke_session(&self, token: &str) -> Result<bool, BackendError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut sessions = write_txn.open_table(TABLE_SESSIONS)?;
            let removed = sessions.remove(token)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Resolves a session token to its user
    pub fn session_user(&self, token: &str) -> Result<Option<User>, BackendError> {
        let read_txn = self.db.begin_read()?;
        let sessions = read_txn.open_table(TABLE_SESSIONS)?;

        match sessions.get(token)? {
            Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Selects rows with `user_id = owner`, newest first
    ///
    /// Rows not owned by `caller` are invisible, so asking for someone
    /// else's bookmarks yields an empty list rather than an error.
    pub fn select_by_owner(
        &self,
        caller: Option<&User>,
        owner: &str,
    ) -> Result<Vec<Bookmark>, BackendError> {
        let Some(caller) = caller.filter(|c| c.id == owner) else {
            return Ok(Vec::new());
        };

        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(TABLE_OWNER_INDEX)?;

        // ';' sorts right after ':', bounding every "{owner}:..." key.
        let start_key = format!("{}:", owner);
        let end_key = format!("{};", owner);

        let mut rows = Vec::new();
        for entry in index.range(start_key.as_str()..end_key.as_str())?.rev() {
            let (_, value) = entry?;
            let bookmark: Bookmark = serde_json::from_str(value.value())?;
            // Owner ids containing ':' share a key prefix with shorter ids.
            if bookmark.user_id == caller.id {
                rows.push(bookmark);
            }
        }

        debug!(user_id = %owner, rows = rows.len(), "bookmarks selected");
        Ok(rows)
    }

    /// Inserts a row owned by `caller` and publishes an INSERT change
    pub fn insert(
        &self,
        caller: Option<&User>,
        row: NewBookmark,
    ) -> Result<Bookmark, BackendError> {
        match caller {
            Some(user) if user.id == row.user_id => {}
            _ => {
                return Err(BackendError::PolicyViolation(
                    model::BOOKMARKS_TABLE_NAME.to_string(),
                ))
            }
        }

        let bookmark = Bookmark {
            id: Uuid::new_v4().to_string(),
            user_id: row.user_id,
            url: row.url,
            title: row.title,
            created_at: self.next_created_at(),
        };
        let record_json = serde_json::to_string(&bookmark)?;
        let index_key = owner_index_key(
            &bookmark.user_id,
            bookmark.created_at.timestamp_micros(),
            &bookmark.id,
        );

        let write_txn = self.db.begin_write()?;
        {
            let mut table_main = write_txn.open_table(TABLE_BOOKMARKS)?;
            table_main.insert(bookmark.id.as_str(), record_json.as_str())?;

            let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;
            table_index.insert(index_key.as_str(), record_json.as_str())?;
        }
        write_txn.commit()?;

        info!(id = %bookmark.id, user_id = %bookmark.user_id, "bookmark inserted");
        self.feed
            .publish(ChangeEvent::bookmarks(ChangeKind::Insert, &bookmark.id));
        Ok(bookmark)
    }

    /// Deletes the row `id` if `caller` owns it
    ///
    /// Returns whether a row was removed. Rows owned by someone else are
    /// treated as absent.
    pub fn delete(&self, caller: Option<&User>, id: &str) -> Result<bool, BackendError> {
        let Some(caller) = caller else {
            return Ok(false);
        };

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table_main = write_txn.open_table(TABLE_BOOKMARKS)?;
            let existing = match table_main.get(id)? {
                Some(guard) => Some(serde_json::from_str::<Bookmark>(guard.value())?),
                None => None,
            };

            match existing {
                Some(record) if record.user_id == caller.id => {
                    table_main.remove(id)?;
                    let index_key = owner_index_key(
                        &record.user_id,
                        record.created_at.timestamp_micros(),
                        &record.id,
                    );
                    let mut table_index = write_txn.open_table(TABLE_OWNER_INDEX)?;
                    table_index.remove(index_key.as_str())?;
                    true
                }
                _ => false,
            }
        };
        write_txn.commit()?;

        if removed {
            info!(id, user_id = %caller.id, "bookmark deleted");
            self.feed.publish(ChangeEvent::bookmarks(ChangeKind::Delete, id));
        } else {
            debug!(id, user_id = %caller.id, "delete matched no visible row");
        }
        Ok(removed)
    }

    pub fn subscribe(&self, channel: &str, triggers: Vec<Trigger>) -> Subscription {
        self.feed.subscribe(channel, triggers)
    }

    pub fn remove_channel(&self, subscription: Subscription) {
        self.feed.remove_channel(subscription)
    }

    /// Strictly increasing creation timestamps, so per-owner order is total
    fn next_created_at(&self) -> DateTime<Utc> {
        let now = Utc::now().timestamp_micros();
        let previous = self
            .last_created_micros
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let micros = now.max(previous + 1);

        DateTime::from_timestamp_micros(micros).unwrap_or_else(Utc::now)
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
