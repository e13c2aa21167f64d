//! Backend client handle
//!
//! Views talk to the data backend only through [`BackendClient`]. A
//! [`Client`] is built once per request from the shared [`Store`] and the
//! caller's session token, then passed to every component that needs it.

use std::future::Future;

use crate::error::BackendError;
use crate::feed::Subscription;
use crate::model::{Bookmark, NewBookmark, Trigger, User};
use crate::store::Store;

/// Operations the bookmark views consume from the data backend
pub trait BackendClient: Send + Sync {
    /// The user attached to this client's session, if any
    fn get_user(&self) -> impl Future<Output = Result<Option<User>, BackendError>> + Send;

    /// Bookmarks with `user_id` equal to `user_id`, `created_at` descending
    fn select_bookmarks(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<Bookmark>, BackendError>> + Send;

    /// Inserts a single row and returns it with backend-assigned fields
    fn insert_bookmark(
        &self,
        row: NewBookmark,
    ) -> impl Future<Output = Result<Bookmark, BackendError>> + Send;

    /// Deletes by id; resolves to whether a visible row was removed
    fn delete_bookmark(&self, id: &str) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Opens a named change-feed channel for `triggers`
    fn subscribe(
        &self,
        channel: &str,
        triggers: Vec<Trigger>,
    ) -> impl Future<Output = Result<Subscription, BackendError>> + Send;

    fn remove_channel(&self, subscription: Subscription);
}

/// Request-scoped client over the embedded [`Store`]
#[derive(Clone)]
pub struct Client {
    store: Store,
    token: Option<String>,
}

impl Client {
    pub fn new(store: Store, token: Option<String>) -> Self {
        Self { store, token }
    }

    /// Client without a session
    pub fn anonymous(store: Store) -> Self {
        Self::new(store, None)
    }

    pub fn session_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn caller(&self) -> Result<Option<User>, BackendError> {
        match &self.token {
            Some(token) => self.store.session_user(token),
            None => Ok(None),
        }
    }
}

impl BackendClient for Client {
    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        self.caller()
    }

    async fn select_bookmarks(&self, user_id: &str) -> Result<Vec<Bookmark>, BackendError> {
        let caller = self.caller()?;
        self.store.select_by_owner(caller.as_ref(), user_id)
    }

    async fn insert_bookmark(&self, row: NewBookmark) -> Result<Bookmark, BackendError> {
        let caller = self.caller()?;
        self.store.insert(caller.as_ref(), row)
    }

    async fn delete_bookmark(&self, id: &str) -> Result<bool, BackendError> {
        let caller = self.caller()?;
        self.store.delete(caller.as_ref(), id)
    }

    async fn subscribe(
        &self,
        channel: &str,
        triggers: Vec<Trigger>,
    ) -> Result<Subscription, BackendError> {
        Ok(self.store.subscribe(channel, triggers))
    }

    fn remove_channel(&self, subscription: Subscription) {
        self.store.remove_channel(subscription)
    }
}
