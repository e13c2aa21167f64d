//! Bookmark creation form
//!
//! Holds the two input fields and the in-flight flag. Submission validates
//! locally, re-confirms the session user and inserts a row owned by that
//! user. Failures are logged, never shown to the user.

use tracing::{debug, error};

use crate::client::BackendClient;
use crate::model::{Bookmark, NewBookmark};

/// Result of [`BookmarkForm::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Row inserted; both fields were cleared
    Created(Bookmark),

    /// A field was empty after trimming; nothing was sent
    Invalid,

    /// A submission is already in flight
    Busy,

    /// No session user; submission aborted
    Unauthenticated,

    /// The backend rejected the insert; fields kept
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkForm {
    pub url: String,
    pub title: String,
    loading: bool,
}

impl BookmarkForm {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            loading: false,
        }
    }

    /// True while a submission is awaiting the backend
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Trimmed `(url, title)` when both are non-empty
    pub fn trimmed(&self) -> Option<(String, String)> {
        let url = self.url.trim();
        let title = self.title.trim();
        if url.is_empty() || title.is_empty() {
            return None;
        }
        Some((url.to_string(), title.to_string()))
    }

    pub async fn submit<B: BackendClient>(&mut self, client: &B) -> SubmitOutcome {
        let Some((url, title)) = self.trimmed() else {
            debug!("bookmark form submitted with a blank field");
            return SubmitOutcome::Invalid;
        };
        if self.loading {
            return SubmitOutcome::Busy;
        }

        self.loading = true;
        let outcome = Self::insert(client, url, title).await;
        if let SubmitOutcome::Created(_) = outcome {
            self.url.clear();
            self.title.clear();
        }
        self.loading = false;

        outcome
    }

    async fn insert<B: BackendClient>(client: &B, url: String, title: String) -> SubmitOutcome {
        let user = match client.get_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return SubmitOutcome::Unauthenticated,
            Err(e) => {
                error!(error = %e, "Error adding bookmark");
                return SubmitOutcome::Unauthenticated;
            }
        };

        let row = NewBookmark {
            user_id: user.id,
            url,
            title,
        };
        match client.insert_bookmark(row).await {
            Ok(bookmark) => SubmitOutcome::Created(bookmark),
            Err(e) => {
                error!(error = %e, "Error adding bookmark");
                SubmitOutcome::Failed
            }
        }
    }
}
