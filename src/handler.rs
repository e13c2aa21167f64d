//! HTTP request handlers
//!
//! Page handlers drive the form and list views with the request-scoped
//! [`Client`] and render HTML; the `/api` handlers expose the same
//! operations as JSON; `/events` streams list refreshes as server-sent
//! events.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    Extension, Form, Json,
};
use futures_util::stream::{self, Stream};
use serde_json::json;
use tracing::{error, info};

use crate::client::{BackendClient, Client};
use crate::database::AppState;
use crate::error::AppError;
use crate::form::{BookmarkForm, SubmitOutcome};
use crate::list::{BookmarkList, Decision, DeleteOutcome};
use crate::middleware::{LOGIN_PATH, SESSION_COOKIE};
use crate::model::{CallbackParams, CreateBookmarkRequest, DeleteDecisionForm, NewBookmark, User};
use crate::page;

/// Name of the server-sent event carrying a refreshed list fragment
pub const LIST_EVENT: &str = "bookmarks";

pub const AUTH_ERROR_PATH: &str = "/auth/auth-code-error";

/// Home page: creation form and the caller's list
///
/// Reached only through the page gate, so a session user exists.
pub async fn home(
    Extension(client): Extension<Client>,
    Extension(user): Extension<User>,
) -> Html<String> {
    let mut list = BookmarkList::new();
    list.load(&client).await;
    Html(page::render_home(&user, &BookmarkForm::default(), &list, None))
}

/// Form submit for a new bookmark
///
/// # Response
///
/// - **303 See Other** to `/` once the row is inserted
/// - **422 Unprocessable Entity** with the page re-rendered when a field is blank
/// - **200 OK** with the submitted values kept when the insert failed
pub async fn create_bookmark(
    Extension(client): Extension<Client>,
    Extension(user): Extension<User>,
    Form(payload): Form<CreateBookmarkRequest>,
) -> Response {
    let mut form = BookmarkForm::new(payload.url, payload.title);
    let outcome = form.submit(&client).await;

    let status = match outcome {
        SubmitOutcome::Created(_) => return Redirect::to("/").into_response(),
        SubmitOutcome::Unauthenticated => return Redirect::to(LOGIN_PATH).into_response(),
        SubmitOutcome::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
        SubmitOutcome::Busy | SubmitOutcome::Failed => StatusCode::OK,
    };

    let mut list = BookmarkList::new();
    list.load(&client).await;
    (status, Html(page::render_home(&user, &form, &list, None))).into_response()
}

/// List fragment, as swapped in by the live feed
pub async fn list_fragment(Extension(client): Extension<Client>) -> Html<String> {
    let mut list = BookmarkList::new();
    list.load(&client).await;
    Html(page::render_list(&list))
}

/// First step of a delete: ask for confirmation
pub async fn confirm_delete(
    Extension(client): Extension<Client>,
    Path(id): Path<String>,
) -> Html<String> {
    let mut list = BookmarkList::new();
    list.load(&client).await;
    let confirmation = list.request_delete(&id);
    Html(page::render_confirm_delete(&confirmation, list.find(&id)))
}

/// Second step of a delete: act on the answer
///
/// A failed delete re-renders the home page with the alert; every other
/// outcome redirects home.
pub async fn resolve_delete(
    Extension(client): Extension<Client>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
    Form(answer): Form<DeleteDecisionForm>,
) -> Response {
    let mut list = BookmarkList::new();
    let confirmation = list.request_delete(&id);
    let decision = Decision::from_answer(&answer.confirm);

    match list.resolve_delete(&client, confirmation, decision).await {
        DeleteOutcome::Cancelled | DeleteOutcome::Deleted => Redirect::to("/").into_response(),
        DeleteOutcome::Failed { alert } => Html(page::render_home(
            &user,
            &BookmarkForm::default(),
            &list,
            Some(alert),
        ))
        .into_response(),
    }
}

/// Live feed: one `bookmarks` event with the refreshed list per change
///
/// The list view is mounted for the lifetime of the stream; its channel is
/// released when the client disconnects and the stream is dropped.
pub async fn events(
    Extension(client): Extension<Client>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut list = BookmarkList::new();
    list.mount(&client).await;

    let stream = stream::unfold((list, client), |(mut list, client)| async move {
        if !list.next_change(&client).await {
            list.unmount(&client);
            return None;
        }
        let event = Event::default()
            .event(LIST_EVENT)
            .data(page::render_list(&list));
        Some((Ok::<_, Infallible>(event), (list, client)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Lists the caller's bookmarks, newest first
///
/// # Example Request
///
/// `GET /api/bookmarks`
///
/// # Response
///
/// ```json
/// {
///   "total": 2,
///   "data": [...]
/// }
/// ```
pub async fn api_list_bookmarks(
    Extension(client): Extension<Client>,
    Extension(user): Extension<User>,
) -> Result<Json<serde_json::Value>, AppError> {
    let rows = client.select_bookmarks(&user.id).await?;
    Ok(Json(json!({
        "total": rows.len(),
        "data": rows
    })))
}

/// Creates a bookmark owned by the caller
///
/// # Request Body
///
/// ```json
/// {
///   "url": "https://example.com",
///   "title": "Example"
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - the stored row
/// - **422 Unprocessable Entity** - `url` or `title` blank after trimming
pub async fn api_create_bookmark(
    Extension(client): Extension<Client>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateBookmarkRequest>,
) -> Result<Response, AppError> {
    let form = BookmarkForm::new(payload.url, payload.title);
    let Some((url, title)) = form.trimmed() else {
        return Err(AppError::Validation("url and title are required".to_string()));
    };

    let bookmark = client
        .insert_bookmark(NewBookmark {
            user_id: user.id,
            url,
            title,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(bookmark)).into_response())
}

/// Deletes one of the caller's bookmarks
///
/// # Response
///
/// - **200 OK** - bookmark deleted
/// - **404 Not Found** - no such bookmark visible to the caller
pub async fn api_delete_bookmark(
    Extension(client): Extension<Client>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    if !client.delete_bookmark(&id).await? {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Bookmark not found",
                "code": "not_found"
            })),
        )
            .into_response());
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Bookmark deleted successfully",
            "deleted_id": id
        })),
    )
        .into_response())
}

/// Exchanges a one-time sign-in code for the session cookie
///
/// The code is consumed; unknown or already used codes end on the auth
/// error page.
pub async fn auth_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Redirect::to(AUTH_ERROR_PATH).into_response();
    };

    match state.store.exchange_code(&code) {
        Ok(Some((token, user))) => {
            info!(user_id = %user.id, "signed in");
            let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
            let next = safe_next(params.next.as_deref());
            ([(header::SET_COOKIE, cookie)], Redirect::to(next)).into_response()
        }
        Ok(None) => Redirect::to(AUTH_ERROR_PATH).into_response(),
        Err(e) => {
            error!(error = %e, "sign-in code exchange failed");
            Redirect::to(AUTH_ERROR_PATH).into_response()
        }
    }
}

/// Ends the session and clears the cookie
pub async fn sign_out(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
) -> Response {
    if let Some(token) = client.session_token() {
        if let Err(e) = state.store.revoke_session(token) {
            error!(error = %e, "failed to revoke session");
        }
    }

    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    ([(header::SET_COOKIE, cookie)], Redirect::to(LOGIN_PATH)).into_response()
}

pub async fn auth_code_error() -> Html<String> {
    Html(page::render_auth_code_error())
}

pub async fn health() -> &'static str {
    "ok"
}

/// Post-login destination; only same-site absolute paths are honoured
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}
