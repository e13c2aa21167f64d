//! Route definitions for the bookmark service
//!
//! This module configures all HTTP routes and maps them to their handlers.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    api_create_bookmark, api_delete_bookmark, api_list_bookmarks, auth_callback,
    auth_code_error, confirm_delete, create_bookmark, events, health, home, list_fragment,
    resolve_delete, sign_out,
};
use crate::middleware::{api_gate, attach_client, page_gate};

/// Creates the application router
///
/// # Route Definitions
///
/// - `GET /` - Home page (redirects to `/login` without a session)
/// - `GET /bookmarks` - List fragment
/// - `POST /bookmarks` - Create from the form
/// - `GET /bookmarks/{id}/delete` - Delete confirmation step
/// - `POST /bookmarks/{id}/delete` - Resolve the confirmation
/// - `GET /events` - Server-sent list refreshes
/// - `GET|POST /api/bookmarks`, `DELETE /api/bookmarks/{id}` - JSON API (401 without a session)
/// - `GET /auth/callback` - Session code exchange
/// - `POST /auth/signout` - End the session
/// - `GET /auth/auth-code-error` - Static auth error page
/// - `GET /health` - Liveness probe
///
/// # Example Usage
///
/// ```no_run
/// # use bookmarks::database::{init_db, AppState};
/// # use bookmarks::route::create_app;
/// # use bookmarks::store::Store;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState { store: Store::new(db, 256) };
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(home))
        .route("/bookmarks", get(list_fragment).post(create_bookmark))
        .route(
            "/bookmarks/{id}/delete",
            get(confirm_delete).post(resolve_delete),
        )
        .route("/events", get(events))
        .route_layer(middleware::from_fn(page_gate));

    let api_routes = Router::new()
        .route("/bookmarks", get(api_list_bookmarks).post(api_create_bookmark))
        .route("/bookmarks/{id}", delete(api_delete_bookmark))
        .route_layer(middleware::from_fn(api_gate));

    Router::new()
        .merge(pages)
        .nest("/api", api_routes)
        .route("/auth/callback", get(auth_callback))
        .route("/auth/signout", post(sign_out))
        .route("/auth/auth-code-error", get(auth_code_error))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), attach_client))
        .with_state(state)
}
