//! Session resolution and gating
//!
//! [`attach_client`] builds the request-scoped [`Client`] from the caller's
//! session token. The gates then look up the session user once: page routes
//! redirect anonymous visitors to `/login`, API routes answer 401.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::client::{BackendClient, Client};
use crate::database::AppState;

/// Cookie holding the session token for browser requests
pub const SESSION_COOKIE: &str = "session";

/// Where anonymous page visitors are sent
pub const LOGIN_PATH: &str = "/login";

/// Reads the session token from `Authorization: Bearer` or the session cookie
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Inserts a [`Client`] for the caller into the request extensions
pub async fn attach_client(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = session_token(request.headers());
    request
        .extensions_mut()
        .insert(Client::new(state.store.clone(), token));
    next.run(request).await
}

/// Gate for server-rendered pages
pub async fn page_gate(
    Extension(client): Extension<Client>,
    mut request: Request,
    next: Next,
) -> Response {
    match client.get_user().await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Ok(None) => {
            debug!(path = %request.uri().path(), "no session, redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            error!(error = %e, "session lookup failed");
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// Gate for the JSON API
pub async fn api_gate(
    Extension(client): Extension<Client>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let unauthorized_response = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Unauthorized",
                "message": "Invalid or missing session"
            })),
        )
            .into_response()
    };

    match client.get_user().await {
        Ok(Some(user)) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        Ok(None) => Err(unauthorized_response()),
        Err(e) => {
            error!(error = %e, "session lookup failed");
            Err(unauthorized_response())
        }
    }
}
