//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database and change feed
//! - Starts the HTTP server with graceful shutdown support

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bookmarks::config::Config;
use bookmarks::database::{init_db, AppState};
use bookmarks::route::create_app;
use bookmarks::store::Store;

/// Application entry point
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `FEED_CAPACITY` - Change-feed buffer per subscriber (default: 256)
/// - `SEED_USER` / `SEED_USER_EMAIL` - Print a one-time sign-in link for this user
/// - `RUST_LOG` - Log filter (default: "bookmarks=debug,tower_http=debug")
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("bookmarks=debug,tower_http=debug")),
        )
        .init();

    let config = Config::load();

    let db = init_db(&config.database_url).expect("Failed to initialize database");
    let store = Store::new(db, config.feed_capacity);
    let state = AppState {
        store: store.clone(),
    };

    if let Some(user) = config.seed_user() {
        match store.issue_code(&user) {
            Ok(code) => info!(user_id = %user.id, "sign in at /auth/callback?code={code}"),
            Err(e) => error!(error = %e, "failed to issue seed sign-in code"),
        }
    }

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .expect("Failed to bind listener");

    info!(port = config.port, database = %config.database_url, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(store))
        .await
        .expect("Server error");
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// Closes the change feed so open event streams finish; other connections
/// are allowed to complete before the process exits.
async fn shutdown_signal(store: Store) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    store.feed().close();
}
