//! Environment-driven configuration
//!
//! Values are read once at startup (after `.env` is loaded by `dotenvy`).
//! Missing or unparsable values fall back to their defaults.

use std::{env, fmt::Display, str::FromStr};

use tracing::{info, warn};

use crate::feed::MAX_FEED_CAPACITY;
use crate::model::User;

/// Default capacity of the change-feed broadcast buffer
pub const DEFAULT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Config {
    /// `PORT` - Server port number (default: 8080)
    pub port: u16,

    /// `DATABASE_URL` - Path to the redb file (default: "data.db")
    pub database_url: String,

    /// `FEED_CAPACITY` - Buffered change notifications per subscriber (default: 256)
    pub feed_capacity: usize,

    /// `SEED_USER` - User id to print a one-time sign-in link for at startup
    pub seed_user: Option<String>,

    /// `SEED_USER_EMAIL` - Email attached to the seed user
    pub seed_user_email: Option<String>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("PORT", 8080),
            database_url: try_load("DATABASE_URL", "data.db".to_string()),
            feed_capacity: feed_capacity(try_load("FEED_CAPACITY", DEFAULT_FEED_CAPACITY)),
            seed_user: try_load_opt("SEED_USER"),
            seed_user_email: try_load_opt("SEED_USER_EMAIL"),
        }
    }

    /// The user to issue a startup sign-in code for, if configured
    pub fn seed_user(&self) -> Option<User> {
        self.seed_user.as_ref().map(|id| User {
            id: id.clone(),
            email: self.seed_user_email.clone(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(raw) = env::var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}

fn try_load_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn feed_capacity(requested: usize) -> usize {
    if (1..=MAX_FEED_CAPACITY).contains(&requested) {
        return requested;
    }
    warn!(
        "FEED_CAPACITY {requested} outside 1..={MAX_FEED_CAPACITY}, using default: {DEFAULT_FEED_CAPACITY}"
    );
    DEFAULT_FEED_CAPACITY
}
