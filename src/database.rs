//! Database initialization and table definitions
//!
//! This module handles the setup of the embedded redb database backing the
//! bookmark store. It defines the tables and the shared application state.

use redb::{Database, TableDefinition};

use crate::store::Store;

/// Main table for storing bookmark rows
///
/// Key: Bookmark ID (UUID) as string
/// Value: JSON-serialized Bookmark as string
///
/// Example:
/// - Key: "5f0c...e1"
/// - Value: '{"id":"5f0c...e1","user_id":"u1","url":"https://example.com",...}'
pub const TABLE_BOOKMARKS: TableDefinition<&str, &str> = TableDefinition::new("bookmarks_v1");

/// Index table for listing a user's bookmarks in creation order
///
/// Key: Composite key in format "{user_id}:{created_at_micros:020}:{id}"
/// Value: JSON-serialized Bookmark as string
///
/// The zero-padded timestamp keeps lexicographic order equal to creation
/// order; the trailing id keeps keys unique.
pub const TABLE_OWNER_INDEX: TableDefinition<&str, &str> =
    TableDefinition::new("bookmarks_by_owner_v1");

/// Session table mapping opaque tokens to users
///
/// Key: Session token
/// Value: JSON-serialized User as string
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions_v1");

/// One-time sign-in codes, removed when exchanged for a session
///
/// Key: Sign-in code
/// Value: JSON-serialized User as string
pub const TABLE_SIGNIN_CODES: TableDefinition<&str, &str> =
    TableDefinition::new("signin_codes_v1");

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Data backend: bookmark rows, sessions and the change feed
    pub store: Store,
}

/// Initializes the embedded database and creates required tables
///
/// # Example
///
/// ```no_run
/// # use bookmarks::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_BOOKMARKS)?;
        write_txn.open_table(TABLE_OWNER_INDEX)?;
        write_txn.open_table(TABLE_SESSIONS)?;
        write_txn.open_table(TABLE_SIGNIN_CODES)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Builds the owner index key for a bookmark
pub fn owner_index_key(user_id: &str, created_at_micros: i64, id: &str) -> String {
    format!("{}:{:020}:{}", user_id, created_at_micros, id)
}
