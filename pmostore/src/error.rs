//! Types d'erreurs pour pmostore

use pmoqueue::{SongId, UserId};
use std::path::PathBuf;

/// Erreurs de la base utilisateurs / morceaux
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User {0} does not exist")]
    UserNotFound(UserId),

    #[error("User {0} already exists")]
    UserExists(UserId),

    #[error("Song {0} does not exist")]
    SongNotFound(SongId),

    #[error("Song id space exhausted (last rowid {0})")]
    SongIdOverflow(i64),

    #[error("Failed to create database directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Database lock poisoned")]
    Poisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Type Result spécialisé pour pmostore
pub type Result<T> = std::result::Result<T, StoreError>;
