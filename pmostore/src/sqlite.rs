//! Stockage SQLite des utilisateurs et des morceaux soumis

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmoqueue::{Song, SongId, UserId};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{JukeboxStore, Result, StoreError, User};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        user_id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS songs (
        song_id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        service TEXT NOT NULL,
        service_id TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(user_id),
        submitted_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_songs_user ON songs(user_id);
";

/// SQLite-backed [`JukeboxStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Ouvre (ou crée) la base, répertoire parent compris
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;
        let store = Self::with_connection(conn)?;
        info!(path = %db_path.display(), "Jukebox database opened");
        Ok(store)
    }

    /// Base en mémoire, perdue à la fermeture
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

fn select_user(conn: &Connection, user_id: UserId) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT user_id, username, created_at FROM users WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(User {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    created_at: to_datetime(row.get(2)?),
                })
            },
        )
        .optional()?;
    Ok(user)
}

#[async_trait]
impl JukeboxStore for SqliteStore {
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        select_user(&conn, user_id)
    }

    async fn add_user(&self, user_id: UserId, username: &str) -> Result<User> {
        let conn = self.lock()?;

        if select_user(&conn, user_id)?.is_some() {
            return Err(StoreError::UserExists(user_id));
        }

        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO users (user_id, username, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, username, now],
        )?;

        debug!(user_id, username, "User created");
        Ok(User {
            user_id,
            username: username.to_string(),
            created_at: to_datetime(now),
        })
    }

    async fn update_username(&self, user_id: UserId, username: &str) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE users SET username = ?2 WHERE user_id = ?1",
            params![user_id, username],
        )?;

        if updated == 0 {
            return Err(StoreError::UserNotFound(user_id));
        }
        debug!(user_id, username, "User renamed");
        Ok(())
    }

    async fn add_song(
        &self,
        title: &str,
        service: &str,
        service_id: &str,
        user_id: UserId,
    ) -> Result<SongId> {
        let conn = self.lock()?;

        if select_user(&conn, user_id)?.is_none() {
            return Err(StoreError::UserNotFound(user_id));
        }

        conn.execute(
            "INSERT INTO songs (title, service, service_id, user_id, submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![title, service, service_id, user_id, Utc::now().timestamp()],
        )?;

        let rowid = conn.last_insert_rowid();
        let song_id = SongId::try_from(rowid).map_err(|_| StoreError::SongIdOverflow(rowid))?;
        debug!(song_id, user_id, service, service_id, "Song stored");
        Ok(song_id)
    }

    async fn song_by_id(&self, song_id: SongId) -> Result<Option<Song>> {
        let conn = self.lock()?;
        let song = conn
            .query_row(
                "SELECT s.song_id, s.title, s.service, s.service_id, s.user_id, u.username
                 FROM songs s JOIN users u ON u.user_id = s.user_id
                 WHERE s.song_id = ?1",
                params![song_id],
                |row| {
                    Ok(Song {
                        song_id: row.get(0)?,
                        title: row.get(1)?,
                        service: row.get(2)?,
                        service_id: row.get(3)?,
                        user_id: row.get(4)?,
                        username: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(song)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_song_ids_are_allocated_in_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_user(10, "alice").await.unwrap();

        let first = store.add_song("a", "youtube", "x", 10).await.unwrap();
        let second = store.add_song("b", "youtube", "y", 10).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_song_requires_known_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.add_song("a", "youtube", "x", 42).await.unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(42)));
    }

    #[tokio::test]
    async fn test_song_lookup_follows_rename() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_user(10, "alice").await.unwrap();
        let id = store.add_song("Intro", "soundcloud", "a/b", 10).await.unwrap();

        store.update_username(10, "alicia").await.unwrap();

        let song = store.song_by_id(id).await.unwrap().unwrap();
        assert_eq!(song.username, "alicia");
        assert_eq!(song.service_id, "a/b");
    }
}
