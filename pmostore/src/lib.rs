//! # pmostore - Utilisateurs et morceaux persistants du jukebox
//!
//! - [`JukeboxStore`] : contrat de stockage (utilisateurs, attribution des
//!   identifiants de morceaux)
//! - [`SqliteStore`] : implémentation SQLite (une connexion sous `Mutex`)
//! - [`UserCache`] : cache mémoire `user_id -> username` devant la base
//!
//! ```no_run
//! use pmostore::{JukeboxStore, SqliteStore, UserCache};
//!
//! # #[tokio::main]
//! # async fn main() -> pmostore::Result<()> {
//! let store = SqliteStore::open("/tmp/jukebox.db")?;
//! let cache = UserCache::new();
//!
//! let user = store.add_user(10, "alice").await?;
//! cache.insert(user.user_id, user.username.clone()).await;
//!
//! let song_id = store.add_song("Intro", "youtube", "dQw4w9WgXcQ", 10).await?;
//! println!("song {} stored", song_id);
//! # Ok(())
//! # }
//! ```

mod cache;
mod error;
mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pmoqueue::{Song, SongId, UserId};

pub use cache::UserCache;
pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;

/// Un utilisateur connu du jukebox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub user_id: UserId,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Storage backend for users and submitted songs.
///
/// The store is the authority for song ids: `add_song` allocates a fresh id
/// that the queue then uses as the song's identity.
#[async_trait]
pub trait JukeboxStore: Send + Sync {
    /// Returns the user, or `None` if unknown.
    async fn user_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Creates a user. Fails with [`StoreError::UserExists`] if the id is taken.
    async fn add_user(&self, user_id: UserId, username: &str) -> Result<User>;

    /// Renames an existing user.
    async fn update_username(&self, user_id: UserId, username: &str) -> Result<()>;

    /// Records a submission and returns the allocated song id.
    async fn add_song(
        &self,
        title: &str,
        service: &str,
        service_id: &str,
        user_id: UserId,
    ) -> Result<SongId>;

    /// Looks a stored song up, with its submitter's current username.
    async fn song_by_id(&self, song_id: SongId) -> Result<Option<Song>>;
}
