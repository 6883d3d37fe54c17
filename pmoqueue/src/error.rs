//! Types d'erreurs pour pmoqueue

use crate::{SongId, UserId};
use std::path::{Path, PathBuf};

/// Erreurs de gestion de la file d'attente
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Song with id {0} does not exist in the queue")]
    NotFound(SongId),

    #[error("The user id {user_id} for song {song_id} does not match the id of the submitter")]
    PermissionDenied { song_id: SongId, user_id: UserId },

    #[error("Snapshot I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode playlist snapshot: {0}")]
    Encode(String),

    #[error("Failed to decode playlist snapshot: {0}")]
    Decode(String),
}

impl QueueError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        QueueError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Type Result spécialisé pour pmoqueue
pub type Result<T> = std::result::Result<T, QueueError>;
