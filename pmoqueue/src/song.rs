//! Song : enregistrement immuable d'une soumission

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifiant numérique d'un morceau soumis
pub type SongId = u32;

/// Identifiant numérique d'un utilisateur
pub type UserId = u32;

/// A song as it lives in the queue.
///
/// A song never changes once enqueued. Its identity for removal purposes is
/// the pair (`song_id`, `user_id`): only the submitter may evict it.
///
/// Field order matters: it is the order used by the binary snapshot
/// encoding, so new fields must be appended at the end.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Song {
    pub song_id: SongId,
    pub title: String,
    pub username: String,
    pub user_id: UserId,
    /// Name of the source service ("youtube", "soundcloud", ...).
    pub service: String,
    /// Service specific identifier (video id, track slug, ...).
    pub service_id: String,
}

impl Song {
    pub fn new(
        song_id: SongId,
        title: impl Into<String>,
        service: impl Into<String>,
        service_id: impl Into<String>,
        user_id: UserId,
        username: impl Into<String>,
    ) -> Self {
        Self {
            song_id,
            title: title.into(),
            username: username.into(),
            user_id,
            service: service.into(),
            service_id: service_id.into(),
        }
    }

    /// True when `user_id` is the submitter of this song.
    pub fn is_submitted_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{id: {}, title: {:?}, service: {}:{}, user: {} ({})}}",
            self.song_id, self.title, self.service, self.service_id, self.username, self.user_id
        )
    }
}
