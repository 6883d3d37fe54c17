//! Messages échangés avec les players distants

use chrono::{DateTime, Utc};
use pmoqueue::{Song, SongId};
use serde::{Deserialize, Serialize};

/// Identifiant attribué par le serveur à une connexion player.
/// Alloué de façon monotone, jamais réutilisé.
pub type PlayerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Finished,
    Failed,
}

impl PlaybackState {
    /// The player is done with its song, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, PlaybackState::Finished | PlaybackState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Finished => "finished",
            PlaybackState::Failed => "failed",
        }
    }
}

/// Status report sent by a player about the song it is handling.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerStatus {
    #[serde(default)]
    pub song_id: Option<SongId>,
    pub state: PlaybackState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlayerStatus {
    pub fn new(song_id: Option<SongId>, state: PlaybackState) -> Self {
        Self {
            song_id,
            state,
            position_ms: None,
            error: None,
        }
    }

    pub fn playing(song_id: SongId, position_ms: u64) -> Self {
        Self {
            position_ms: Some(position_ms),
            ..Self::new(Some(song_id), PlaybackState::Playing)
        }
    }

    pub fn finished(song_id: SongId) -> Self {
        Self::new(Some(song_id), PlaybackState::Finished)
    }

    pub fn failed(song_id: SongId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(Some(song_id), PlaybackState::Failed)
        }
    }
}

/// Command pushed to every connected player.
///
/// `Next { song: None }` means the queue ran dry: stop playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlayerControl {
    Next {
        #[serde(default)]
        song: Option<Song>,
    },
    Pause,
    Play,
}

impl PlayerControl {
    pub fn next(song: Option<Song>) -> Self {
        PlayerControl::Next { song }
    }
}

/// Vue d'une connexion player enregistrée
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub connected_at: DateTime<Utc>,
    pub last_status: Option<PlayerStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_wire_format() {
        let json = serde_json::to_value(PlayerControl::Pause).unwrap();
        assert_eq!(json, serde_json::json!({ "command": "pause" }));

        let json = serde_json::to_value(PlayerControl::next(None)).unwrap();
        assert_eq!(json, serde_json::json!({ "command": "next", "song": null }));
    }

    #[test]
    fn test_status_accepts_minimal_frame() {
        let status: PlayerStatus = serde_json::from_str(r#"{"state":"finished","song_id":4}"#).unwrap();
        assert_eq!(status, PlayerStatus::finished(4));

        let status: PlayerStatus = serde_json::from_str(r#"{"state":"idle"}"#).unwrap();
        assert_eq!(status.song_id, None);
        assert!(!status.state.is_terminal());
    }
}
