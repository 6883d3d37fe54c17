//! Documentation OpenAPI et DTOs pour l'API Jukebox
//!
//! Ce module fournit les types de réponse / payloads pour l'API REST du
//! jukebox, ainsi que la documentation OpenAPI via `utoipa`.

#[cfg(feature = "pmoserver")]
use crate::model::PlayerInfo;
#[cfg(feature = "pmoserver")]
use pmoqueue::Song;
#[cfg(feature = "pmoserver")]
use pmostore::User;
#[cfg(feature = "pmoserver")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "pmoserver")]
use utoipa::{OpenApi, ToSchema};

// ============================================================================
// SONGS
// ============================================================================

/// Morceau de la file d'attente
#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SongSummary {
    /// ID du morceau (attribué par la base)
    pub song_id: u32,
    /// Titre
    pub title: String,
    /// Nom de l'utilisateur qui l'a soumis
    pub username: String,
    /// ID de l'utilisateur qui l'a soumis
    pub user_id: u32,
    /// Service source ("youtube", "soundcloud", "spotify")
    pub service: String,
    /// Identifiant propre au service
    pub service_id: String,
}

#[cfg(feature = "pmoserver")]
impl From<Song> for SongSummary {
    fn from(song: Song) -> Self {
        Self {
            song_id: song.song_id,
            title: song.title,
            username: song.username,
            user_id: song.user_id,
            service: song.service,
            service_id: song.service_id,
        }
    }
}

/// Soumission d'un morceau
#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitSongRequest {
    pub user_id: u32,
    /// Lien YouTube, SoundCloud ou Spotify
    pub link: String,
    /// Titre optionnel (par défaut "service:id")
    #[serde(default)]
    pub title: Option<String>,
}

/// Retrait d'un morceau par son auteur
#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RemoveSongRequest {
    pub song_id: u32,
    pub user_id: u32,
}

/// Sauvegarde de la file vers un fichier
#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SavePlaylistRequest {
    /// Chemin du fichier côté serveur
    pub path: String,
}

// ============================================================================
// USERS
// ============================================================================

#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub user_id: u32,
    pub username: String,
}

#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub user_id: u32,
    pub username: String,
    /// Date de création (RFC 3339)
    pub created_at: String,
}

#[cfg(feature = "pmoserver")]
impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

// ============================================================================
// PLAYERS
// ============================================================================

/// Player connecté et son dernier statut
#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// ID de connexion
    pub id: u64,
    /// Date de connexion (RFC 3339)
    pub connected_at: String,
    /// Dernier état rapporté ("idle", "playing", ...), None avant tout rapport
    pub state: Option<String>,
    /// Morceau en cours côté player
    pub song_id: Option<u32>,
    /// Position en millisecondes
    pub position_ms: Option<u64>,
    /// Dernière erreur rapportée
    pub error: Option<String>,
}

#[cfg(feature = "pmoserver")]
impl From<PlayerInfo> for PlayerSummary {
    fn from(info: PlayerInfo) -> Self {
        let status = info.last_status;
        Self {
            id: info.id,
            connected_at: info.connected_at.to_rfc3339(),
            state: status.as_ref().map(|s| s.state.as_str().to_string()),
            song_id: status.as_ref().and_then(|s| s.song_id),
            position_ms: status.as_ref().and_then(|s| s.position_ms),
            error: status.and_then(|s| s.error),
        }
    }
}

// ============================================================================
// RESPONSES
// ============================================================================

/// Réponse des opérations de mutation
#[cfg(feature = "pmoserver")]
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    /// Morceau concerné, si l'opération en produit un
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song: Option<SongSummary>,
}

#[cfg(feature = "pmoserver")]
impl MutationResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            song: None,
        }
    }

    pub fn with_song(message: impl Into<String>, song: Option<Song>) -> Self {
        Self {
            song: song.map(SongSummary::from),
            ..Self::ok(message)
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            song: None,
        }
    }
}

// ============================================================================
// OPENAPI
// ============================================================================

#[cfg(feature = "pmoserver")]
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PMOJukebox API",
        description = "File d'attente musicale partagée et contrôle des players"
    ),
    paths(
        crate::pmoserver_ext::submit_song,
        crate::pmoserver_ext::get_playlist,
        crate::pmoserver_ext::get_now_playing,
        crate::pmoserver_ext::login_user,
        crate::pmoserver_ext::pop_queue,
        crate::pmoserver_ext::remove_song,
        crate::pmoserver_ext::save_playlist,
        crate::pmoserver_ext::next_song,
        crate::pmoserver_ext::pause_song,
        crate::pmoserver_ext::play_song,
        crate::pmoserver_ext::list_players,
        crate::pmoserver_ext::player_stream,
    ),
    components(schemas(
        SongSummary,
        SubmitSongRequest,
        RemoveSongRequest,
        SavePlaylistRequest,
        LoginRequest,
        UserSummary,
        PlayerSummary,
        MutationResponse,
    )),
    tags(
        (name = "jukebox", description = "File d'attente partagée et contrôle de la lecture")
    )
)]
pub struct ApiDoc;
