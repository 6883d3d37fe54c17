//! Extension pmoserver pour le Jukebox
//!
//! Ce module fournit l'API REST de la file d'attente partagée et le flux
//! WebSocket des players.

#[cfg(feature = "pmoserver")]
use crate::errors::JukeboxError;
#[cfg(feature = "pmoserver")]
use crate::jukebox::Jukebox;
#[cfg(feature = "pmoserver")]
use crate::model::{PlayerControl, PlayerStatus};
#[cfg(feature = "pmoserver")]
use crate::openapi::{
    LoginRequest, MutationResponse, PlayerSummary, RemoveSongRequest, SavePlaylistRequest,
    SongSummary, SubmitSongRequest, UserSummary,
};
#[cfg(feature = "pmoserver")]
use pmoqueue::QueueError;

#[cfg(feature = "pmoserver")]
use async_trait::async_trait;
#[cfg(feature = "pmoserver")]
use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
#[cfg(feature = "pmoserver")]
use futures::{SinkExt, StreamExt, future};
#[cfg(feature = "pmoserver")]
use std::sync::Arc;
#[cfg(feature = "pmoserver")]
use tracing::{debug, warn};
#[cfg(feature = "pmoserver")]
use utoipa::OpenApi;

/// État partagé pour l'API Jukebox
#[cfg(feature = "pmoserver")]
#[derive(Clone)]
pub struct JukeboxState {
    jukebox: Arc<Jukebox>,
}

#[cfg(feature = "pmoserver")]
impl JukeboxState {
    pub fn new(jukebox: Arc<Jukebox>) -> Self {
        Self { jukebox }
    }
}

#[cfg(feature = "pmoserver")]
type ApiError = (StatusCode, Json<MutationResponse>);

#[cfg(feature = "pmoserver")]
fn status_for(err: &JukeboxError) -> StatusCode {
    match err {
        JukeboxError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
        JukeboxError::InvalidUser(_) | JukeboxError::UnresolvedLink(_) => StatusCode::BAD_REQUEST,
        JukeboxError::Queue(QueueError::NotFound(_)) => StatusCode::NOT_FOUND,
        JukeboxError::Queue(QueueError::PermissionDenied { .. }) => StatusCode::FORBIDDEN,
        JukeboxError::Queue(_) | JukeboxError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        JukeboxError::DispatcherStopped | JukeboxError::ShuttingDown => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(feature = "pmoserver")]
fn api_error(err: JukeboxError) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        warn!("Jukebox request failed: {}", err);
    } else {
        debug!("Jukebox request rejected: {}", err);
    }
    (status, Json(MutationResponse::failed(err.to_string())))
}

// ============================================================================
// HANDLERS - QUEUE
// ============================================================================

/// POST /jukebox/songs - Soumet un morceau
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/songs",
    request_body = SubmitSongRequest,
    responses(
        (status = 200, description = "Morceau ajouté à la file", body = MutationResponse),
        (status = 400, description = "Lien non reconnu", body = MutationResponse),
        (status = 401, description = "Utilisateur inconnu", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn submit_song(
    State(state): State<JukeboxState>,
    Json(request): Json<SubmitSongRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let song = state
        .jukebox
        .submit_song(request.user_id, &request.link, request.title.as_deref())
        .await
        .map_err(api_error)?;

    Ok(Json(MutationResponse::with_song(
        format!("Song {} queued", song.song_id),
        Some(song),
    )))
}

/// GET /jukebox/playlist - Contenu de la file dans l'ordre de lecture
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    get,
    path = "/playlist",
    responses(
        (status = 200, description = "File d'attente", body = Vec<SongSummary>)
    ),
    tag = "jukebox"
)]
pub(crate) async fn get_playlist(State(state): State<JukeboxState>) -> Json<Vec<SongSummary>> {
    let songs = state.jukebox.playlist().await;
    Json(songs.into_iter().map(SongSummary::from).collect())
}

/// GET /jukebox/now_playing - Morceau en cours (objet vide si aucun)
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    get,
    path = "/now_playing",
    responses(
        (status = 200, description = "Morceau en cours, {} si aucun", body = SongSummary)
    ),
    tag = "jukebox"
)]
pub(crate) async fn get_now_playing(State(state): State<JukeboxState>) -> Json<serde_json::Value> {
    let body = state
        .jukebox
        .now_playing()
        .await
        .and_then(|song| serde_json::to_value(SongSummary::from(song)).ok())
        .unwrap_or_else(|| serde_json::json!({}));
    Json(body)
}

/// POST /jukebox/pop - Retire le prochain morceau et le diffuse aux players
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/pop",
    responses(
        (status = 200, description = "Morceau retiré et envoyé (absent si la file était vide)", body = MutationResponse),
        (status = 503, description = "Jukebox arrêté", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn pop_queue(
    State(state): State<JukeboxState>,
) -> Result<Json<MutationResponse>, ApiError> {
    let song = state.jukebox.pop_queue().await.map_err(api_error)?;
    let message = match &song {
        Some(song) => format!("Song {} is now playing", song.song_id),
        None => "Queue is empty".to_string(),
    };
    Ok(Json(MutationResponse::with_song(message, song)))
}

/// POST /jukebox/remove - Retire un morceau (auteur uniquement)
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/remove",
    request_body = RemoveSongRequest,
    responses(
        (status = 200, description = "Morceau retiré", body = MutationResponse),
        (status = 403, description = "L'utilisateur n'est pas l'auteur", body = MutationResponse),
        (status = 404, description = "Morceau absent de la file", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn remove_song(
    State(state): State<JukeboxState>,
    Json(request): Json<RemoveSongRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    let song = state
        .jukebox
        .remove_song(request.song_id, request.user_id)
        .await
        .map_err(api_error)?;

    Ok(Json(MutationResponse::with_song(
        format!("Song {} removed", song.song_id),
        Some(song),
    )))
}

/// POST /jukebox/save - Sauvegarde la file dans un fichier
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/save",
    request_body = SavePlaylistRequest,
    responses(
        (status = 200, description = "File sauvegardée", body = MutationResponse),
        (status = 500, description = "Échec d'écriture", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn save_playlist(
    State(state): State<JukeboxState>,
    Json(request): Json<SavePlaylistRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    state
        .jukebox
        .save_playlist(&request.path)
        .await
        .map_err(api_error)?;
    Ok(Json(MutationResponse::ok(format!(
        "Playlist saved to {}",
        request.path
    ))))
}

// ============================================================================
// HANDLERS - USERS
// ============================================================================

/// POST /jukebox/login - Identifie (ou crée) un utilisateur
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Utilisateur connecté", body = UserSummary),
        (status = 400, description = "Nom invalide", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn login_user(
    State(state): State<JukeboxState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state
        .jukebox
        .login_user(request.user_id, &request.username)
        .await
        .map_err(api_error)?;
    Ok(Json(UserSummary::from(user)))
}

// ============================================================================
// HANDLERS - PLAYBACK
// ============================================================================

/// POST /jukebox/next - Passe au morceau suivant
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/next",
    responses(
        (status = 200, description = "Morceau suivant envoyé aux players", body = MutationResponse),
        (status = 503, description = "Jukebox arrêté", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn next_song(
    State(state): State<JukeboxState>,
) -> Result<Json<MutationResponse>, ApiError> {
    let song = state.jukebox.next_song().await.map_err(api_error)?;
    let message = match &song {
        Some(song) => format!("Skipped to song {}", song.song_id),
        None => "Queue is empty, players stopped".to_string(),
    };
    Ok(Json(MutationResponse::with_song(message, song)))
}

/// POST /jukebox/pause - Met les players en pause
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/pause",
    responses(
        (status = 200, description = "Pause envoyée", body = MutationResponse),
        (status = 503, description = "Jukebox arrêté", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn pause_song(
    State(state): State<JukeboxState>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.jukebox.pause_song().map_err(api_error)?;
    Ok(Json(MutationResponse::ok("Paused")))
}

/// POST /jukebox/play - Reprend la lecture
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    post,
    path = "/play",
    responses(
        (status = 200, description = "Reprise envoyée", body = MutationResponse),
        (status = 503, description = "Jukebox arrêté", body = MutationResponse)
    ),
    tag = "jukebox"
)]
pub(crate) async fn play_song(
    State(state): State<JukeboxState>,
) -> Result<Json<MutationResponse>, ApiError> {
    state.jukebox.play_song().map_err(api_error)?;
    Ok(Json(MutationResponse::ok("Playing")))
}

// ============================================================================
// HANDLERS - PLAYERS
// ============================================================================

/// GET /jukebox/players - Players connectés
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    get,
    path = "/players",
    responses(
        (status = 200, description = "Players connectés", body = Vec<PlayerSummary>)
    ),
    tag = "jukebox"
)]
pub(crate) async fn list_players(State(state): State<JukeboxState>) -> Json<Vec<PlayerSummary>> {
    let players = state.jukebox.players().await;
    Json(players.into_iter().map(PlayerSummary::from).collect())
}

/// GET /jukebox/players/stream - Flux WebSocket d'un player
///
/// Trames sortantes : `PlayerControl` en JSON. Trames entrantes :
/// `PlayerStatus` en JSON ; les trames illisibles sont ignorées.
#[cfg(feature = "pmoserver")]
#[utoipa::path(
    get,
    path = "/players/stream",
    responses(
        (status = 101, description = "Connexion WebSocket établie")
    ),
    tag = "jukebox"
)]
pub(crate) async fn player_stream(
    State(state): State<JukeboxState>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_player_socket(socket, state.jukebox))
}

#[cfg(feature = "pmoserver")]
async fn handle_player_socket(socket: WebSocket, jukebox: Arc<Jukebox>) {
    let (sink, stream) = socket.split();
    let inbound = stream.filter_map(|frame| future::ready(decode_status(frame)));
    let outbound = sink.with(|control: PlayerControl| future::ready(encode_control(&control)));

    match jukebox
        .serve_player(Box::pin(inbound), Box::pin(outbound))
        .await
    {
        Ok(player_id) => debug!(player_id, "Player socket closed"),
        Err(e) => warn!("Player socket refused: {}", e),
    }
}

#[cfg(feature = "pmoserver")]
fn decode_status(
    frame: Result<Message, axum::Error>,
) -> Option<Result<PlayerStatus, axum::Error>> {
    let parsed = match frame {
        Ok(Message::Text(text)) => serde_json::from_str(text.as_str()),
        Ok(Message::Binary(data)) => serde_json::from_slice(&data),
        // ping, pong, close : gérés par axum
        Ok(_) => return None,
        Err(e) => return Some(Err(e)),
    };

    match parsed {
        Ok(status) => Some(Ok(status)),
        Err(e) => {
            warn!("Malformed player frame skipped: {}", e);
            None
        }
    }
}

#[cfg(feature = "pmoserver")]
fn encode_control(control: &PlayerControl) -> Result<Message, axum::Error> {
    serde_json::to_string(control)
        .map(|json| Message::Text(json.into()))
        .map_err(axum::Error::new)
}

// ============================================================================
// ROUTER & TRAIT
// ============================================================================

/// Crée le router pour l'API Jukebox
#[cfg(feature = "pmoserver")]
pub fn create_api_router(state: JukeboxState) -> Router {
    Router::new()
        // File d'attente
        .route("/songs", post(submit_song))
        .route("/playlist", get(get_playlist))
        .route("/now_playing", get(get_now_playing))
        .route("/pop", post(pop_queue))
        .route("/remove", post(remove_song))
        .route("/save", post(save_playlist))
        // Utilisateurs
        .route("/login", post(login_user))
        // Lecture
        .route("/next", post(next_song))
        .route("/pause", post(pause_song))
        .route("/play", post(play_song))
        // Players
        .route("/players", get(list_players))
        .route("/players/stream", get(player_stream))
        .with_state(state)
}

/// Trait d'extension pour pmoserver::Server
///
/// Permet d'exposer un Jukebox déjà démarré avec ses routes HTTP complètes
#[cfg(feature = "pmoserver")]
#[async_trait]
pub trait JukeboxExt {
    /// Enregistre l'API du Jukebox
    ///
    /// # Routes créées
    ///
    /// - API REST: `/api/jukebox/*`
    /// - WebSocket players: `/api/jukebox/players/stream`
    /// - Swagger: `/swagger-ui/jukebox`
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use pmocontrol::{Jukebox, JukeboxExt};
    /// use pmoserver::ServerBuilder;
    ///
    /// let jukebox = Arc::new(Jukebox::start(queue, store, Some(snapshot)));
    /// let mut server = ServerBuilder::new_configured().build();
    /// server.init_jukebox(jukebox.clone()).await;
    /// server.start().await?;
    /// ```
    async fn init_jukebox(&mut self, jukebox: Arc<Jukebox>);
}

#[cfg(feature = "pmoserver")]
#[async_trait]
impl JukeboxExt for pmoserver::Server {
    async fn init_jukebox(&mut self, jukebox: Arc<Jukebox>) {
        let api_router = create_api_router(JukeboxState::new(jukebox));
        self.add_openapi(api_router, crate::openapi::ApiDoc::openapi(), "jukebox")
            .await;

        tracing::info!("✅ Jukebox API registered:");
        tracing::info!("   - REST API: /api/jukebox/*");
        tracing::info!("   - Player stream: /api/jukebox/players/stream");
        tracing::info!("   - OpenAPI docs: /swagger-ui/jukebox");
    }
}
