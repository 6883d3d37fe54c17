//! Service jukebox
//!
//! Point d'entrée unique des opérations exposées aux clients : soumission,
//! identification des utilisateurs, inspection et contrôle de la file,
//! connexions players. Assemble la file, le registre, le dispatcher et le
//! stockage.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::{Sink, Stream};
use pmoqueue::{QueueManager, Song, SongId, UserId};
use pmostore::{JukeboxStore, User, UserCache};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::dispatcher::{Dispatcher, DispatcherState};
use crate::errors::{JukeboxError, Result};
use crate::model::{PlayerControl, PlayerId, PlayerInfo, PlayerStatus};
use crate::registry::PlayerRegistry;
use crate::resolver::LinkResolver;
use crate::connection::run_connection;

pub struct Jukebox {
    queue: QueueManager,
    registry: Arc<PlayerRegistry>,
    dispatcher: Dispatcher,
    store: Arc<dyn JukeboxStore>,
    users: UserCache,
    resolver: LinkResolver,
    snapshot_path: Option<PathBuf>,
    cancel: CancellationToken,
    connections: TaskTracker,
}

impl Jukebox {
    /// Builds the service and starts its dispatcher on the current runtime.
    ///
    /// `snapshot_path` is where the queue is saved after every change; `None`
    /// disables automatic snapshots.
    pub fn start(
        queue: QueueManager,
        store: Arc<dyn JukeboxStore>,
        snapshot_path: Option<PathBuf>,
    ) -> Self {
        let (registry, statuses) = PlayerRegistry::new();
        let registry = Arc::new(registry);
        let dispatcher = Dispatcher::spawn(
            queue.clone(),
            registry.clone(),
            statuses,
            snapshot_path.clone(),
        );

        info!(
            policy = queue.policy_name(),
            snapshot = ?snapshot_path,
            "Jukebox started"
        );

        Self {
            queue,
            registry,
            dispatcher,
            store,
            users: UserCache::new(),
            resolver: LinkResolver::new(),
            snapshot_path,
            cancel: CancellationToken::new(),
            connections: TaskTracker::new(),
        }
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn registry(&self) -> &Arc<PlayerRegistry> {
        &self.registry
    }

    pub fn users(&self) -> &UserCache {
        &self.users
    }

    pub fn dispatcher_state(&self) -> DispatcherState {
        self.dispatcher.state()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shutting_down() {
            Err(JukeboxError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    // ------------------------------------------------------------------
    // Utilisateurs
    // ------------------------------------------------------------------

    /// Creates the user on first login, renames it when the name changed,
    /// and refreshes the cache.
    pub async fn login_user(&self, user_id: UserId, username: &str) -> Result<User> {
        let username = username.trim();
        if username.is_empty() {
            return Err(JukeboxError::invalid_user("username must not be empty"));
        }

        let user = match self.store.user_by_id(user_id).await? {
            None => {
                info!(user_id, username, "New user");
                self.store.add_user(user_id, username).await?
            }
            Some(user) if user.username != username => {
                info!(user_id, old = %user.username, new = username, "User renamed");
                self.store.update_username(user_id, username).await?;
                User {
                    username: username.to_string(),
                    ..user
                }
            }
            Some(user) => user,
        };

        self.users.insert(user_id, user.username.clone()).await;
        Ok(user)
    }

    /// Cache first, then the store. A store hit fills the cache.
    async fn username_for(&self, user_id: UserId) -> Result<String> {
        if let Some(username) = self.users.lookup(user_id).await {
            return Ok(username);
        }

        match self.store.user_by_id(user_id).await? {
            Some(user) => {
                debug!(user_id, "User cache filled from store");
                self.users.insert(user_id, user.username.clone()).await;
                Ok(user.username)
            }
            None => Err(JukeboxError::UnknownUser(user_id)),
        }
    }

    // ------------------------------------------------------------------
    // File d'attente
    // ------------------------------------------------------------------

    /// Resolves `link`, records the song and enqueues it.
    pub async fn submit_song(
        &self,
        user_id: UserId,
        link: &str,
        title: Option<&str>,
    ) -> Result<Song> {
        self.ensure_running()?;

        let username = self.username_for(user_id).await?;
        let resolved = self.resolver.resolve(link)?;
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| resolved.label());

        let song_id = self
            .store
            .add_song(&title, resolved.service, &resolved.service_id, user_id)
            .await?;
        let song = Song::new(
            song_id,
            title,
            resolved.service,
            resolved.service_id,
            user_id,
            username,
        );

        if self.queue.add_song(song.clone()).await {
            info!(song = %song, "Song submitted");
        }
        self.save_snapshot().await;
        Ok(song)
    }

    pub async fn playlist(&self) -> Vec<Song> {
        self.queue.get_playlist().await
    }

    pub async fn now_playing(&self) -> Option<Song> {
        self.queue.now_playing().await
    }

    /// Pops the queue through the dispatcher, so the popped song becomes
    /// the dispatched one and reaches the players.
    pub async fn pop_queue(&self) -> Result<Option<Song>> {
        self.ensure_running()?;
        self.dispatcher.pop().await
    }

    pub async fn remove_song(&self, song_id: SongId, user_id: UserId) -> Result<Song> {
        let song = self.queue.remove_song(song_id, user_id).await?;
        info!(song = %song, "Song removed by its submitter");
        self.save_snapshot().await;
        Ok(song)
    }

    pub async fn save_playlist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.queue.save_playlist(path).await?;
        info!(path = %path.display(), "Playlist saved");
        Ok(())
    }

    async fn save_snapshot(&self) {
        if let Some(path) = &self.snapshot_path {
            // l'échec est journalisé par le QueueManager
            let _ = self.queue.save_playlist(path).await;
        }
    }

    // ------------------------------------------------------------------
    // Contrôle de la lecture
    // ------------------------------------------------------------------

    /// Skips to the next song. Returns the new now playing, `None` when the
    /// queue was empty and players were told to stop.
    pub async fn next_song(&self) -> Result<Option<Song>> {
        self.ensure_running()?;
        self.dispatcher.skip().await
    }

    pub fn pause_song(&self) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.pause()
    }

    pub fn play_song(&self) -> Result<()> {
        self.ensure_running()?;
        self.dispatcher.play()
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    pub async fn players(&self) -> Vec<PlayerInfo> {
        self.registry.players().await
    }

    /// Serves one player stream until it ends.
    ///
    /// Once registered, the player is sent the song playing at that point
    /// by the dispatcher, in order with its broadcasts. The loop is tracked,
    /// so [`stop`](Jukebox::stop) waits for it.
    pub async fn serve_player<S, K, E>(&self, inbound: S, outbound: K) -> Result<PlayerId>
    where
        S: Stream<Item = std::result::Result<PlayerStatus, E>> + Unpin,
        K: Sink<PlayerControl> + Unpin,
        K::Error: Display,
        E: Display,
    {
        self.ensure_running()?;

        let connection = async {
            // Suivi avant le test : un stop() concurrent attend cette tâche
            // ou bien elle voit l'annulation et ne s'enregistre pas.
            self.ensure_running()?;
            let id = run_connection(
                &self.registry,
                inbound,
                outbound,
                self.cancel.child_token(),
                |id| self.dispatcher.greet(id),
            )
            .await;
            Ok::<_, JukeboxError>(id)
        };
        self.connections.track_future(connection).await
    }

    /// Stops the dispatcher, closes every player connection and waits for
    /// their loops to finish.
    pub async fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!("Stopping jukebox");

        self.dispatcher.stop().await;
        self.cancel.cancel();
        self.connections.close();
        self.connections.wait().await;

        if !self.registry.is_empty().await {
            warn!("Player connections left after shutdown");
            self.registry.clear().await;
        }
        self.save_snapshot().await;
        info!("Jukebox stopped");
    }
}
