//! Dispatcher de lecture
//!
//! Tâche de fond unique qui décide quand pousser le morceau suivant aux
//! players. Elle consomme :
//! - les rapports de statut transmis par le registre,
//! - les requêtes explicites (skip, pause, lecture),
//! - le réveil de la file lorsqu'elle redevient non vide,
//! - l'annulation à l'arrêt du serveur.

use std::path::PathBuf;
use std::sync::Arc;

use pmoqueue::{QueueManager, Song, SongId};
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{JukeboxError, Result};
use crate::model::{PlayerControl, PlayerId, PlayerStatus};
use crate::registry::{PlayerRegistry, StatusReceiver};

/// Observable state of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DispatcherState {
    /// Nothing dispatched, waiting for the queue to fill up.
    Idle,
    /// `song_id` was sent to the players and is the current now playing.
    Dispatched { song_id: SongId },
    Stopped,
}

enum Request {
    Skip(oneshot::Sender<Option<Song>>),
    Pop(oneshot::Sender<Option<Song>>),
    Greet(PlayerId),
    Pause,
    Play,
}

/// Handle on the playback control loop.
pub struct Dispatcher {
    requests: mpsc::UnboundedSender<Request>,
    state: watch::Receiver<DispatcherState>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Spawns the control loop on the current runtime.
    ///
    /// When `snapshot` is set, the queue is saved there after every pop.
    pub fn spawn(
        queue: QueueManager,
        registry: Arc<PlayerRegistry>,
        statuses: StatusReceiver,
        snapshot: Option<PathBuf>,
    ) -> Self {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(DispatcherState::Idle);
        let cancel = CancellationToken::new();

        let control_loop = ControlLoop {
            queue,
            registry,
            snapshot,
            state: state_tx,
            current: None,
        };
        let handle = tokio::spawn(control_loop.run(requests_rx, statuses, cancel.clone()));

        Self {
            requests: requests_tx,
            state: state_rx,
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Pops the next song and sends it to every player, whatever the
    /// current state. Returns the new now playing.
    pub async fn skip(&self) -> Result<Option<Song>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(Request::Skip(reply_tx))
            .map_err(|_| JukeboxError::DispatcherStopped)?;
        reply_rx.await.map_err(|_| JukeboxError::DispatcherStopped)
    }

    /// Pops the next song for the REST `/pop` route. Same transition as
    /// [`skip`](Dispatcher::skip): the popped song is dispatched.
    pub async fn pop(&self) -> Result<Option<Song>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(Request::Pop(reply_tx))
            .map_err(|_| JukeboxError::DispatcherStopped)?;
        reply_rx.await.map_err(|_| JukeboxError::DispatcherStopped)
    }

    /// Sends the current now playing to a freshly registered player.
    pub fn greet(&self, player_id: PlayerId) {
        if self.requests.send(Request::Greet(player_id)).is_err() {
            debug!(player_id, "Dispatcher stopped, no greeting sent");
        }
    }

    pub fn pause(&self) -> Result<()> {
        self.requests
            .send(Request::Pause)
            .map_err(|_| JukeboxError::DispatcherStopped)
    }

    /// Reprise de la lecture
    pub fn play(&self) -> Result<()> {
        self.requests
            .send(Request::Play)
            .map_err(|_| JukeboxError::DispatcherStopped)
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<DispatcherState> {
        self.state.clone()
    }

    /// Stops the loop and waits for it. Idempotent.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Dispatcher task ended abnormally: {}", e);
            }
        }
    }
}

struct ControlLoop {
    queue: QueueManager,
    registry: Arc<PlayerRegistry>,
    snapshot: Option<PathBuf>,
    state: watch::Sender<DispatcherState>,
    current: Option<SongId>,
}

impl ControlLoop {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut statuses: StatusReceiver,
        cancel: CancellationToken,
    ) {
        info!(policy = self.queue.policy_name(), "Playback dispatcher started");

        loop {
            let idle = self.current.is_none();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(request) = requests.recv() => self.handle_request(request).await,
                Some((player_id, status)) = statuses.recv() => {
                    self.handle_status(player_id, status).await
                }
                _ = self.queue.wait_for_more_songs(), if idle => {
                    self.advance().await;
                }
            }
        }

        self.state.send_replace(DispatcherState::Stopped);
        info!("Playback dispatcher stopped");
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::Skip(reply) => {
                let next = self.advance().await;
                let _ = reply.send(next);
            }
            Request::Pop(reply) => {
                debug!(current = ?self.current, "Queue popped on request");
                let next = self.advance().await;
                let _ = reply.send(next);
            }
            Request::Greet(player_id) => {
                // Servi entre deux diffusions : jamais en retard sur elles
                if let Some(song) = self.queue.now_playing().await {
                    self.registry
                        .send_to(player_id, PlayerControl::next(Some(song)))
                        .await;
                }
            }
            Request::Pause => {
                self.registry.broadcast(PlayerControl::Pause).await;
            }
            Request::Play => {
                self.registry.broadcast(PlayerControl::Play).await;
            }
        }
    }

    async fn handle_status(&mut self, player_id: PlayerId, status: PlayerStatus) {
        if !status.state.is_terminal() {
            return;
        }

        match (self.current, status.song_id) {
            (Some(current), Some(reported)) if current == reported => {
                if let Some(error) = &status.error {
                    warn!(player_id, song_id = reported, "Playback failed: {}", error);
                }
                debug!(player_id, song_id = reported, state = status.state.as_str(), "Song done");
                self.advance().await;
            }
            (current, reported) => {
                debug!(player_id, ?current, ?reported, "Stale status report ignored");
            }
        }
    }

    /// Pops the next song (if any) and sends it to the players.
    /// An empty queue sends `Next` without song and goes idle.
    async fn advance(&mut self) -> Option<Song> {
        let next = self.queue.pop_queue().await;
        self.current = next.as_ref().map(|song| song.song_id);

        let delivered = self
            .registry
            .broadcast(PlayerControl::next(next.clone()))
            .await;

        match &next {
            Some(song) => info!(song = %song, players = delivered, "Dispatched next song"),
            None => info!(players = delivered, "Queue empty, players told to stop"),
        }

        self.save_snapshot().await;
        self.state.send_replace(match self.current {
            Some(song_id) => DispatcherState::Dispatched { song_id },
            None => DispatcherState::Idle,
        });
        next
    }

    async fn save_snapshot(&self) {
        if let Some(path) = &self.snapshot {
            // l'échec est journalisé par le QueueManager
            let _ = self.queue.save_playlist(path).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pmoqueue::PolicyKind;
    use std::time::Duration;

    fn song(id: SongId) -> Song {
        Song::new(id, format!("t{id}"), "youtube", format!("v{id}"), 1, "alice")
    }

    async fn wait_for(
        rx: &mut watch::Receiver<DispatcherState>,
        expected: DispatcherState,
    ) -> DispatcherState {
        let state = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|state| *state == expected),
        )
        .await
        .expect("dispatcher state timeout")
        .expect("dispatcher dropped");
        *state
    }

    #[tokio::test]
    async fn test_stale_report_is_ignored() {
        let queue = QueueManager::with_policy(PolicyKind::Fifo);
        let (registry, statuses) = PlayerRegistry::new();
        let registry = Arc::new(registry);
        let (tx, _rx) = mpsc::unbounded_channel();
        let player = registry.register(tx).await;

        let dispatcher = Dispatcher::spawn(queue.clone(), registry.clone(), statuses, None);
        let mut state = dispatcher.subscribe();

        queue.add_song(song(1)).await;
        queue.add_song(song(2)).await;
        wait_for(&mut state, DispatcherState::Dispatched { song_id: 1 }).await;

        // Rapport pour un autre morceau : pas d'avance
        registry.receive(player, PlayerStatus::finished(42)).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(dispatcher.state(), DispatcherState::Dispatched { song_id: 1 });
        assert_eq!(queue.len().await, 1);

        dispatcher.stop().await;
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let queue = QueueManager::with_policy(PolicyKind::Fifo);
        let (registry, statuses) = PlayerRegistry::new();
        let dispatcher = Dispatcher::spawn(queue, Arc::new(registry), statuses, None);

        dispatcher.stop().await;
        dispatcher.stop().await;
        assert!(matches!(
            dispatcher.skip().await,
            Err(JukeboxError::DispatcherStopped)
        ));
    }
}
