//! QueueManager : état partagé de la file d'attente
//!
//! La file (politique d'ordre) et le morceau "now playing" vivent dans un
//! seul état protégé par un `RwLock` : aucune opération ne peut observer un
//! morceau à la fois dans la file et en lecture.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify, RwLock};
use tracing::{debug, info, warn};

use crate::policy::{PolicyKind, QueuePolicy};
use crate::{QueueError, Result, Song, SongId, UserId, snapshot};

struct QueueState {
    policy: Box<dyn QueuePolicy>,
    now_playing: Option<Song>,
}

impl QueueState {
    fn contains(&self, song_id: SongId) -> bool {
        self.now_playing
            .as_ref()
            .is_some_and(|song| song.song_id == song_id)
            || self.policy.find(song_id).is_some()
    }
}

struct QueueInner {
    state: RwLock<QueueState>,
    /// Signalé à chaque transition vide -> non vide, verrou exclusif tenu.
    more_songs: Notify,
    /// Une seule sauvegarde à la fois, de la capture jusqu'au renommage.
    save_lock: Mutex<()>,
    policy_name: &'static str,
}

/// Thread-safe song queue with a single "now playing" slot.
///
/// Cloning is cheap and yields a handle on the same queue.
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<QueueInner>,
}

impl QueueManager {
    /// Creates a manager around the given policy. The policy is fixed for
    /// the lifetime of the manager.
    pub fn new(policy: Box<dyn QueuePolicy>) -> Self {
        let policy_name = policy.name();
        Self {
            inner: Arc::new(QueueInner {
                state: RwLock::new(QueueState {
                    policy,
                    now_playing: None,
                }),
                more_songs: Notify::new(),
                save_lock: Mutex::new(()),
                policy_name,
            }),
        }
    }

    pub fn with_policy(kind: PolicyKind) -> Self {
        Self::new(kind.build())
    }

    pub fn policy_name(&self) -> &'static str {
        self.inner.policy_name
    }

    /// Adds a song to the queue.
    ///
    /// A song whose id is already queued (or playing) is dropped and `false`
    /// is returned. Waiters blocked in [`wait_for_more_songs`] are woken when
    /// the queue goes from empty to non-empty.
    ///
    /// [`wait_for_more_songs`]: QueueManager::wait_for_more_songs
    pub async fn add_song(&self, song: Song) -> bool {
        let mut state = self.inner.state.write().await;

        if state.contains(song.song_id) {
            warn!(
                song_id = song.song_id,
                user_id = song.user_id,
                "Duplicate song id, submission dropped"
            );
            return false;
        }

        let was_empty = state.policy.is_empty();
        debug!(song = %song, policy = self.inner.policy_name, "Song queued");
        state.policy.enqueue(song);

        if was_empty {
            self.inner.more_songs.notify_waiters();
        }
        true
    }

    /// Enqueues songs loaded from a snapshot, skipping duplicates.
    /// Returns how many songs were actually added.
    pub async fn restore(&self, songs: Vec<Song>) -> usize {
        let mut added = 0;
        for song in songs {
            if self.add_song(song).await {
                added += 1;
            }
        }
        added
    }

    /// Number of queued songs, now playing excluded.
    pub async fn len(&self) -> usize {
        self.inner.state.read().await.policy.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of the current play order.
    pub async fn get_playlist(&self) -> Vec<Song> {
        self.inner.state.read().await.policy.peek_order()
    }

    pub async fn now_playing(&self) -> Option<Song> {
        self.inner.state.read().await.now_playing.clone()
    }

    /// Clears now playing, takes the next song from the policy and makes
    /// it the new now playing.
    pub async fn pop_queue(&self) -> Option<Song> {
        let mut state = self.inner.state.write().await;
        state.now_playing = None;

        let next = state.policy.dequeue_next()?;
        info!(song = %next, remaining = state.policy.len(), "Popped song");
        state.now_playing = Some(next.clone());
        Some(next)
    }

    /// Removes a queued song on behalf of `user_id`.
    ///
    /// Only the submitter may remove a song, and the now playing song is
    /// never touched.
    pub async fn remove_song(&self, song_id: SongId, user_id: UserId) -> Result<Song> {
        let mut state = self.inner.state.write().await;

        let song = state
            .policy
            .find(song_id)
            .ok_or(QueueError::NotFound(song_id))?;

        if !song.is_submitted_by(user_id) {
            return Err(QueueError::PermissionDenied { song_id, user_id });
        }

        if !state.policy.remove(song_id) {
            return Err(QueueError::NotFound(song_id));
        }

        debug!(song_id, user_id, "Removed song");
        Ok(song)
    }

    /// Waits until the queue holds at least one song.
    ///
    /// Returns immediately if the queue is already non-empty.
    pub async fn wait_for_more_songs(&self) {
        loop {
            let notified = self.inner.more_songs.notified();
            tokio::pin!(notified);
            // S'enregistrer avant de tester la condition : un ajout entre le
            // test et l'attente réveille quand même ce waiter.
            notified.as_mut().enable();

            if !self.is_empty().await {
                return;
            }

            notified.await;
        }
    }

    /// Writes the current order to `path`.
    ///
    /// Saves from this manager run one after the other, each capturing the
    /// order once it holds the save lock, so the last save to finish always
    /// carries the latest order.
    pub async fn save_playlist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let _saving = self.inner.save_lock.lock().await;
        let songs = self.get_playlist().await;
        snapshot::write_snapshot(path, songs).await.inspect_err(|e| {
            warn!(path = %path.display(), "Failed to save playlist: {}", e);
        })
    }

    /// Reads back a snapshot written by [`save_playlist`]. The queue itself
    /// is left untouched, see [`restore`].
    ///
    /// [`save_playlist`]: QueueManager::save_playlist
    /// [`restore`]: QueueManager::restore
    pub async fn load_playlist(&self, path: impl AsRef<Path>) -> Result<Vec<Song>> {
        snapshot::read_snapshot(path.as_ref()).await
    }
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueManager")
            .field("policy", &self.inner.policy_name)
            .finish_non_exhaustive()
    }
}
