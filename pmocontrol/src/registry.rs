//! Registre des connexions players
//!
//! Chaque connexion possède un canal sortant (`PlayerControl`) dont le
//! registre détient l'unique émetteur. Les rapports entrants sont transmis
//! tels quels au dispatcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

use crate::model::{PlayerControl, PlayerId, PlayerInfo, PlayerStatus};

/// Émetteur des commandes vers une connexion
pub type ControlSender = mpsc::UnboundedSender<PlayerControl>;

/// Flux `(player, rapport)` consommé par le dispatcher
pub type StatusReceiver = mpsc::UnboundedReceiver<(PlayerId, PlayerStatus)>;

#[derive(Debug)]
struct PlayerEntry {
    sender: ControlSender,
    connected_at: DateTime<Utc>,
    last_status: Option<PlayerStatus>,
}

/// Set of live player connections.
#[derive(Debug)]
pub struct PlayerRegistry {
    players: RwLock<HashMap<PlayerId, PlayerEntry>>,
    next_id: AtomicU64,
    status_tx: mpsc::UnboundedSender<(PlayerId, PlayerStatus)>,
}

impl PlayerRegistry {
    /// Creates an empty registry and the status stream feeding the dispatcher.
    pub fn new() -> (Self, StatusReceiver) {
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let registry = Self {
            players: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            status_tx,
        };
        (registry, status_rx)
    }

    /// Adds a connection and returns its id.
    pub async fn register(&self, sender: ControlSender) -> PlayerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut players = self.players.write().await;
        players.insert(
            id,
            PlayerEntry {
                sender,
                connected_at: Utc::now(),
                last_status: None,
            },
        );
        info!(player_id = id, connected = players.len(), "Player connected");
        id
    }

    /// Removes a connection. Returns `false` if it was already gone.
    pub async fn unregister(&self, id: PlayerId) -> bool {
        let mut players = self.players.write().await;
        match players.remove(&id) {
            Some(_) => {
                info!(player_id = id, connected = players.len(), "Player disconnected");
                true
            }
            None => false,
        }
    }

    /// Sends `control` to every live connection and returns how many
    /// accepted it.
    ///
    /// The live set is captured before sending: a connection that drops
    /// meanwhile only loses its own copy, and a failed send unregisters
    /// that connection alone.
    pub async fn broadcast(&self, control: PlayerControl) -> usize {
        let targets: Vec<(PlayerId, ControlSender)> = {
            let players = self.players.read().await;
            players
                .iter()
                .map(|(id, entry)| (*id, entry.sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for (id, sender) in targets {
            if sender.send(control.clone()).is_ok() {
                delivered += 1;
            } else {
                failed.push(id);
            }
        }

        for id in failed {
            warn!(player_id = id, "Player channel closed during broadcast");
            self.unregister(id).await;
        }

        debug!(?control, delivered, "Broadcast to players");
        delivered
    }

    /// Sends `control` to one connection.
    pub async fn send_to(&self, id: PlayerId, control: PlayerControl) -> bool {
        let sender = {
            let players = self.players.read().await;
            match players.get(&id) {
                Some(entry) => entry.sender.clone(),
                None => return false,
            }
        };

        if sender.send(control).is_ok() {
            true
        } else {
            self.unregister(id).await;
            false
        }
    }

    /// Records a status report and forwards it to the dispatcher.
    /// Reports from unknown connections are dropped.
    pub async fn receive(&self, id: PlayerId, status: PlayerStatus) -> bool {
        {
            let mut players = self.players.write().await;
            match players.get_mut(&id) {
                Some(entry) => entry.last_status = Some(status.clone()),
                None => {
                    debug!(player_id = id, "Status from unregistered player ignored");
                    return false;
                }
            }
        }

        if self.status_tx.send((id, status)).is_err() {
            debug!(player_id = id, "Dispatcher gone, status not forwarded");
        }
        true
    }

    /// Connected players, sorted by id.
    pub async fn players(&self) -> Vec<PlayerInfo> {
        let players = self.players.read().await;
        let mut infos: Vec<PlayerInfo> = players
            .iter()
            .map(|(id, entry)| PlayerInfo {
                id: *id,
                connected_at: entry.connected_at,
                last_status: entry.last_status.clone(),
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    /// Drops every connection. Their loops observe a closed channel.
    pub async fn clear(&self) {
        let mut players = self.players.write().await;
        if !players.is_empty() {
            info!(count = players.len(), "Dropping all player connections");
        }
        players.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlaybackState;

    #[tokio::test]
    async fn test_ids_are_never_reused() {
        let (registry, _statuses) = PlayerRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let first = registry.register(tx.clone()).await;
        assert!(registry.unregister(first).await);
        let second = registry.register(tx).await;

        assert_ne!(first, second);
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (registry, _statuses) = PlayerRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await;

        assert!(registry.unregister(id).await);
        assert!(!registry.unregister(id).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_broadcast_drops_closed_connection_only() {
        let (registry, _statuses) = PlayerRegistry::new();
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let a = registry.register(tx_a).await;
        let b = registry.register(tx_b).await;

        drop(rx_a);
        let delivered = registry.broadcast(PlayerControl::Pause).await;

        assert_eq!(delivered, 1);
        assert_eq!(rx_b.recv().await, Some(PlayerControl::Pause));
        let ids: Vec<PlayerId> = registry.players().await.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![b]);
        assert!(!registry.send_to(a, PlayerControl::Play).await);
    }

    #[tokio::test]
    async fn test_receive_records_and_forwards() {
        let (registry, mut statuses) = PlayerRegistry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = registry.register(tx).await;

        let status = PlayerStatus::playing(3, 1500);
        assert!(registry.receive(id, status.clone()).await);
        assert_eq!(statuses.recv().await, Some((id, status.clone())));

        let info = &registry.players().await[0];
        assert_eq!(info.last_status.as_ref().map(|s| s.state), Some(PlaybackState::Playing));

        // id inconnu : ni enregistré ni transmis
        assert!(!registry.receive(id + 1, status).await);
        assert!(statuses.try_recv().is_err());
    }
}
