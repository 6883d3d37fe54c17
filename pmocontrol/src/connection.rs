//! Boucle de service d'une connexion player
//!
//! Indépendante du transport : l'entrée est un `Stream` de rapports, la
//! sortie un `Sink` de commandes. L'extension pmoserver y branche une
//! WebSocket, les tests des canaux mémoire.

use std::fmt::Display;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{PlayerControl, PlayerId, PlayerStatus};
use crate::registry::PlayerRegistry;

/// Serves one player until it disconnects, fails or `cancel` fires.
///
/// The connection is registered on entry and unregistered exactly once on
/// exit. `on_registered` runs right after registration, when broadcasts
/// already reach this player.
pub async fn run_connection<S, K, E, F>(
    registry: &PlayerRegistry,
    mut inbound: S,
    mut outbound: K,
    cancel: CancellationToken,
    on_registered: F,
) -> PlayerId
where
    S: Stream<Item = Result<PlayerStatus, E>> + Unpin,
    K: Sink<PlayerControl> + Unpin,
    K::Error: Display,
    E: Display,
    F: FnOnce(PlayerId),
{
    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    let id = registry.register(control_tx).await;
    on_registered(id);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(player_id = id, "Player connection cancelled");
                break;
            }
            control = control_rx.recv() => match control {
                Some(control) => {
                    if let Err(e) = outbound.send(control).await {
                        warn!(player_id = id, "Failed to send command to player: {}", e);
                        break;
                    }
                }
                // retiré du registre par ailleurs
                None => break,
            },
            status = inbound.next() => match status {
                Some(Ok(status)) => {
                    registry.receive(id, status).await;
                }
                Some(Err(e)) => {
                    warn!(player_id = id, "Player stream error: {}", e);
                    break;
                }
                None => {
                    info!(player_id = id, "Player closed its stream");
                    break;
                }
            },
        }
    }

    registry.unregister(id).await;
    let _ = outbound.close().await;
    id
}
