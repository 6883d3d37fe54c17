//! # pmoqueue - File d'attente partagée du jukebox
//!
//! Cette crate fournit la file d'attente multi-utilisateurs du jukebox :
//! - Politiques d'ordonnancement interchangeables (FIFO, Round-Robin)
//! - Un gestionnaire thread-safe avec suivi du morceau "now playing"
//! - Attente asynchrone d'une file non vide (sans polling)
//! - Snapshots binaires pour la reprise après crash
//!
//! # Architecture
//!
//! - **QueuePolicy** : stratégie d'ordre pure (aucune synchronisation)
//! - **QueueManager** : état partagé (file + now playing) derrière un seul verrou
//! - **snapshot** : encodage bincode et écriture atomique sur disque
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pmoqueue::{PolicyKind, QueueManager, Song};
//!
//! # #[tokio::main]
//! # async fn main() -> pmoqueue::Result<()> {
//! let queue = QueueManager::with_policy(PolicyKind::RoundRobin);
//!
//! queue
//!     .add_song(Song::new(1, "Intro", "youtube", "dQw4w9WgXcQ", 10, "alice"))
//!     .await;
//!
//! queue.wait_for_more_songs().await;
//! if let Some(song) = queue.pop_queue().await {
//!     println!("Now playing: {}", song.title);
//! }
//!
//! queue.save_playlist("/tmp/jukebox.queue").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod manager;
mod song;

pub mod policy;
pub mod snapshot;

// Réexports publics
pub use error::{QueueError, Result};
pub use manager::QueueManager;
pub use policy::{FifoQueue, PolicyKind, QueuePolicy, RoundRobinQueue};
pub use song::{Song, SongId, UserId};
