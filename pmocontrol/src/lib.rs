//! # pmocontrol - Contrôle de la lecture du jukebox
//!
//! - [`PlayerRegistry`] : connexions players et diffusion des commandes
//! - [`Dispatcher`] : boucle de fond qui avance la lecture
//! - [`run_connection`] : service d'une connexion, indépendant du transport
//! - [`Jukebox`] : façade exposée aux clients (soumission, login, file,
//!   contrôle, players)
//! - feature `pmoserver` : API REST `/api/jukebox` et flux WebSocket des
//!   players

mod connection;

pub mod dispatcher;
pub mod errors;
pub mod jukebox;
pub mod model;
pub mod registry;
pub mod resolver;

// pmoserver extension (optional)
#[cfg(feature = "pmoserver")]
pub mod openapi;
#[cfg(feature = "pmoserver")]
pub mod pmoserver_ext;

#[cfg(feature = "pmoserver")]
pub use pmoserver_ext::JukeboxExt;

pub use connection::run_connection;
pub use dispatcher::{Dispatcher, DispatcherState};
pub use errors::{JukeboxError, Result};
pub use jukebox::Jukebox;
pub use model::{PlaybackState, PlayerControl, PlayerId, PlayerInfo, PlayerStatus};
pub use registry::PlayerRegistry;
pub use resolver::{LinkResolver, ResolvedLink};
