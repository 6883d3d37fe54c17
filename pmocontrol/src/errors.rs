use pmoqueue::{QueueError, UserId};
use pmostore::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JukeboxError {
    #[error("User {0} is not logged in")]
    UnknownUser(UserId),
    #[error("Invalid user: {0}")]
    InvalidUser(String),
    #[error("Unsupported or malformed link: {0}")]
    UnresolvedLink(String),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Playback dispatcher is stopped")]
    DispatcherStopped,
    #[error("Jukebox is shutting down")]
    ShuttingDown,
}

impl JukeboxError {
    pub fn unresolved_link(link: &str) -> Self {
        JukeboxError::UnresolvedLink(link.to_string())
    }

    pub fn invalid_user(message: &str) -> Self {
        JukeboxError::InvalidUser(message.to_string())
    }
}

pub type Result<T> = std::result::Result<T, JukeboxError>;
