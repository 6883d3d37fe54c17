//! Queue ordering policies.
//!
//! A policy is a pure, deterministic ordering strategy over the pending
//! songs. It carries no synchronization of its own: the `QueueManager`
//! owns exactly one policy instance and serializes every access to it.
//!
//! Adding a policy only requires implementing [`QueuePolicy`] and, if it
//! should be selectable from the configuration, a [`PolicyKind`] variant.

mod fifo;
mod round_robin;

use std::fmt;
use std::str::FromStr;

pub use fifo::FifoQueue;
pub use round_robin::RoundRobinQueue;

use crate::{Song, SongId};

/// Ordering strategy used by the `QueueManager`.
pub trait QueuePolicy: fmt::Debug + Send + Sync {
    /// Appends a song according to the policy.
    fn enqueue(&mut self, song: Song);

    /// Songs in the order successive `dequeue_next` calls would yield them.
    fn peek_order(&self) -> Vec<Song>;

    /// Removes and returns the next song to play.
    fn dequeue_next(&mut self) -> Option<Song>;

    /// Removes the song with the given id. Returns `false` if absent.
    fn remove(&mut self, song_id: SongId) -> bool;

    /// Short policy name, used in logs.
    fn name(&self) -> &'static str;

    fn len(&self) -> usize {
        self.peek_order().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks a pending song up by id.
    fn find(&self, song_id: SongId) -> Option<Song> {
        self.peek_order()
            .into_iter()
            .find(|song| song.song_id == song_id)
    }
}

/// Policies that can be selected by name (configuration, CLI...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyKind {
    Fifo,
    #[default]
    RoundRobin,
}

impl PolicyKind {
    /// Builds a fresh, empty policy of this kind.
    pub fn build(self) -> Box<dyn QueuePolicy> {
        match self {
            PolicyKind::Fifo => Box::new(FifoQueue::new()),
            PolicyKind::RoundRobin => Box::new(RoundRobinQueue::new()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Fifo => "fifo",
            PolicyKind::RoundRobin => "round_robin",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "round_robin" | "roundrobin" | "rr" => Ok(PolicyKind::RoundRobin),
            other => Err(format!("unknown queue policy '{}'", other)),
        }
    }
}
