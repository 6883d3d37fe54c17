use std::collections::VecDeque;

use crate::policy::QueuePolicy;
use crate::{Song, SongId};

/// Strict submission order.
#[derive(Debug, Default, Clone)]
pub struct FifoQueue {
    songs: VecDeque<Song>,
}

impl FifoQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl QueuePolicy for FifoQueue {
    fn enqueue(&mut self, song: Song) {
        self.songs.push_back(song);
    }

    fn peek_order(&self) -> Vec<Song> {
        self.songs.iter().cloned().collect()
    }

    fn dequeue_next(&mut self) -> Option<Song> {
        self.songs.pop_front()
    }

    fn remove(&mut self, song_id: SongId) -> bool {
        match self.songs.iter().position(|s| s.song_id == song_id) {
            Some(index) => self.songs.remove(index).is_some(),
            None => false,
        }
    }

    fn name(&self) -> &'static str {
        "fifo"
    }

    fn len(&self) -> usize {
        self.songs.len()
    }

    fn find(&self, song_id: SongId) -> Option<Song> {
        self.songs.iter().find(|s| s.song_id == song_id).cloned()
    }
}
