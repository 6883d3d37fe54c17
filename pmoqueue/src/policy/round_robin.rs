use std::collections::VecDeque;

use crate::policy::QueuePolicy;
use crate::{Song, SongId, UserId};

/// Pending songs of one submitter.
#[derive(Debug, Clone)]
struct Lane {
    user_id: UserId,
    songs: VecDeque<Song>,
}

/// Interleaves songs across submitters.
///
/// One lane per submitter with pending songs. The lane at the front of
/// `lanes` is the one whose turn it is; serving it rotates it to the back
/// if it still holds songs, otherwise it is dropped. A submitter with
/// nothing pending therefore never consumes a turn, and a new submitter
/// joins the rotation after everybody already waiting.
///
/// Invariant: every lane in `lanes` is non-empty.
#[derive(Debug, Default, Clone)]
pub struct RoundRobinQueue {
    lanes: VecDeque<Lane>,
    len: usize,
}

impl RoundRobinQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of submitters that currently have songs pending.
    pub fn submitters(&self) -> usize {
        self.lanes.len()
    }
}

impl QueuePolicy for RoundRobinQueue {
    fn enqueue(&mut self, song: Song) {
        match self.lanes.iter_mut().find(|lane| lane.user_id == song.user_id) {
            Some(lane) => lane.songs.push_back(song),
            None => self.lanes.push_back(Lane {
                user_id: song.user_id,
                songs: VecDeque::from([song]),
            }),
        }
        self.len += 1;
    }

    fn peek_order(&self) -> Vec<Song> {
        // Le tour k sert la k-ième chanson de chaque lane encore active,
        // dans l'ordre courant de rotation.
        let rounds = self.lanes.iter().map(|l| l.songs.len()).max().unwrap_or(0);
        let mut order = Vec::with_capacity(self.len);
        for round in 0..rounds {
            for lane in &self.lanes {
                if let Some(song) = lane.songs.get(round) {
                    order.push(song.clone());
                }
            }
        }
        order
    }

    fn dequeue_next(&mut self) -> Option<Song> {
        let mut lane = self.lanes.pop_front()?;
        let song = lane.songs.pop_front();
        if !lane.songs.is_empty() {
            self.lanes.push_back(lane);
        }
        if song.is_some() {
            self.len -= 1;
        }
        song
    }

    fn remove(&mut self, song_id: SongId) -> bool {
        let found = self.lanes.iter().enumerate().find_map(|(lane_index, lane)| {
            lane.songs
                .iter()
                .position(|s| s.song_id == song_id)
                .map(|pos| (lane_index, pos))
        });

        let Some((lane_index, pos)) = found else {
            return false;
        };

        let lane = &mut self.lanes[lane_index];
        lane.songs.remove(pos);
        if lane.songs.is_empty() {
            self.lanes.remove(lane_index);
        }
        self.len -= 1;
        true
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }

    fn len(&self) -> usize {
        self.len
    }

    fn find(&self, song_id: SongId) -> Option<Song> {
        self.lanes
            .iter()
            .flat_map(|lane| lane.songs.iter())
            .find(|s| s.song_id == song_id)
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn song(id: SongId, user: UserId) -> Song {
        Song::new(id, format!("song {id}"), "youtube", format!("yt{id}"), user, format!("user{user}"))
    }

    fn drain(queue: &mut RoundRobinQueue) -> Vec<SongId> {
        std::iter::from_fn(|| queue.dequeue_next())
            .map(|s| s.song_id)
            .collect()
    }

    #[test]
    fn test_interleaves_second_submitter() {
        let mut rr = RoundRobinQueue::new();
        rr.enqueue(song(1, 10));
        rr.enqueue(song(2, 10));
        rr.enqueue(song(3, 20));

        assert_eq!(drain(&mut rr), vec![1, 3, 2]);
    }

    #[test]
    fn test_single_submitter_is_served_every_time() {
        let mut rr = RoundRobinQueue::new();
        for id in 1..=3 {
            rr.enqueue(song(id, 10));
        }
        assert_eq!(drain(&mut rr), vec![1, 2, 3]);
    }

    #[test]
    fn test_peek_order_matches_dequeue_order() {
        let mut rr = RoundRobinQueue::new();
        for (id, user) in [(1, 10), (2, 10), (3, 10), (4, 20), (5, 30), (6, 30)] {
            rr.enqueue(song(id, user));
        }

        let peeked: Vec<SongId> = rr.peek_order().iter().map(|s| s.song_id).collect();
        assert_eq!(peeked, vec![1, 4, 5, 2, 6, 3]);
        assert_eq!(drain(&mut rr), peeked);
    }

    #[test]
    fn test_no_submitter_served_twice_per_round() {
        let mut rr = RoundRobinQueue::new();
        let mut id = 0;
        for user in [10, 20, 30, 40] {
            for _ in 0..3 {
                id += 1;
                rr.enqueue(song(id, user));
            }
        }

        for _ in 0..3 {
            let mut served = HashSet::new();
            for _ in 0..4 {
                let next = rr.dequeue_next().expect("song pending");
                assert!(served.insert(next.user_id), "user {} served twice", next.user_id);
            }
        }
        assert!(rr.is_empty());
    }

    #[test]
    fn test_emptied_submitter_does_not_consume_a_turn() {
        let mut rr = RoundRobinQueue::new();
        rr.enqueue(song(1, 10));
        rr.enqueue(song(2, 20));
        rr.enqueue(song(3, 30));
        rr.enqueue(song(4, 30));

        // user 20 leaves before its turn
        assert!(rr.remove(2));
        assert_eq!(rr.submitters(), 2);
        assert_eq!(drain(&mut rr), vec![1, 3, 4]);
    }

    #[test]
    fn test_new_submitter_joins_after_waiting_ones() {
        let mut rr = RoundRobinQueue::new();
        rr.enqueue(song(1, 10));
        rr.enqueue(song(2, 10));
        rr.enqueue(song(3, 20));
        assert_eq!(rr.dequeue_next().map(|s| s.song_id), Some(1));

        rr.enqueue(song(4, 30));
        assert_eq!(drain(&mut rr), vec![3, 2, 4]);
    }

    #[test]
    fn test_returning_submitter_rejoins_at_back() {
        let mut rr = RoundRobinQueue::new();
        rr.enqueue(song(1, 10));
        rr.enqueue(song(2, 20));
        rr.enqueue(song(3, 20));
        rr.enqueue(song(5, 30));
        rr.enqueue(song(6, 30));
        assert_eq!(rr.dequeue_next().map(|s| s.song_id), Some(1));
        assert_eq!(rr.dequeue_next().map(|s| s.song_id), Some(2));

        // user 10 a perdu sa place : il passe après 30 et 20
        rr.enqueue(song(4, 10));
        assert_eq!(rr.submitters(), 3);
        assert_eq!(drain(&mut rr), vec![5, 3, 4, 6]);
    }

    #[test]
    fn test_len_and_find_track_removals() {
        let mut rr = RoundRobinQueue::new();
        rr.enqueue(song(1, 10));
        rr.enqueue(song(2, 20));
        assert_eq!(rr.len(), 2);
        assert_eq!(rr.find(2).map(|s| s.user_id), Some(20));

        assert!(!rr.remove(42));
        assert!(rr.remove(1));
        assert_eq!(rr.len(), 1);
        assert_eq!(rr.find(1), None);
    }
}
