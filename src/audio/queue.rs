//! The explicit play-next queue and the index arithmetic used to pick the
//! following track when the queue is empty.

use std::collections::VecDeque;

use rand::Rng;

use crate::library::Track;

/// Pending tracks, consumed front first.
#[derive(Debug, Default)]
pub struct TrackQueue {
    items: VecDeque<Track>,
}

impl TrackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// "Play next": goes ahead of everything already queued.
    pub fn push_front(&mut self, track: Track) {
        self.items.push_front(track);
    }

    /// "Play last": goes behind everything already queued.
    pub fn push_back(&mut self, track: Track) {
        self.items.push_back(track);
    }

    /// Take the head of the queue, dropping entries whose file has
    /// disappeared since they were queued.
    pub fn pop_playable(&mut self) -> Option<Track> {
        while let Some(track) = self.items.pop_front() {
            if track.path.is_file() {
                return Some(track);
            }
            tracing::warn!(path = %track.path.display(), "queued file is gone, skipping");
        }
        None
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }
}

/// Following index, wrapping to 0 after the last one.
pub(crate) fn next_index(current: usize, len: usize) -> usize {
    if len == 0 || current + 1 >= len { 0 } else { current + 1 }
}

/// Preceding index, wrapping to the last one before 0.
pub(crate) fn previous_index(current: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else if current == 0 || current >= len {
        len - 1
    } else {
        current - 1
    }
}

/// Uniformly random index in `0..len` other than `exclude`.
///
/// With a single candidate the only index is returned. When `exclude` is
/// out of range every index is eligible.
pub(crate) fn random_index_excluding<R: Rng + ?Sized>(rng: &mut R, len: usize, exclude: usize) -> usize {
    match len {
        0 | 1 => 0,
        _ if exclude >= len => rng.gen_range(0..len),
        _ => {
            let pick = rng.gen_range(0..len - 1);
            if pick >= exclude { pick + 1 } else { pick }
        }
    }
}
