// Particle banking
//
// Each worker thread fills its own bank during sampling. Banks are only
// combined after the parallel region has ended.

use crate::particle::ParticleState;
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Queue of sampled particle states owned by a single worker
#[derive(Debug, Clone, Default)]
pub struct ParticleBank {
    queue: VecDeque<ParticleState>,
}

impl ParticleBank {
    /// Create a new empty particle bank
    pub fn new() -> Self {
        ParticleBank {
            queue: VecDeque::new(),
        }
    }

    /// Create a particle bank with an initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        ParticleBank {
            queue: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, particle: ParticleState) {
        self.queue.push_back(particle);
    }

    /// Get the next particle from the bank, None if empty
    pub fn pop_particle(&mut self) -> Option<ParticleState> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleState> {
        self.queue.iter()
    }

    /// Move every particle of `other` into this bank, keeping the result
    /// ordered by `compare`. The sort is stable, so equal particles keep
    /// their relative order (this bank first).
    pub fn merge<F>(&mut self, other: ParticleBank, mut compare: F)
    where
        F: FnMut(&ParticleState, &ParticleState) -> Ordering,
    {
        self.queue.extend(other.queue);
        self.queue.make_contiguous().sort_by(|a, b| compare(a, b));
    }

    /// Merge a set of per-thread banks into one, ordered by history number
    pub fn merge_by_history(banks: Vec<ParticleBank>) -> ParticleBank {
        Self::merge_all(banks, |a, b| a.history_number.cmp(&b.history_number))
    }

    pub fn merge_all<F>(banks: Vec<ParticleBank>, mut compare: F) -> ParticleBank
    where
        F: FnMut(&ParticleState, &ParticleState) -> Ordering,
    {
        let capacity = banks.iter().map(|bank| bank.len()).sum();
        let mut merged = ParticleBank::with_capacity(capacity);
        for bank in banks {
            merged.queue.extend(bank.queue);
        }
        merged.queue.make_contiguous().sort_by(|a, b| compare(a, b));
        merged
    }

    pub fn into_vec(self) -> Vec<ParticleState> {
        self.queue.into()
    }
}

impl IntoIterator for ParticleBank {
    type Item = ParticleState;
    type IntoIter = std::collections::vec_deque::IntoIter<ParticleState>;

    fn into_iter(self) -> Self::IntoIter {
        self.queue.into_iter()
    }
}
