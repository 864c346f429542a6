//! Running statistics for monitoring a search.

use std::collections::VecDeque;

use crate::magic::{deviation, InvalidShapeError};
use crate::metropolis::StepInfo;

/// Number of recent accept decisions the acceptance rate is averaged over.
const ACCEPT_WINDOW: usize = 100;

/// Tracks a running search: step count, windowed acceptance rate and the best
/// deviation seen so far. Feed it the state and [`StepInfo`] after every step.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTracker {
    n: u64,
    p_accept: f32,
    best_deviation: u64,
    accept_queue: VecDeque<bool>,
}

/// Snapshot of a [`SearchTracker`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStats {
    /// Number of steps observed so far.
    pub n: u64,
    /// Fraction of accepted steps over a window of the most recent steps.
    pub p_accept: f32,
    /// Smallest deviation seen so far, including the initial state.
    pub best_deviation: u64,
}

impl SearchTracker {
    /// Creates a tracker primed with the deviation of `initial_state`.
    pub fn new(initial_state: &[u32]) -> Result<Self, InvalidShapeError> {
        Ok(Self {
            n: 0,
            p_accept: 0.0,
            best_deviation: deviation(initial_state)?,
            accept_queue: VecDeque::new(),
        })
    }

    /// Records one step: the state after the transition and the step outcome.
    pub fn step(&mut self, state: &[u32], info: &StepInfo) -> Result<(), InvalidShapeError> {
        let q = deviation(state)?;
        self.n += 1;
        self.best_deviation = self.best_deviation.min(q);

        self.accept_queue.push_back(info.accepted);
        if self.accept_queue.len() > ACCEPT_WINDOW {
            self.accept_queue.pop_front();
        }
        let n_accepted = self.accept_queue.iter().filter(|&&a| a).count();
        self.p_accept = n_accepted as f32 / self.accept_queue.len() as f32;
        Ok(())
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> SearchStats {
        SearchStats {
            n: self.n,
            p_accept: self.p_accept,
            best_deviation: self.best_deviation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accept() -> StepInfo {
        StepInfo {
            accept_prob: 1.0,
            accepted: true,
            magic_proposal: false,
        }
    }

    fn reject() -> StepInfo {
        StepInfo {
            accept_prob: 0.1,
            accepted: false,
            magic_proposal: false,
        }
    }

    #[test]
    fn starts_from_the_initial_deviation() {
        let identity: Vec<u32> = (1..=9).collect();
        let tracker = SearchTracker::new(&identity).unwrap();
        let stats = tracker.stats();
        assert_eq!(stats.n, 0);
        assert_eq!(stats.p_accept, 0.0);
        assert_eq!(stats.best_deviation, 24);
    }

    #[test]
    fn follows_the_best_deviation() {
        let identity: Vec<u32> = (1..=9).collect();
        let lo_shu = [8u32, 1, 6, 3, 5, 7, 4, 9, 2];
        let mut tracker = SearchTracker::new(&identity).unwrap();

        tracker.step(&identity, &reject()).unwrap();
        assert_eq!(tracker.stats().best_deviation, 24);

        tracker.step(&lo_shu, &accept()).unwrap();
        let stats = tracker.stats();
        assert_eq!(stats.n, 2);
        assert_eq!(stats.best_deviation, 0);
        assert_eq!(stats.p_accept, 0.5);

        // The best deviation never climbs back up.
        tracker.step(&identity, &accept()).unwrap();
        assert_eq!(tracker.stats().best_deviation, 0);
    }

    #[test]
    fn windows_the_acceptance_rate() {
        let identity: Vec<u32> = (1..=9).collect();
        let mut tracker = SearchTracker::new(&identity).unwrap();
        for _ in 0..50 {
            tracker.step(&identity, &accept()).unwrap();
        }
        for _ in 0..100 {
            tracker.step(&identity, &reject()).unwrap();
        }
        let stats = tracker.stats();
        assert_eq!(stats.n, 150);
        assert_eq!(
            stats.p_accept, 0.0,
            "Expected the window to forget early accepts"
        );
    }

    #[test]
    fn rejects_non_square_states() {
        let identity: Vec<u32> = (1..=9).collect();
        let mut tracker = SearchTracker::new(&identity).unwrap();
        assert_eq!(
            tracker.step(&[1, 2, 3], &accept()),
            Err(InvalidShapeError::NotSquare { len: 3 })
        );
        let empty: [u32; 0] = [];
        assert_eq!(
            SearchTracker::new(&empty).unwrap_err(),
            InvalidShapeError::Empty
        );
    }
}
