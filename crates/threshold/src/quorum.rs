// Path: crates/threshold/src/quorum.rs
//! Accept/fail bookkeeping shared by every round.
//!
//! Each roster index is counted once, by its first response. A round is lost
//! as soon as more than `n - threshold` participants failed, since the rest
//! can no longer reach the threshold.

use cohort_types::error::ProtocolError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Pending,
    Reached,
    Lost,
}

#[derive(Debug, Clone)]
pub struct Quorum {
    n: usize,
    threshold: usize,
    accepted: BTreeSet<u32>,
    failed: BTreeSet<u32>,
}

impl Quorum {
    pub fn new(n: usize, threshold: usize) -> Self {
        Self {
            n,
            threshold,
            accepted: BTreeSet::new(),
            failed: BTreeSet::new(),
        }
    }

    fn seen(&self, index: u32) -> bool {
        self.accepted.contains(&index) || self.failed.contains(&index)
    }

    /// Records an accepted response. Returns `false` for a repeat.
    pub fn accept(&mut self, index: u32) -> bool {
        !self.seen(index) && self.accepted.insert(index)
    }

    /// Records a failed or refused participant. Returns `false` for a repeat.
    pub fn fail(&mut self, index: u32) -> bool {
        !self.seen(index) && self.failed.insert(index)
    }

    pub fn has_responded(&self, index: u32) -> bool {
        self.seen(index)
    }

    pub fn accepted(&self) -> usize {
        self.accepted.len()
    }

    pub fn failures(&self) -> usize {
        self.failed.len()
    }

    /// Indices that accepted, ascending.
    pub fn acceptors(&self) -> impl Iterator<Item = u32> + '_ {
        self.accepted.iter().copied()
    }

    /// Lost, reached at `threshold` acceptances, or still pending.
    pub fn progress(&self) -> Progress {
        if self.failed.len() > self.n.saturating_sub(self.threshold) {
            Progress::Lost
        } else if self.accepted.len() >= self.threshold {
            Progress::Reached
        } else {
            Progress::Pending
        }
    }

    /// Like `progress`, but only reached once every participant responded.
    pub fn progress_all(&self) -> Progress {
        match self.progress() {
            Progress::Lost => Progress::Lost,
            _ if self.accepted.len() + self.failed.len() >= self.n => Progress::Reached,
            _ => Progress::Pending,
        }
    }

    pub fn insufficient(&self) -> ProtocolError {
        ProtocolError::InsufficientQuorum {
            accepted: self.accepted.len(),
            failures: self.failed.len(),
            threshold: self.threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reached_at_threshold() {
        let mut q = Quorum::new(4, 3);
        assert!(q.accept(0));
        assert!(q.accept(1));
        assert_eq!(q.progress(), Progress::Pending);
        assert!(q.accept(3));
        assert_eq!(q.progress(), Progress::Reached);
    }

    #[test]
    fn test_lost_once_failures_exceed_slack() {
        let mut q = Quorum::new(4, 3);
        q.accept(0);
        q.fail(2);
        assert_eq!(q.progress(), Progress::Pending);
        q.fail(3);
        assert_eq!(q.progress(), Progress::Lost);
        assert!(matches!(
            q.insufficient(),
            ProtocolError::InsufficientQuorum {
                accepted: 1,
                failures: 2,
                threshold: 3
            }
        ));
    }

    #[test]
    fn test_first_response_counts() {
        let mut q = Quorum::new(4, 3);
        assert!(q.fail(1));
        assert!(!q.accept(1));
        assert!(!q.fail(1));
        assert_eq!((q.accepted(), q.failures()), (0, 1));
    }

    #[test]
    fn test_progress_all_waits_for_everyone() {
        let mut q = Quorum::new(4, 3);
        for i in 0..3 {
            q.accept(i);
        }
        assert_eq!(q.progress(), Progress::Reached);
        assert_eq!(q.progress_all(), Progress::Pending);
        q.fail(3);
        assert_eq!(q.progress_all(), Progress::Reached);
    }
}
