//! Chunk lifecycle - atomic state machine shared between the store,
//! generation workers and the upload path.
//!
//! ```text
//! Empty -> Queued -> Generating -> Ready -> Uploading -> Resident
//!   \                                                     /
//!    `---------------------> Evictable <-----------------'
//! ```
//!
//! Every transition is a single compare-exchange, so a state observed as
//! safe to evict cannot be claimed by a worker between check and removal.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of a chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkState {
    /// Created, not yet scheduled
    Empty = 0,
    /// Waiting for a generation worker
    Queued = 1,
    /// A worker is writing samples
    Generating = 2,
    /// Samples and mesh are done, upload pending
    Ready = 3,
    /// Mesh is being handed to the sink
    Uploading = 4,
    /// Fully loaded
    Resident = 5,
    /// Claimed for removal
    Evictable = 6,
}

impl ChunkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ChunkState::Empty,
            1 => ChunkState::Queued,
            2 => ChunkState::Generating,
            3 => ChunkState::Ready,
            4 => ChunkState::Uploading,
            5 => ChunkState::Resident,
            _ => ChunkState::Evictable,
        }
    }

    /// True once the sample grid holds generated data
    pub fn has_samples(self) -> bool {
        matches!(
            self,
            ChunkState::Ready | ChunkState::Uploading | ChunkState::Resident | ChunkState::Evictable
        )
    }

    /// No generation or upload is queued or running in this state
    pub fn is_safe_to_evict(self) -> bool {
        !matches!(
            self,
            ChunkState::Queued | ChunkState::Generating | ChunkState::Ready | ChunkState::Uploading
        )
    }
}

/// Atomic lifecycle cell
#[derive(Debug)]
pub struct ChunkLifecycle {
    state: AtomicU8,
}

impl ChunkLifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ChunkState::Empty as u8),
        }
    }

    /// Current state
    pub fn state(&self) -> ChunkState {
        ChunkState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn transition(&self, from: ChunkState, to: ChunkState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Empty -> Queued
    pub fn mark_queued(&self) -> bool {
        self.transition(ChunkState::Empty, ChunkState::Queued)
    }

    /// Queued -> Generating
    pub fn begin_generation(&self) -> bool {
        self.transition(ChunkState::Queued, ChunkState::Generating)
    }

    /// Generating -> Ready
    pub fn finish_generation(&self) -> bool {
        self.transition(ChunkState::Generating, ChunkState::Ready)
    }

    /// Ready -> Uploading
    pub fn begin_upload(&self) -> bool {
        self.transition(ChunkState::Ready, ChunkState::Uploading)
    }

    /// Uploading -> Resident
    pub fn finish_upload(&self) -> bool {
        self.transition(ChunkState::Uploading, ChunkState::Resident)
    }

    /// Claim for removal: the compare-exchange form of
    /// [`ChunkLifecycle::is_safe_to_evict`]. Fails for every in-flight state
    /// and for a chunk that is already claimed.
    pub fn mark_evictable(&self) -> bool {
        let current = self.state();
        if current == ChunkState::Evictable || !current.is_safe_to_evict() {
            return false;
        }
        self.transition(current, ChunkState::Evictable)
    }

    /// Waiting in the generation queue
    pub fn generation_queued(&self) -> bool {
        self.state() == ChunkState::Queued
    }

    /// A worker is filling the samples
    pub fn generation_in_progress(&self) -> bool {
        self.state() == ChunkState::Generating
    }

    /// Mesh produced but not yet fully handed to the sink
    pub fn upload_in_progress(&self) -> bool {
        matches!(self.state(), ChunkState::Ready | ChunkState::Uploading)
    }

    /// None of generation queued, generation in progress or upload in
    /// progress holds. A snapshot; [`ChunkLifecycle::mark_evictable`] claims.
    pub fn is_safe_to_evict(&self) -> bool {
        self.state().is_safe_to_evict()
    }
}

impl Default for ChunkLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a fresh lifecycle into `target` along the legal path
    fn advance_to(lifecycle: &ChunkLifecycle, target: ChunkState) {
        let steps: [(ChunkState, fn(&ChunkLifecycle) -> bool); 5] = [
            (ChunkState::Queued, ChunkLifecycle::mark_queued),
            (ChunkState::Generating, ChunkLifecycle::begin_generation),
            (ChunkState::Ready, ChunkLifecycle::finish_generation),
            (ChunkState::Uploading, ChunkLifecycle::begin_upload),
            (ChunkState::Resident, ChunkLifecycle::finish_upload),
        ];
        for (state, step) in steps {
            if lifecycle.state() == target {
                return;
            }
            assert!(step(lifecycle), "transition into {:?} failed", state);
        }
        assert_eq!(lifecycle.state(), target);
    }

    #[test]
    fn test_full_lifecycle() {
        let lc = ChunkLifecycle::new();
        assert_eq!(lc.state(), ChunkState::Empty);
        assert!(lc.mark_queued());
        assert!(lc.begin_generation());
        assert!(lc.finish_generation());
        assert!(lc.begin_upload());
        assert!(lc.finish_upload());
        assert_eq!(lc.state(), ChunkState::Resident);
        assert!(lc.mark_evictable());
        assert_eq!(lc.state(), ChunkState::Evictable);
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        let lc = ChunkLifecycle::new();
        assert!(!lc.begin_generation());
        assert!(!lc.finish_upload());
        assert!(lc.mark_queued());
        assert!(!lc.mark_queued());
        assert!(!lc.begin_upload());
        assert_eq!(lc.state(), ChunkState::Queued);
    }

    #[test]
    fn test_busy_states_not_evictable() {
        for state in [
            ChunkState::Queued,
            ChunkState::Generating,
            ChunkState::Ready,
            ChunkState::Uploading,
        ] {
            let lc = ChunkLifecycle::new();
            advance_to(&lc, state);
            assert!(!lc.is_safe_to_evict(), "{:?} must not be evictable", state);
            assert!(!lc.mark_evictable());
            assert_eq!(lc.state(), state);
        }
    }

    #[test]
    fn test_idle_states_evictable() {
        let empty = ChunkLifecycle::new();
        assert!(empty.is_safe_to_evict());
        assert!(empty.mark_evictable());

        let resident = ChunkLifecycle::new();
        advance_to(&resident, ChunkState::Resident);
        assert!(resident.is_safe_to_evict());
        assert!(resident.mark_evictable());
        // Already claimed
        assert!(!resident.mark_evictable());
    }

    #[test]
    fn test_claim_agrees_with_predicate() {
        let states = [
            ChunkState::Empty,
            ChunkState::Queued,
            ChunkState::Generating,
            ChunkState::Ready,
            ChunkState::Uploading,
            ChunkState::Resident,
        ];
        for state in states {
            let lc = ChunkLifecycle::new();
            advance_to(&lc, state);
            let flags_clear =
                !(lc.generation_queued() || lc.generation_in_progress() || lc.upload_in_progress());
            assert_eq!(lc.is_safe_to_evict(), flags_clear, "{:?}", state);
            assert_eq!(lc.mark_evictable(), flags_clear, "{:?}", state);
        }
    }

    #[test]
    fn test_flags() {
        let lc = ChunkLifecycle::new();
        advance_to(&lc, ChunkState::Queued);
        assert!(lc.generation_queued());
        lc.begin_generation();
        assert!(lc.generation_in_progress());
        assert!(!lc.generation_queued());
        lc.finish_generation();
        assert!(lc.upload_in_progress());
        assert!(lc.state().has_samples());
    }
}
