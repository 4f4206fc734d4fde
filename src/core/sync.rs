//! Drift-correction policy.
//!
//! While playing, independently decoded followers wander a few frames from
//! the master. The corrector measures follower-to-master divergence on a
//! fixed poll interval and repositions only when it crosses a threshold -
//! repositioning on every tick would cause visible judder. This is a
//! best-effort nudge; frame-exactness is only guaranteed at rest, where
//! every transition out of the playing state performs a threshold-free
//! exact snap instead.
//!
//! The corrector observes and corrects; it never originates position and
//! never reports errors during playback.

/// Tunable drift-correction constants. Policy, not invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// How often follower drift is checked while playing.
    pub poll_interval_ms: u64,
    /// Followers are repositioned only when their divergence from the
    /// master exceeds this.
    pub drift_threshold_ms: u64,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self { poll_interval_ms: 120, drift_threshold_ms: 35 }
    }
}

impl SyncPolicy {
    /// Should a follower at `follower_ms` be nudged back to a master at
    /// `master_ms`?
    pub fn needs_correction(&self, follower_ms: u64, master_ms: u64) -> bool {
        follower_ms.abs_diff(master_ms) > self.drift_threshold_ms
    }
}
