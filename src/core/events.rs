//! Engine input events.
//!
//! The engine is a single-threaded cooperative loop: it reacts to decode
//! notifications from the master's media backend and to the periodic sync
//! timer, both delivered through one explicit channel. No two engine
//! operations run concurrently; the backends' internal decode threads are
//! visible here only as `FrameDecoded` messages.
//!
//! Ordering: `FrameDecoded` timestamps are non-decreasing except right
//! after a seek, where a late or skipped notification is tolerated - the
//! engine always trusts the latest message and never accumulates a
//! pending-seek queue.

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Asynchronous inputs delivered to the engine loop.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// The master backend decoded a frame; `ts_ms` is the exact timestamp
    /// carried by that frame. Ground truth for the timeline position.
    FrameDecoded { ts_ms: u64 },
    /// The master source finished loading (poster frame trigger).
    MasterLoaded,
    /// Periodic drift-correction timer tick.
    SyncTick,
}

/// Create the engine's event channel.
///
/// The `Sender` side is cloned into media backends (decode callbacks) and
/// the host's timer; the engine owns the `Receiver` and drains it with
/// `PlayerEngine::pump`.
pub fn engine_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    unbounded()
}
