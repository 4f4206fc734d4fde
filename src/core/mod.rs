//! Core engine modules - controller, drift correction, session, events
//!
//! These modules form the playback engine, independent of UI.

pub mod engine;
pub mod events;
pub mod session;
pub mod sync;
pub mod timecode;

// Re-exports for convenience
pub use engine::{EngineError, PlayerEngine, TransportState};
pub use events::{EngineEvent, engine_channel};
pub use session::{Session, ViewMode, ViewState};
pub use sync::SyncPolicy;
pub use timecode::Fps;
