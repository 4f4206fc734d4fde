//! VANISH - Multi-track review player and annotation engine
//!
//! Keeps one authoritative master video track and dependent visual layers
//! (file-backed followers or in-memory preview buffers) aligned to the same
//! timeline, and resolves the annotation state to overlay on every
//! displayed frame. The GUI toolkit, video decoding and the
//! segmentation/inpainting models live behind collaborator traits.

// Core engine (controller, sync, session, events, timecode)
pub mod core;

// Data model (keyframes, annotation store, preview buffers, tracks)
pub mod entities;

// Collaborator contracts and persistence
pub mod cli;
pub mod media;
pub mod persist;
pub mod services;

// Re-export commonly used types from core
pub use crate::core::engine::{EngineError, PlayerEngine, TransportState};
pub use crate::core::events::{EngineEvent, engine_channel};
pub use crate::core::session::{Session, ViewMode, ViewState};
pub use crate::core::sync::SyncPolicy;
pub use crate::core::timecode::{Fps, fmt_ms, frame_to_ms, ms_to_frame};

// Re-export entities
pub use entities::{AnnotationStore, ClickMark, Keyframe, Layer, PointKind, PreviewBuffer, RectMark};

// Re-export persistence record
pub use persist::AnnotationFile;
