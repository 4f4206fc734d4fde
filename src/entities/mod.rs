//! Entities module - the engine's data model
//!
//! Keyframes and their store live in the frame-index domain; tracks live in
//! the millisecond time domain. The controller in `core` is the only place
//! the two meet (through `core::timecode`).

pub mod keyframe;
pub mod preview;
pub mod store;
pub mod track;

pub use keyframe::{ClickMark, Keyframe, RectMark};
pub use preview::PreviewBuffer;
pub use store::{AnnotationStore, PointKind};
pub use track::{FollowerTrack, Layer, MasterTrack};
