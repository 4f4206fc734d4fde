//! Playback session state.
//!
//! **Architecture**: `Session` holds only state the controller reads and
//! mutates - it does not own tracks or media (those live in
//! `core::engine`, mirroring how the engine is the single owner of its
//! transports). `ViewState` is the snapshot the host/GUI renders from;
//! the controller refreshes it synchronously on every decode
//! notification, seek and snap.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use image::RgbaImage;

use super::timecode::Fps;
use crate::entities::Keyframe;
use crate::entities::keyframe::DEFAULT_OBJECT_ID;

/// Which base layer is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    Original,
    Infilled,
}

/// Session-wide playback/annotation state.
#[derive(Debug, Clone)]
pub struct Session {
    pub mode: ViewMode,
    pub mask_visible: bool,
    /// Mask overlay opacity in [0,1].
    pub mask_opacity: f32,
    /// Object id applied to newly added annotations (>= 1).
    pub current_object_id: u32,
    /// Resolved once per loaded master; `None` until a master is loaded.
    /// Frame-indexed operations refuse to run while unresolved.
    pub fps: Option<Fps>,
    /// Frame index of the most recently displayed master frame.
    pub last_frame_idx: u32,
    /// True while the user drags the position control. Suppresses
    /// decode-driven refresh of the position indicator, not the underlying
    /// seeks or overlay lookups.
    pub seek_in_progress: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            mode: ViewMode::Original,
            mask_visible: false,
            mask_opacity: 0.4,
            current_object_id: DEFAULT_OBJECT_ID,
            fps: None,
            last_frame_idx: 0,
            seek_in_progress: false,
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-master state when a new video replaces the master.
    /// Mode, mask settings and the current object id survive the reload.
    pub fn reset_for_master(&mut self, fps: Fps) {
        self.fps = Some(fps);
        self.last_frame_idx = 0;
        self.seek_in_progress = false;
    }
}

/// Snapshot of everything the host renders for the current frame.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// Position indicator value in ms. Not updated from decode
    /// notifications while the user is scrubbing.
    pub slider_ms: u64,
    /// "mm:ss / mm:ss" transport label.
    pub time_label: String,
    pub duration_ms: u64,
    /// Frame index the overlay and previews were resolved for.
    pub frame_idx: u32,
    /// Annotation record to overlay, if the frame has one.
    pub keyframe: Option<Keyframe>,
    /// Infilled-base preview frame, present only in infilled mode and
    /// inside the buffer's range.
    pub infill_frame: Option<Arc<RgbaImage>>,
    /// Mask preview frame, present only while the mask is visible and
    /// inside the buffer's range.
    pub mask_frame: Option<Arc<RgbaImage>>,
    pub mask_opacity: f32,
}
