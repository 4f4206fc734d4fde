//! Track controller: multi-track transport state machine.
//!
//! **Architecture**: The engine owns the master track, both follower
//! layers and the annotation store, and is driven from a single loop -
//! host calls and the event channel (`pump`) mutate it from one thread.
//! The master's decode pipeline is the sole source of ground-truth
//! position; the controller converts it into a frame index and resolves
//! what every displayed frame overlays. The drift corrector observes and
//! corrects, it never originates position.
//!
//! # Transport Model
//!
//! `Stopped` -> `Playing` -> `Paused` -> ... While playing, file-backed
//! followers stream on their own decoders and get nudged by `SyncTick`
//! handling; on every transition out of `Playing` (and on every seek while
//! not playing) an exact, threshold-free snap re-aligns them. Layers backed
//! by a preview buffer never stream - they are re-evaluated per displayed
//! frame.
//!
//! # Supersession
//!
//! A new `seek`/`set_mode` while a previous one is settling simply wins:
//! repositioning is idempotent with respect to final state, so there is no
//! queue of pending seeks.

use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;
use log::{debug, info, trace, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::events::{EngineEvent, engine_channel};
use super::session::{Session, ViewMode, ViewState};
use super::sync::SyncPolicy;
use super::timecode::{Fps, TimecodeError, fmt_ms, ms_to_frame};
use crate::entities::preview::PreviewBuffer;
use crate::entities::store::{AnnotationStore, PointKind};
use crate::entities::track::{FollowerTrack, Layer, MasterTrack};
use crate::media::{MediaError, TransportFactory};
use crate::persist::AnnotationFile;

/// Playback state of the whole track group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Paused,
    Playing,
}

/// Engine operation errors
#[derive(Debug)]
pub enum EngineError {
    /// No master video loaded; frame-indexed operations refuse to run.
    NoMaster,
    /// Master metadata did not yield a usable frame rate (fatal at load).
    FrameRate(TimecodeError),
    /// Infilled mode requested with neither an infilled file nor a preview.
    NoInfillSource,
    /// A media source failed to open or write.
    Media(MediaError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NoMaster => write!(f, "no master video loaded"),
            EngineError::FrameRate(e) => write!(f, "{}", e),
            EngineError::NoInfillSource => {
                write!(f, "no infilled video or preview loaded")
            }
            EngineError::Media(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<TimecodeError> for EngineError {
    fn from(e: TimecodeError) -> Self {
        EngineError::FrameRate(e)
    }
}

impl From<MediaError> for EngineError {
    fn from(e: MediaError) -> Self {
        EngineError::Media(e)
    }
}

/// One overlay layer's sources: at most one of the pair is active at a
/// time - a non-empty preview buffer suppresses the file-backed follower.
#[derive(Debug, Default)]
struct FollowerSlot {
    file: Option<FollowerTrack>,
    preview: PreviewBuffer,
}

/// The playback engine exposed to the GUI/host layer.
pub struct PlayerEngine {
    factory: Box<dyn TransportFactory>,
    policy: SyncPolicy,
    state: TransportState,
    master: Option<MasterTrack>,
    master_path: Option<PathBuf>,
    infill: FollowerSlot,
    mask: FollowerSlot,
    session: Session,
    store: AnnotationStore,
    view: ViewState,
    /// Mirrors the resync timer being started/stopped: ticks are ignored
    /// unless armed by `play()`.
    resync_armed: bool,
    tx: Sender<EngineEvent>,
    rx: Receiver<EngineEvent>,
}

impl PlayerEngine {
    pub fn new(factory: Box<dyn TransportFactory>) -> Self {
        Self::with_policy(factory, SyncPolicy::default())
    }

    pub fn with_policy(factory: Box<dyn TransportFactory>, policy: SyncPolicy) -> Self {
        let (tx, rx) = engine_channel();
        Self {
            factory,
            policy,
            state: TransportState::Stopped,
            master: None,
            master_path: None,
            infill: FollowerSlot::default(),
            mask: FollowerSlot::default(),
            session: Session::new(),
            store: AnnotationStore::new(),
            view: ViewState::default(),
            resync_armed: false,
            tx,
            rx,
        }
    }

    // === Event loop ===

    /// Sender half of the engine channel, for decode callbacks and the
    /// host's sync timer.
    pub fn sender(&self) -> Sender<EngineEvent> {
        self.tx.clone()
    }

    /// Drain all pending events without blocking. Call from the host loop.
    pub fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle(event);
        }
    }

    pub fn handle(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::FrameDecoded { ts_ms } => self.on_frame_decoded(ts_ms),
            EngineEvent::MasterLoaded => self.on_master_loaded(),
            EngineEvent::SyncTick => self.on_sync_tick(),
        }
    }

    // === Accessors ===

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn mode(&self) -> ViewMode {
        self.session.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn policy(&self) -> SyncPolicy {
        self.policy
    }

    /// Authoritative master position, if a master is loaded.
    pub fn master_position(&self) -> Option<u64> {
        self.master.as_ref().map(|m| m.position())
    }

    /// Position of the layer's file-backed follower, if one is loaded.
    pub fn follower_position(&self, layer: Layer) -> Option<u64> {
        self.slot(layer).file.as_ref().map(|f| f.position())
    }

    // === Loading ===

    /// Open a new master video. Replaces the previous master and resets
    /// dependent state. A failed open or an unusable frame rate leaves the
    /// existing session untouched.
    pub fn load_master(&mut self, path: &Path) -> Result<(), EngineError> {
        let transport = self.factory.open(path)?;
        let fps = Fps::new(transport.metadata().fps)?;
        info!("master loaded: {} ({})", path.display(), fps);

        self.master = Some(MasterTrack::new(transport));
        self.master_path = Some(path.to_path_buf());
        self.session.reset_for_master(fps);
        self.state = TransportState::Stopped;
        self.resync_armed = false;
        self.refresh_view(0, false);
        Ok(())
    }

    /// Open a file-backed follower for a layer. Clears any preview buffer
    /// substituting for that layer.
    pub fn load_follower(&mut self, layer: Layer, path: &Path) -> Result<(), EngineError> {
        let transport = self.factory.open(path)?;
        info!("{} follower loaded: {}", layer.name(), path.display());

        let slot = self.slot_mut(layer);
        slot.preview.clear();
        slot.file = Some(FollowerTrack::new(transport));

        let cur = self.master_ms();
        self.exact_snap(cur);
        Ok(())
    }

    // === Preview buffers ===

    /// Install an in-memory preview for a layer. A non-empty preview
    /// suppresses the layer's file-backed follower until cleared; empty
    /// `frames` is equivalent to `clear_preview`.
    pub fn set_preview(&mut self, layer: Layer, frames: Vec<Arc<RgbaImage>>, start_frame: u32) {
        if frames.is_empty() {
            self.clear_preview(layer);
            return;
        }
        let slot = self.slot_mut(layer);
        slot.preview.set(frames, start_frame);
        if let Some(f) = slot.file.as_mut() {
            f.pause();
        }
        let cur = self.master_ms();
        self.refresh_view(cur, false);
    }

    /// Drop the layer's preview and restore file-backed behavior.
    pub fn clear_preview(&mut self, layer: Layer) {
        self.slot_mut(layer).preview.clear();

        let cur = self.master_ms();
        let playing = self.state == TransportState::Playing;
        let active = self.layer_file_active(layer);
        if let Some(f) = self.slot_mut(layer).file.as_mut() {
            if active {
                f.set_position(cur);
                if playing {
                    f.play();
                }
            }
        }
        self.refresh_view(cur, false);
    }

    // === Transport ===

    /// Start playback of the master and every active file-backed follower,
    /// aligned to the last known master frame. Arms drift correction.
    pub fn play(&mut self) {
        if self.master.is_none() {
            debug!("play ignored: no master loaded");
            return;
        }
        let cur = self.master_ms();
        if let Some(m) = self.master.as_mut() {
            m.set_position(cur);
            m.play();
        }

        let infill_active = self.layer_file_active(Layer::Infill);
        if let Some(f) = self.infill.file.as_mut() {
            if infill_active {
                f.set_position(cur);
                f.play();
            } else {
                f.pause();
            }
        }
        let mask_active = self.layer_file_active(Layer::Mask);
        if let Some(f) = self.mask.file.as_mut() {
            if mask_active {
                f.set_position(cur);
                f.play();
            } else {
                f.pause();
            }
        }

        self.state = TransportState::Playing;
        self.resync_armed = true;
        trace!("playing from {}", fmt_ms(cur));
    }

    /// Pause everything and snap followers to the exact master frame.
    pub fn pause(&mut self) {
        if self.master.is_none() {
            return;
        }
        self.resync_armed = false;
        if let Some(m) = self.master.as_mut() {
            m.pause();
        }
        if let Some(f) = self.infill.file.as_mut() {
            f.pause();
        }
        if let Some(f) = self.mask.file.as_mut() {
            f.pause();
        }
        self.state = TransportState::Paused;
        let cur = self.master_ms();
        self.exact_snap(cur);
        trace!("paused at {}", fmt_ms(cur));
    }

    /// Stop everything and reset the timeline to frame 0.
    pub fn stop(&mut self) {
        if self.master.is_none() {
            return;
        }
        self.resync_armed = false;
        if let Some(m) = self.master.as_mut() {
            m.stop();
        }
        if let Some(f) = self.infill.file.as_mut() {
            f.stop();
        }
        if let Some(f) = self.mask.file.as_mut() {
            f.stop();
        }
        self.state = TransportState::Stopped;
        self.seek(0);
        trace!("stopped");
    }

    pub fn toggle_play(&mut self) {
        if self.is_playing() { self.pause() } else { self.play() }
    }

    /// Jump to a position. Master and all active non-preview followers are
    /// repositioned immediately and UI-facing state refreshes
    /// synchronously, regardless of play state; when not playing an
    /// additional exact snap covers backends that only repaint on an
    /// explicit position set.
    pub fn seek(&mut self, pos_ms: u64) {
        if self.master.is_none() {
            return;
        }
        if let Some(m) = self.master.as_mut() {
            m.set_position(pos_ms);
            // trust the seek immediately; a late decode notification from
            // before the seek must not rewind the timeline state
            m.note_position(pos_ms);
        }
        if self.layer_file_active(Layer::Infill) {
            if let Some(f) = self.infill.file.as_mut() {
                f.set_position(pos_ms);
            }
        }
        if self.layer_file_active(Layer::Mask) {
            if let Some(f) = self.mask.file.as_mut() {
                f.set_position(pos_ms);
            }
        }

        if let Some(fps) = self.session.fps {
            self.session.last_frame_idx = ms_to_frame(pos_ms, fps);
        }
        self.refresh_view(pos_ms, false);

        if self.state != TransportState::Playing {
            self.exact_snap(pos_ms);
        }
    }

    // === Scrubbing ===

    /// The user grabbed the position control: decode-driven refresh of the
    /// position indicator is suppressed until `end_scrub`.
    pub fn begin_scrub(&mut self) {
        self.session.seek_in_progress = true;
    }

    /// The user released the position control at `pos_ms`.
    pub fn end_scrub(&mut self, pos_ms: u64) {
        self.session.seek_in_progress = false;
        self.seek(pos_ms);
    }

    // === Mode and mask ===

    /// Switch the visible base layer. Rejected when infilled mode is
    /// requested with neither an infilled file nor a non-empty preview;
    /// the mode stays `Original` in that case.
    pub fn set_mode(&mut self, mode: ViewMode) -> Result<(), EngineError> {
        if mode == self.session.mode {
            return Ok(());
        }
        if mode == ViewMode::Infilled
            && self.infill.preview.is_empty()
            && self.infill.file.is_none()
        {
            warn!("infilled mode rejected: no infilled source loaded");
            return Err(EngineError::NoInfillSource);
        }

        let was_playing = self.state == TransportState::Playing;
        if was_playing {
            self.pause();
        }
        self.session.mode = mode;
        info!("view mode -> {:?}", mode);
        if was_playing {
            self.play();
        } else {
            let cur = self.master_ms();
            self.exact_snap(cur);
        }
        Ok(())
    }

    /// Toggle the mask overlay. With a mask preview installed, the preview
    /// layer is what toggles; the file-backed mask follower stays hidden
    /// and paused for as long as the preview is active.
    pub fn set_mask_visible(&mut self, visible: bool) {
        self.session.mask_visible = visible;
        let preview_active = !self.mask.preview.is_empty();
        let playing = self.state == TransportState::Playing;
        let cur = self.master_ms();

        if let Some(f) = self.mask.file.as_mut() {
            if preview_active || !visible {
                f.pause();
            } else if playing {
                // roughly align, then let it stream; drift correction
                // takes over from here
                f.set_position(cur);
                f.play();
            } else {
                f.pause();
                f.set_position(cur);
            }
        }
        self.refresh_view(cur, false);
    }

    pub fn set_mask_opacity(&mut self, value: f32) {
        self.session.mask_opacity = value.clamp(0.0, 1.0);
        let cur = self.master_ms();
        self.refresh_view(cur, false);
    }

    // === Annotations ===

    pub fn set_current_object(&mut self, object_id: u32) {
        self.session.current_object_id = object_id.max(1);
    }

    /// Add a click at the session's current frame index, labeled with the
    /// current object id.
    pub fn add_point(&mut self, kind: PointKind, x: f64, y: f64) -> Result<(), EngineError> {
        self.require_fps()?;
        let idx = self.session.last_frame_idx;
        let obj = self.session.current_object_id;
        self.store.add_point(idx, kind, x, y, obj);
        self.refresh_current();
        Ok(())
    }

    /// Add a rectangle at the session's current frame index.
    pub fn add_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), EngineError> {
        self.require_fps()?;
        let idx = self.session.last_frame_idx;
        let obj = self.session.current_object_id;
        self.store.add_rect(idx, x, y, w, h, obj);
        self.refresh_current();
        Ok(())
    }

    /// Delete the annotation nearest to the click, if any is within reach.
    /// `display_w`/`display_h` are the current video rectangle dimensions.
    pub fn delete_at(
        &mut self,
        x: f64,
        y: f64,
        display_w: f64,
        display_h: f64,
    ) -> Result<bool, EngineError> {
        self.require_fps()?;
        let idx = self.session.last_frame_idx;
        let removed = self.store.delete_nearest(idx, x, y, display_w, display_h);
        self.refresh_current();
        Ok(removed)
    }

    /// Structured annotation record for persistence, keyframes in
    /// ascending frame order.
    pub fn export_annotations(&self) -> AnnotationFile {
        AnnotationFile {
            video: self.master_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
            keyframes: self.store.all_sorted().cloned().collect(),
        }
    }

    /// Replace the whole store with an imported record.
    pub fn import_annotations(&mut self, record: AnnotationFile) {
        self.store = AnnotationStore::from_keyframes(record.keyframes);
        info!("annotations imported: {} keyframes", self.store.len());
        self.refresh_current();
    }

    // === Event handlers ===

    /// Master decoded a frame: its timestamp is ground truth for the
    /// timeline, the overlay lookup and the preview lookups. While the
    /// user scrubs, the position indicator is left alone.
    fn on_frame_decoded(&mut self, ts_ms: u64) {
        let Some(master) = self.master.as_mut() else {
            trace!("decode notification with no master, dropped");
            return;
        };
        master.note_position(ts_ms);
        if let Some(fps) = self.session.fps {
            self.session.last_frame_idx = ms_to_frame(ts_ms, fps);
        }
        self.refresh_view(ts_ms, true);
    }

    /// Poster frame: once per loaded master, show frame 0 without
    /// entering playback.
    fn on_master_loaded(&mut self) {
        let playing = self.state == TransportState::Playing;
        let Some(master) = self.master.as_mut() else {
            return;
        };
        if master.poster_shown() {
            return;
        }
        master.mark_poster_shown();
        if playing {
            return;
        }
        master.set_position(0);
        master.note_position(0);
        self.session.last_frame_idx = 0;
        self.exact_snap(0);
        debug!("poster frame shown");
    }

    /// Periodic drift check. Only nudges; exactness comes from snaps.
    fn on_sync_tick(&mut self) {
        if !self.resync_armed || self.state != TransportState::Playing {
            return;
        }
        let Some(master_ms) = self.master.as_ref().map(|m| m.position()) else {
            return;
        };
        let policy = self.policy;

        if self.layer_file_active(Layer::Infill) {
            if let Some(f) = self.infill.file.as_mut() {
                if policy.needs_correction(f.position(), master_ms) {
                    trace!("infill drift {} ms, nudging", f.position().abs_diff(master_ms));
                    f.set_position(master_ms);
                }
            }
        }
        if self.layer_file_active(Layer::Mask) {
            if let Some(f) = self.mask.file.as_mut() {
                if policy.needs_correction(f.position(), master_ms) {
                    trace!("mask drift {} ms, nudging", f.position().abs_diff(master_ms));
                    f.set_position(master_ms);
                }
            }
        }
    }

    // === Internals ===

    fn slot(&self, layer: Layer) -> &FollowerSlot {
        match layer {
            Layer::Infill => &self.infill,
            Layer::Mask => &self.mask,
        }
    }

    fn slot_mut(&mut self, layer: Layer) -> &mut FollowerSlot {
        match layer {
            Layer::Infill => &mut self.infill,
            Layer::Mask => &mut self.mask,
        }
    }

    /// Is the layer's file-backed follower the active source? Requires a
    /// loaded file, no preview substituting, and the layer being shown
    /// (mode-eligible for the base, visibility for the mask).
    fn layer_file_active(&self, layer: Layer) -> bool {
        let slot = self.slot(layer);
        if slot.file.is_none() || !slot.preview.is_empty() {
            return false;
        }
        match layer {
            Layer::Infill => self.session.mode == ViewMode::Infilled,
            Layer::Mask => self.session.mask_visible,
        }
    }

    fn master_ms(&self) -> u64 {
        self.master.as_ref().map(|m| m.position()).unwrap_or(0)
    }

    fn require_fps(&self) -> Result<Fps, EngineError> {
        self.session.fps.ok_or(EngineError::NoMaster)
    }

    /// Threshold-free re-alignment of every active non-preview follower to
    /// the authoritative master position.
    fn exact_snap(&mut self, ms: u64) {
        if self.layer_file_active(Layer::Infill) {
            if let Some(f) = self.infill.file.as_mut() {
                f.set_position(ms);
            }
        }
        if self.layer_file_active(Layer::Mask) {
            if let Some(f) = self.mask.file.as_mut() {
                f.set_position(ms);
            }
        }
        self.refresh_view(ms, false);
    }

    fn refresh_current(&mut self) {
        let ms = self.master_ms();
        self.refresh_view(ms, false);
    }

    /// Rebuild the host-facing snapshot for position `ms`. Decode-driven
    /// refreshes leave the position indicator alone while the user scrubs;
    /// overlay and preview lookups always run.
    fn refresh_view(&mut self, ms: u64, decode_driven: bool) {
        let infill_active = self.layer_file_active(Layer::Infill);
        if let Some(f) = self.infill.file.as_mut() {
            f.set_visible(infill_active);
        }
        let mask_active = self.layer_file_active(Layer::Mask);
        if let Some(f) = self.mask.file.as_mut() {
            f.set_visible(mask_active);
        }

        let duration = self.master.as_ref().map(|m| m.duration()).unwrap_or(0);
        if !(decode_driven && self.session.seek_in_progress) {
            self.view.slider_ms = ms;
            self.view.time_label = format!("{} / {}", fmt_ms(ms), fmt_ms(duration));
        }
        self.view.duration_ms = duration;
        self.view.mask_opacity = self.session.mask_opacity;

        if let Some(fps) = self.session.fps {
            let idx = ms_to_frame(ms, fps);
            self.view.frame_idx = idx;
            self.view.keyframe = self.store.get(idx).cloned();
            self.view.infill_frame = if self.session.mode == ViewMode::Infilled {
                self.infill.preview.frame_for(idx)
            } else {
                None
            };
            self.view.mask_frame = if self.session.mask_visible {
                self.mask.preview.frame_for(idx)
            } else {
                None
            };
        }
    }
}

impl fmt::Debug for PlayerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerEngine")
            .field("state", &self.state)
            .field("mode", &self.session.mode)
            .field("master_path", &self.master_path)
            .field("keyframes", &self.store.len())
            .finish()
    }
}
