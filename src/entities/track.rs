//! Master and follower tracks.
//!
//! The master is the authoritative audio/video source driving the
//! timeline; followers are dependent visual layers kept aligned to it.
//! Master position ground truth is the timestamp of its most recently
//! decoded frame - decode callbacks are the only position source immune to
//! transport-layer rounding and latency. The transport-reported position
//! is a fallback used only before the first decode notification arrives.

use crate::media::MediaTransport;

/// Overlay layer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Infilled base layer (replaces the original base in infilled mode)
    Infill,
    /// Segmentation mask overlay
    Mask,
}

impl Layer {
    pub fn name(self) -> &'static str {
        match self {
            Layer::Infill => "infill",
            Layer::Mask => "mask",
        }
    }
}

/// The authoritative track. Created once per loaded video; replaced
/// wholesale when a new video is loaded (which resets the resolved fps,
/// the poster-frame flag and the current-frame annotation binding).
pub struct MasterTrack {
    transport: Box<dyn MediaTransport>,
    last_decoded_ms: Option<u64>,
    poster_shown: bool,
}

impl MasterTrack {
    pub fn new(transport: Box<dyn MediaTransport>) -> Self {
        Self { transport, last_decoded_ms: None, poster_shown: false }
    }

    /// Authoritative timeline position in milliseconds.
    pub fn position(&self) -> u64 {
        self.last_decoded_ms.unwrap_or_else(|| self.transport.position())
    }

    /// Record a decode notification (or a just-issued seek, which is
    /// trusted immediately so a late out-of-order decode can't rewind the
    /// timeline state).
    pub fn note_position(&mut self, ts_ms: u64) {
        self.last_decoded_ms = Some(ts_ms);
    }

    pub fn duration(&self) -> u64 {
        self.transport.duration()
    }

    /// Poster frame shown yet? Runs exactly once per loaded master.
    pub fn poster_shown(&self) -> bool {
        self.poster_shown
    }

    pub fn mark_poster_shown(&mut self) {
        self.poster_shown = true;
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn set_position(&mut self, ms: u64) {
        self.transport.set_position(ms);
    }
}

impl std::fmt::Debug for MasterTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterTrack")
            .field("last_decoded_ms", &self.last_decoded_ms)
            .field("poster_shown", &self.poster_shown)
            .finish()
    }
}

/// A file-backed dependent layer. Its position is advisory - the drift
/// corrector measures it against the master and nudges it back.
pub struct FollowerTrack {
    transport: Box<dyn MediaTransport>,
    visible: bool,
}

impl FollowerTrack {
    pub fn new(transport: Box<dyn MediaTransport>) -> Self {
        Self { transport, visible: false }
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn position(&self) -> u64 {
        self.transport.position()
    }

    pub fn play(&mut self) {
        self.transport.play();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
    }

    pub fn set_position(&mut self, ms: u64) {
        self.transport.set_position(ms);
    }
}

impl std::fmt::Debug for FollowerTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowerTrack").field("visible", &self.visible).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testing::FakeTransport;

    #[test]
    fn test_master_position_prefers_decoded_timestamp() {
        let (transport, handle) = FakeTransport::new(30.0, 10_000);
        let mut master = MasterTrack::new(Box::new(transport));

        // before any decode callback: transport position is the fallback
        handle.drift_to(250);
        assert_eq!(master.position(), 250);

        // after a decode callback the decoded timestamp wins, even when the
        // polled transport position disagrees
        master.note_position(400);
        handle.drift_to(431);
        assert_eq!(master.position(), 400);
    }

    #[test]
    fn test_poster_flag_once() {
        let (transport, _) = FakeTransport::new(30.0, 10_000);
        let mut master = MasterTrack::new(Box::new(transport));
        assert!(!master.poster_shown());
        master.mark_poster_shown();
        assert!(master.poster_shown());
    }
}
