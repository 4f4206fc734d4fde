//! Decoder/encoder collaborator contracts.
//!
//! **Why**: The engine never decodes or encodes pixels itself. A host wires
//! in a backend (FFmpeg, GStreamer, a test fake) through these traits; the
//! backend may run its own decode threads, but its only visible effect on
//! the engine is the `FrameDecoded` notification it posts to the engine
//! channel.
//!
//! **Used by**: engine (`load_master`/`load_follower` via the factory),
//! export paths (`VideoSink`).

use image::RgbaImage;
use std::fmt;
use std::path::Path;

use crate::core::timecode::Fps;

/// Stream metadata reported by a transport after open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMetadata {
    pub frame_count: usize,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Media backend errors
#[derive(Debug, Clone)]
pub enum MediaError {
    /// Source failed to open (missing file, unsupported container, ...)
    Open(String),
    /// Source opened but carries no video stream
    NoVideoStream(String),
    /// Encoder failed to produce the output file
    Write(String),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::Open(e) => write!(f, "failed to open media: {}", e),
            MediaError::NoVideoStream(e) => write!(f, "no video stream: {}", e),
            MediaError::Write(e) => write!(f, "failed to write video: {}", e),
        }
    }
}

impl std::error::Error for MediaError {}

/// Playback transport for one opened media source.
///
/// Positions are non-negative milliseconds. `set_position` must be
/// idempotent with respect to final state: issuing a new reposition while a
/// previous one is still settling supersedes it.
pub trait MediaTransport {
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_position(&mut self, ms: u64);
    fn position(&self) -> u64;
    fn duration(&self) -> u64;
    /// Stream metadata read at open. `fps` is the raw reported rate
    /// (`0.0` when unknown); the engine validates it through `Fps::new`
    /// and refuses frame-indexed operations when it is not positive.
    fn metadata(&self) -> VideoMetadata;
}

/// Opens media sources. Injected into the engine so tests can substitute
/// fakes; there is no process-wide backend state.
pub trait TransportFactory {
    fn open(&self, path: &Path) -> Result<Box<dyn MediaTransport>, MediaError>;
}

/// Encoder contract: write raster frames as a playable file.
pub trait VideoSink {
    fn write(&self, path: &Path, frames: &[RgbaImage], fps: Fps) -> Result<(), MediaError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        writes: Mutex<Vec<(PathBuf, usize, f64)>>,
    }

    impl VideoSink for RecordingSink {
        fn write(&self, path: &Path, frames: &[RgbaImage], fps: Fps) -> Result<(), MediaError> {
            if frames.is_empty() {
                return Err(MediaError::Write("no frames to encode".into()));
            }
            self.writes.lock().unwrap().push((path.to_path_buf(), frames.len(), fps.get()));
            Ok(())
        }
    }

    #[test]
    fn test_video_sink_contract() {
        let sink = RecordingSink::default();
        let fps = Fps::new(30.0).unwrap();

        assert!(sink.write(Path::new("out.mkv"), &[], fps).is_err());

        let frames = vec![RgbaImage::new(2, 2); 4];
        sink.write(Path::new("out.mkv"), &frames, fps).unwrap();
        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, 4);
        assert_eq!(writes[0].2, 30.0);
    }
}
