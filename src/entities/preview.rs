//! Preview buffer: a finite, positioned in-memory frame sequence.
//!
//! **Why**: Freshly generated mask or infill results should be reviewable
//! immediately, before they are encoded to disk. A non-empty buffer
//! substitutes for the layer's file-backed follower over its index range.
//!
//! Outside the active range the layer is hidden, never frozen on a stale
//! image - a stale frame outside the buffer's validity window would look
//! exactly like a correct result.

use image::RgbaImage;
use log::info;
use std::sync::Arc;

/// Offset-indexed sequence of raster frames substituting for a file-backed
/// layer over `[start_frame, start_frame + len)`.
#[derive(Debug, Clone, Default)]
pub struct PreviewBuffer {
    frames: Vec<Arc<RgbaImage>>,
    start_frame: u32,
}

impl PreviewBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the buffer contents. An empty `frames` is equivalent to
    /// `clear()`.
    pub fn set(&mut self, frames: Vec<Arc<RgbaImage>>, start_frame: u32) {
        if frames.is_empty() {
            self.clear();
            return;
        }
        info!(
            "preview buffer set: {} frames covering [{}, {})",
            frames.len(),
            start_frame,
            start_frame as usize + frames.len()
        );
        self.frames = frames;
        self.start_frame = start_frame;
    }

    pub fn clear(&mut self) {
        if !self.frames.is_empty() {
            info!("preview buffer cleared ({} frames)", self.frames.len());
        }
        self.frames.clear();
        self.start_frame = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn start_frame(&self) -> u32 {
        self.start_frame
    }

    /// Frame displayed at `idx`, or `None` outside the active range.
    pub fn frame_for(&self, idx: u32) -> Option<Arc<RgbaImage>> {
        let offset = idx.checked_sub(self.start_frame)? as usize;
        self.frames.get(offset).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<Arc<RgbaImage>> {
        (0..n)
            .map(|i| Arc::new(RgbaImage::from_pixel(2, 2, image::Rgba([i as u8, 0, 0, 255]))))
            .collect()
    }

    #[test]
    fn test_frame_for_range() {
        let mut buf = PreviewBuffer::new();
        buf.set(frames(5), 100);

        // in range: 100..=104
        assert!(buf.frame_for(100).is_some());
        let last = buf.frame_for(104).expect("104 is the 5th frame");
        assert_eq!(last.get_pixel(0, 0)[0], 4);

        // just outside either end: absent, not stale
        assert!(buf.frame_for(99).is_none());
        assert!(buf.frame_for(105).is_none());
        assert!(buf.frame_for(0).is_none());
    }

    #[test]
    fn test_set_empty_is_clear() {
        let mut buf = PreviewBuffer::new();
        buf.set(frames(3), 10);
        assert!(!buf.is_empty());

        buf.set(Vec::new(), 50);
        assert!(buf.is_empty());
        assert_eq!(buf.start_frame(), 0);
        assert!(buf.frame_for(50).is_none());
    }

    #[test]
    fn test_set_replaces_prior_buffer() {
        let mut buf = PreviewBuffer::new();
        buf.set(frames(3), 10);
        buf.set(frames(2), 40);

        assert!(buf.frame_for(10).is_none());
        assert!(buf.frame_for(40).is_some());
        assert_eq!(buf.len(), 2);
    }
}
