//! Segmentation/inpainting collaborator contracts.
//!
//! The models behind these traits run on their own schedule (likely a GPU
//! worker process); the engine only defines the data contract and never
//! performs pixel inference itself. Handles are explicitly owned and
//! injected - no process-wide model singletons - so tests substitute
//! fakes.

use image::{GrayImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::fmt;

use crate::entities::Keyframe;

/// Per-object boolean masks for one frame. A pixel value of 0 is
/// background; anything else belongs to the object.
pub type ObjectMasks = HashMap<u32, GrayImage>;

/// Collaborator errors
#[derive(Debug)]
pub enum ServiceError {
    Segmentation(String),
    Inpainting(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Segmentation(e) => write!(f, "segmentation failed: {}", e),
            ServiceError::Inpainting(e) => write!(f, "inpainting failed: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

/// Produces per-object masks from click/rectangle prompts.
///
/// `prompts` holds the annotated keyframes (ascending frame order, as
/// `AnnotationStore::all_sorted` yields them) with normalized coordinates;
/// the implementation denormalizes against the frame resolution and
/// propagates through the whole sequence. The result has one entry per
/// input frame; frames the model produced nothing for get an empty map.
pub trait Segmenter {
    fn segment(
        &mut self,
        frames: &[RgbaImage],
        prompts: &[Keyframe],
    ) -> Result<Vec<ObjectMasks>, ServiceError>;
}

/// Produces replacement frames for masked regions.
///
/// `prior` is an optional precomputed structural prior (one frame per
/// input frame); when absent the implementation computes its own. Edge
/// feathering against the original - the distance-transform alpha blend
/// that preserves pixels outside the dilated mask exactly - is the
/// implementation's responsibility; returned frames are final.
pub trait Inpainter {
    fn inpaint(
        &mut self,
        frames: &[RgbaImage],
        masks: &[GrayImage],
        prior: Option<&[RgbaImage]>,
    ) -> Result<Vec<RgbaImage>, ServiceError>;
}

/// Owned collaborator handles, passed into whatever drives a processing
/// run.
pub struct Services {
    pub segmenter: Box<dyn Segmenter>,
    pub inpainter: Box<dyn Inpainter>,
}

/// Distinct colors per object id (the matplotlib tab10 cycle).
const OBJECT_COLORS: [[u8; 3]; 10] = [
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
    [140, 86, 75],
    [227, 119, 194],
    [127, 127, 127],
    [188, 189, 34],
    [23, 190, 207],
];

/// Display color for an object id.
pub fn object_color(object_id: u32) -> Rgba<u8> {
    let [r, g, b] = OBJECT_COLORS[object_id as usize % OBJECT_COLORS.len()];
    Rgba([r, g, b, 255])
}

/// Render per-object masks as review frames: one color per object over a
/// black background, sized `width` x `height`. Suitable for the mask
/// preview buffer and for encoding as a mask video.
pub fn render_mask_frames(masks: &[ObjectMasks], width: u32, height: u32) -> Vec<RgbaImage> {
    masks
        .iter()
        .map(|frame_masks| {
            let mut out = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
            for (&object_id, mask) in frame_masks {
                let color = object_color(object_id);
                for (x, y, px) in mask.enumerate_pixels() {
                    if px[0] != 0 && x < width && y < height {
                        out.put_pixel(x, y, color);
                    }
                }
            }
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    struct NullSegmenter;

    impl Segmenter for NullSegmenter {
        fn segment(
            &mut self,
            frames: &[RgbaImage],
            _prompts: &[Keyframe],
        ) -> Result<Vec<ObjectMasks>, ServiceError> {
            Ok(vec![ObjectMasks::new(); frames.len()])
        }
    }

    struct EchoInpainter;

    impl Inpainter for EchoInpainter {
        fn inpaint(
            &mut self,
            frames: &[RgbaImage],
            _masks: &[GrayImage],
            _prior: Option<&[RgbaImage]>,
        ) -> Result<Vec<RgbaImage>, ServiceError> {
            Ok(frames.to_vec())
        }
    }

    #[test]
    fn test_services_take_fakes() {
        let mut services =
            Services { segmenter: Box::new(NullSegmenter), inpainter: Box::new(EchoInpainter) };

        let frames = vec![RgbaImage::new(4, 4); 3];
        let masks = services.segmenter.segment(&frames, &[]).unwrap();
        assert_eq!(masks.len(), 3);

        let flat: Vec<GrayImage> = (0..3).map(|_| GrayImage::new(4, 4)).collect();
        let out = services.inpainter.inpaint(&frames, &flat, None).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_render_mask_frames_colors_objects() {
        let mut mask_a = GrayImage::new(4, 4);
        mask_a.put_pixel(1, 1, Luma([255]));
        let mut mask_b = GrayImage::new(4, 4);
        mask_b.put_pixel(2, 2, Luma([255]));

        let mut frame_masks = ObjectMasks::new();
        frame_masks.insert(1, mask_a);
        frame_masks.insert(2, mask_b);

        let rendered = render_mask_frames(&[frame_masks], 4, 4);
        assert_eq!(rendered.len(), 1);
        let img = &rendered[0];
        assert_eq!(*img.get_pixel(1, 1), object_color(1));
        assert_eq!(*img.get_pixel(2, 2), object_color(2));
        // background stays black
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_object_color_cycles() {
        assert_eq!(object_color(0), object_color(10));
        assert_ne!(object_color(1), object_color(2));
    }
}
