//! Per-frame annotation records.
//!
//! One `Keyframe` per distinct annotated frame index. Coordinates are
//! normalized to [0,1] over the displayed video rectangle so annotations
//! survive window resizes and resolution changes; the segmentation
//! collaborator denormalizes them against the source resolution.

use serde::{Deserialize, Serialize};

/// Default object id for entries written before multi-object support.
pub const DEFAULT_OBJECT_ID: u32 = 1;

fn default_object_id() -> u32 {
    DEFAULT_OBJECT_ID
}

/// A click prompt: normalized position plus the object it labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickMark {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "obj", default = "default_object_id")]
    pub object_id: u32,
}

/// A rectangle prompt: normalized (x, y, w, h) plus object id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectMark {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(rename = "obj", default = "default_object_id")]
    pub object_id: u32,
}

/// Annotation record attached to one frame index.
///
/// Invariant (enforced by `AnnotationStore`): a keyframe with no clicks and
/// no rectangles is removed from the store immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame_idx: u32,
    #[serde(default)]
    pub pos_clicks: Vec<ClickMark>,
    #[serde(default)]
    pub neg_clicks: Vec<ClickMark>,
    #[serde(default)]
    pub rects: Vec<RectMark>,
}

impl Keyframe {
    pub fn new(frame_idx: u32) -> Self {
        Self {
            frame_idx,
            pos_clicks: Vec::new(),
            neg_clicks: Vec::new(),
            rects: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos_clicks.is_empty() && self.neg_clicks.is_empty() && self.rects.is_empty()
    }

    /// Total number of marks (clicks + rectangles).
    pub fn mark_count(&self) -> usize {
        self.pos_clicks.len() + self.neg_clicks.len() + self.rects.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_keyframe() {
        let mut kf = Keyframe::new(12);
        assert!(kf.is_empty());
        assert_eq!(kf.mark_count(), 0);

        kf.rects.push(RectMark { x: 0.1, y: 0.1, w: 0.2, h: 0.2, object_id: 1 });
        assert!(!kf.is_empty());
        assert_eq!(kf.mark_count(), 1);
    }

    #[test]
    fn test_click_serde_defaults_object_id() {
        // entries written before multi-object support carry no "obj" field
        let mark: ClickMark = serde_json::from_str(r#"{"x": 0.5, "y": 0.25}"#).unwrap();
        assert_eq!(mark.object_id, DEFAULT_OBJECT_ID);

        let json = serde_json::to_string(&mark).unwrap();
        assert!(json.contains("\"obj\":1"));
    }
}
