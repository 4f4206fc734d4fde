//! Annotation store: frame index -> keyframe.
//!
//! **Why**: The store is the single owner of all annotation state. Every
//! mutation path funnels through it so the no-empty-keyframe invariant
//! holds everywhere, and so the controller can refresh the overlay after
//! any change from one place.
//!
//! Keyed on a `BTreeMap` - the export format and the segmentation
//! collaborator both want keyframes in ascending frame order.

use log::{debug, trace};
use std::collections::BTreeMap;

use super::keyframe::{ClickMark, Keyframe, RectMark};

/// Hit radius, in display pixels, for deleting a click or a rectangle edge.
pub const DELETE_RADIUS_PX: f64 = 8.0;

/// Click label: positive marks the object, negative marks background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    Positive,
    Negative,
}

/// Mapping from frame index to the per-frame annotation record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationStore {
    keyframes: BTreeMap<u32, Keyframe>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from parsed keyframes, merging duplicate frame indices
    /// and dropping records that arrive empty.
    pub fn from_keyframes<I: IntoIterator<Item = Keyframe>>(keyframes: I) -> Self {
        let mut store = Self::new();
        for kf in keyframes {
            let idx = kf.frame_idx;
            let slot = store.get_or_create(idx);
            slot.pos_clicks.extend(kf.pos_clicks);
            slot.neg_clicks.extend(kf.neg_clicks);
            slot.rects.extend(kf.rects);
            store.prune_if_empty(idx);
        }
        store
    }

    pub fn get(&self, frame_idx: u32) -> Option<&Keyframe> {
        self.keyframes.get(&frame_idx)
    }

    /// Fetch the record for `frame_idx`, creating it lazily.
    pub fn get_or_create(&mut self, frame_idx: u32) -> &mut Keyframe {
        self.keyframes
            .entry(frame_idx)
            .or_insert_with(|| Keyframe::new(frame_idx))
    }

    pub fn add_point(&mut self, frame_idx: u32, kind: PointKind, x: f64, y: f64, object_id: u32) {
        let kf = self.get_or_create(frame_idx);
        let mark = ClickMark { x, y, object_id };
        match kind {
            PointKind::Positive => kf.pos_clicks.push(mark),
            PointKind::Negative => kf.neg_clicks.push(mark),
        }
        trace!("[kf {}] +{:?} ({:.3},{:.3}) obj {}", frame_idx, kind, x, y, object_id);
    }

    pub fn add_rect(&mut self, frame_idx: u32, x: f64, y: f64, w: f64, h: f64, object_id: u32) {
        let kf = self.get_or_create(frame_idx);
        kf.rects.push(RectMark { x, y, w, h, object_id });
        trace!("[kf {}] +rect ({:.3},{:.3},{:.3},{:.3}) obj {}", frame_idx, x, y, w, h, object_id);
    }

    /// Delete the annotation nearest to the normalized point `(x, y)`.
    ///
    /// Clicks are searched first (positive, then negative) within
    /// `DELETE_RADIUS_PX` of the query point, measured in display pixels
    /// (`display_w`/`display_h` are the dimensions of the letterboxed video
    /// rectangle). If no click matches, rectangles are tested edge by edge
    /// with the same pixel threshold. At most one annotation is removed.
    ///
    /// Returns `true` if anything was deleted.
    pub fn delete_nearest(
        &mut self,
        frame_idx: u32,
        x: f64,
        y: f64,
        display_w: f64,
        display_h: f64,
    ) -> bool {
        let w = display_w.max(1.0);
        let h = display_h.max(1.0);
        let Some(kf) = self.keyframes.get_mut(&frame_idx) else {
            return false;
        };

        let near_click = |marks: &[ClickMark]| -> Option<usize> {
            marks.iter().position(|m| {
                let dx = (x - m.x) * w;
                let dy = (y - m.y) * h;
                (dx * dx + dy * dy).sqrt() <= DELETE_RADIUS_PX
            })
        };

        if let Some(i) = near_click(&kf.pos_clicks) {
            kf.pos_clicks.remove(i);
            debug!("[kf {}] deleted positive click near ({:.3},{:.3})", frame_idx, x, y);
            self.prune_if_empty(frame_idx);
            return true;
        }
        if let Some(i) = near_click(&kf.neg_clicks) {
            kf.neg_clicks.remove(i);
            debug!("[kf {}] deleted negative click near ({:.3},{:.3})", frame_idx, x, y);
            self.prune_if_empty(frame_idx);
            return true;
        }

        // No click matched; test rectangle borders. The threshold converts
        // back to normalized units per axis.
        let rx_tol = DELETE_RADIUS_PX / w;
        let ry_tol = DELETE_RADIUS_PX / h;
        let near_edge = |r: &RectMark| -> bool {
            let left = (x - r.x).abs() <= rx_tol && (r.y - ry_tol) <= y && y <= (r.y + r.h + ry_tol);
            let right =
                (x - (r.x + r.w)).abs() <= rx_tol && (r.y - ry_tol) <= y && y <= (r.y + r.h + ry_tol);
            let top = (y - r.y).abs() <= ry_tol && (r.x - rx_tol) <= x && x <= (r.x + r.w + rx_tol);
            let bottom =
                (y - (r.y + r.h)).abs() <= ry_tol && (r.x - rx_tol) <= x && x <= (r.x + r.w + rx_tol);
            left || right || top || bottom
        };

        if let Some(i) = kf.rects.iter().position(near_edge) {
            kf.rects.remove(i);
            debug!("[kf {}] deleted rectangle near ({:.3},{:.3})", frame_idx, x, y);
            self.prune_if_empty(frame_idx);
            return true;
        }

        false
    }

    /// Drop the record for `frame_idx` if it holds no annotations.
    pub fn prune_if_empty(&mut self, frame_idx: u32) {
        if self.keyframes.get(&frame_idx).is_some_and(Keyframe::is_empty) {
            self.keyframes.remove(&frame_idx);
            trace!("[kf {}] pruned empty keyframe", frame_idx);
        }
    }

    /// All keyframes in ascending frame order.
    pub fn all_sorted(&self) -> impl Iterator<Item = &Keyframe> {
        self.keyframes.values()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn clear(&mut self) {
        self.keyframes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 1280.0;
    const H: f64 = 720.0;

    /// Keyframe exists iff it holds at least one annotation, under any
    /// sequence of add/delete operations.
    #[test]
    fn test_prune_invariant() {
        let mut store = AnnotationStore::new();
        assert!(store.get(7).is_none());

        store.add_point(7, PointKind::Positive, 0.5, 0.5, 1);
        assert_eq!(store.get(7).unwrap().pos_clicks.len(), 1);

        assert!(store.delete_nearest(7, 0.5, 0.5, W, H));
        assert!(store.get(7).is_none(), "empty keyframe must be pruned");

        // add two, delete one: record stays
        store.add_point(7, PointKind::Positive, 0.2, 0.2, 1);
        store.add_rect(7, 0.4, 0.4, 0.2, 0.2, 1);
        assert!(store.delete_nearest(7, 0.2, 0.2, W, H));
        assert!(store.get(7).is_some());
        assert!(store.delete_nearest(7, 0.4, 0.5, W, H));
        assert!(store.get(7).is_none());
    }

    #[test]
    fn test_delete_prefers_points_over_rects() {
        let mut store = AnnotationStore::new();
        // rect edge passes through the click position
        store.add_rect(3, 0.5, 0.2, 0.2, 0.6, 1);
        store.add_point(3, PointKind::Negative, 0.5, 0.5, 1);

        assert!(store.delete_nearest(3, 0.5, 0.5, W, H));
        let kf = store.get(3).unwrap();
        assert!(kf.neg_clicks.is_empty(), "the click goes first");
        assert_eq!(kf.rects.len(), 1);
    }

    #[test]
    fn test_delete_positive_before_negative() {
        let mut store = AnnotationStore::new();
        store.add_point(0, PointKind::Negative, 0.5, 0.5, 1);
        store.add_point(0, PointKind::Positive, 0.5, 0.5, 1);

        assert!(store.delete_nearest(0, 0.5, 0.5, W, H));
        let kf = store.get(0).unwrap();
        assert!(kf.pos_clicks.is_empty());
        assert_eq!(kf.neg_clicks.len(), 1);
    }

    #[test]
    fn test_delete_respects_pixel_radius() {
        let mut store = AnnotationStore::new();
        store.add_point(1, PointKind::Positive, 0.5, 0.5, 1);

        // 20 px away on a 1280-wide display: outside the 8 px radius
        let far_x = 0.5 + 20.0 / W;
        assert!(!store.delete_nearest(1, far_x, 0.5, W, H));
        assert!(store.get(1).is_some());

        // 5 px away: inside
        let near_x = 0.5 + 5.0 / W;
        assert!(store.delete_nearest(1, near_x, 0.5, W, H));
        assert!(store.get(1).is_none());
    }

    #[test]
    fn test_delete_rect_by_edge_only() {
        let mut store = AnnotationStore::new();
        store.add_rect(2, 0.25, 0.25, 0.5, 0.5, 1);

        // center of the rectangle is far from every edge: no hit
        assert!(!store.delete_nearest(2, 0.5, 0.5, W, H));
        assert_eq!(store.get(2).unwrap().rects.len(), 1);

        // on the left edge
        assert!(store.delete_nearest(2, 0.25, 0.5, W, H));
        assert!(store.get(2).is_none());
    }

    #[test]
    fn test_exactly_one_deletion_per_call() {
        let mut store = AnnotationStore::new();
        store.add_point(4, PointKind::Positive, 0.5, 0.5, 1);
        store.add_point(4, PointKind::Positive, 0.501, 0.5, 2);

        assert!(store.delete_nearest(4, 0.5, 0.5, W, H));
        assert_eq!(store.get(4).unwrap().pos_clicks.len(), 1);
    }

    #[test]
    fn test_all_sorted_order() {
        let mut store = AnnotationStore::new();
        store.add_point(30, PointKind::Positive, 0.1, 0.1, 1);
        store.add_point(5, PointKind::Positive, 0.1, 0.1, 1);
        store.add_point(12, PointKind::Positive, 0.1, 0.1, 1);

        let order: Vec<u32> = store.all_sorted().map(|k| k.frame_idx).collect();
        assert_eq!(order, vec![5, 12, 30]);
    }

    #[test]
    fn test_from_keyframes_merges_and_prunes() {
        let mut a = Keyframe::new(9);
        a.pos_clicks.push(ClickMark { x: 0.1, y: 0.1, object_id: 1 });
        let mut b = Keyframe::new(9);
        b.rects.push(RectMark { x: 0.2, y: 0.2, w: 0.1, h: 0.1, object_id: 2 });
        let empty = Keyframe::new(44);

        let store = AnnotationStore::from_keyframes([a, b, empty]);
        assert_eq!(store.len(), 1);
        let kf = store.get(9).unwrap();
        assert_eq!(kf.pos_clicks.len(), 1);
        assert_eq!(kf.rects.len(), 1);
        assert!(store.get(44).is_none());
    }
}
