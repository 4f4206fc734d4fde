//! Annotation file import/export.
//!
//! On-disk format: an optional `video` path plus a `keyframes` list in
//! ascending frame order, each keyframe carrying `pos_clicks`/`neg_clicks`
//! (`{x, y, obj}`) and `rects` (`{x, y, w, h, obj}`), coordinates
//! normalized to [0,1].
//!
//! Import is deliberately lenient - an annotation file is hand-editable
//! and travels between tool versions: a missing `obj` defaults to 1,
//! legacy bare `[x, y]` pairs are accepted, and entries that cannot be
//! parsed as coordinates are skipped with a warning instead of aborting
//! the whole file.

use log::warn;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::entities::keyframe::{ClickMark, DEFAULT_OBJECT_ID, Keyframe, RectMark};

/// Structured annotation record, as exchanged with the host and with disk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<String>,
    pub keyframes: Vec<Keyframe>,
}

/// Annotation file errors
#[derive(Debug)]
pub enum PersistError {
    /// The file is not valid JSON, or the top level is not an object
    Json(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Json(e) => write!(f, "invalid annotation file: {}", e),
        }
    }
}

impl std::error::Error for PersistError {}

impl AnnotationFile {
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string_pretty(self).map_err(|e| PersistError::Json(e.to_string()))
    }

    /// Parse an annotation file, skipping entries that don't parse.
    pub fn from_json(text: &str) -> Result<Self, PersistError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| PersistError::Json(e.to_string()))?;
        let obj = root
            .as_object()
            .ok_or_else(|| PersistError::Json("top level must be an object".into()))?;

        let video = obj.get("video").and_then(Value::as_str).map(str::to_owned);

        let mut keyframes = Vec::new();
        let entries = obj.get("keyframes").and_then(Value::as_array);
        for entry in entries.into_iter().flatten() {
            match parse_keyframe(entry) {
                Some(kf) => keyframes.push(kf),
                None => warn!("skipping keyframe entry without a valid frame_idx: {}", entry),
            }
        }
        Ok(Self { video, keyframes })
    }
}

fn parse_keyframe(entry: &Value) -> Option<Keyframe> {
    let frame_idx = entry.get("frame_idx")?.as_u64()?;
    let mut kf = Keyframe::new(u32::try_from(frame_idx).ok()?);

    for (field, target) in [("pos_clicks", &mut kf.pos_clicks), ("neg_clicks", &mut kf.neg_clicks)]
    {
        let items = entry.get(field).and_then(Value::as_array);
        for item in items.into_iter().flatten() {
            match parse_click(item) {
                Some(mark) => target.push(mark),
                None => warn!("[kf {}] skipping malformed {} entry: {}", frame_idx, field, item),
            }
        }
    }
    let rects = entry.get("rects").and_then(Value::as_array);
    for item in rects.into_iter().flatten() {
        match parse_rect(item) {
            Some(mark) => kf.rects.push(mark),
            None => warn!("[kf {}] skipping malformed rect entry: {}", frame_idx, item),
        }
    }
    Some(kf)
}

/// Accepts `{x, y, obj?}` objects and legacy `[x, y]` / `[x, y, obj]`
/// arrays.
fn parse_click(item: &Value) -> Option<ClickMark> {
    if let Some(obj) = item.as_object() {
        let x = obj.get("x")?.as_f64()?;
        let y = obj.get("y")?.as_f64()?;
        let object_id = parse_object_id(obj.get("obj"));
        return Some(ClickMark { x, y, object_id });
    }
    if let Some(arr) = item.as_array() {
        if arr.len() < 2 {
            return None;
        }
        let x = arr[0].as_f64()?;
        let y = arr[1].as_f64()?;
        let object_id = parse_object_id(arr.get(2));
        return Some(ClickMark { x, y, object_id });
    }
    None
}

/// Accepts `{x, y, w, h, obj?}` objects and legacy `[x, y, w, h]` /
/// `[x, y, w, h, obj]` arrays.
fn parse_rect(item: &Value) -> Option<RectMark> {
    if let Some(obj) = item.as_object() {
        let x = obj.get("x")?.as_f64()?;
        let y = obj.get("y")?.as_f64()?;
        let w = obj.get("w")?.as_f64()?;
        let h = obj.get("h")?.as_f64()?;
        let object_id = parse_object_id(obj.get("obj"));
        return Some(RectMark { x, y, w, h, object_id });
    }
    if let Some(arr) = item.as_array() {
        if arr.len() < 4 {
            return None;
        }
        let x = arr[0].as_f64()?;
        let y = arr[1].as_f64()?;
        let w = arr[2].as_f64()?;
        let h = arr[3].as_f64()?;
        let object_id = parse_object_id(arr.get(4));
        return Some(RectMark { x, y, w, h, object_id });
    }
    None
}

fn parse_object_id(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .filter(|&v| v >= 1)
        .unwrap_or(DEFAULT_OBJECT_ID)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_import_round_trip() {
        let mut kf = Keyframe::new(45);
        kf.pos_clicks.push(ClickMark { x: 0.5, y: 0.5, object_id: 1 });
        kf.neg_clicks.push(ClickMark { x: 0.25, y: 0.75, object_id: 2 });
        kf.rects.push(RectMark { x: 0.1, y: 0.1, w: 0.2, h: 0.3, object_id: 1 });
        let file = AnnotationFile { video: Some("clip.mp4".into()), keyframes: vec![kf.clone()] };

        let json = file.to_json().unwrap();
        let back = AnnotationFile::from_json(&json).unwrap();
        assert_eq!(back.video.as_deref(), Some("clip.mp4"));
        assert_eq!(back.keyframes, vec![kf]);
    }

    #[test]
    fn test_import_defaults_missing_object_id() {
        let json = r#"{
            "keyframes": [
                {"frame_idx": 12,
                 "pos_clicks": [{"x": 0.5, "y": 0.5}],
                 "rects": [{"x": 0.1, "y": 0.2, "w": 0.3, "h": 0.4}]}
            ]
        }"#;
        let file = AnnotationFile::from_json(json).unwrap();
        assert_eq!(file.keyframes[0].pos_clicks[0].object_id, 1);
        assert_eq!(file.keyframes[0].rects[0].object_id, 1);
    }

    #[test]
    fn test_import_accepts_legacy_bare_pairs() {
        let json = r#"{
            "keyframes": [
                {"frame_idx": 3,
                 "pos_clicks": [[0.4, 0.6]],
                 "neg_clicks": [[0.1, 0.2, 5]],
                 "rects": [[0.0, 0.0, 0.5, 0.5]]}
            ]
        }"#;
        let file = AnnotationFile::from_json(json).unwrap();
        let kf = &file.keyframes[0];
        assert_eq!(kf.pos_clicks[0], ClickMark { x: 0.4, y: 0.6, object_id: 1 });
        assert_eq!(kf.neg_clicks[0].object_id, 5);
        assert_eq!(kf.rects[0].w, 0.5);
    }

    #[test]
    fn test_import_skips_malformed_entries() {
        let json = r#"{
            "keyframes": [
                {"frame_idx": 7,
                 "pos_clicks": [{"x": 0.5, "y": 0.5}, {"x": "bad"}, [0.9], 42],
                 "rects": [{"x": 0.1, "y": 0.1, "w": 0.1}]},
                {"pos_clicks": [{"x": 0.5, "y": 0.5}]},
                {"frame_idx": -4}
            ]
        }"#;
        let file = AnnotationFile::from_json(json).unwrap();
        // the bad keyframes vanish, the good entries of kf 7 survive
        assert_eq!(file.keyframes.len(), 1);
        let kf = &file.keyframes[0];
        assert_eq!(kf.frame_idx, 7);
        assert_eq!(kf.pos_clicks.len(), 1);
        assert!(kf.rects.is_empty());
    }

    #[test]
    fn test_import_rejects_non_json() {
        assert!(AnnotationFile::from_json("not json").is_err());
        assert!(AnnotationFile::from_json("[1, 2, 3]").is_err());
    }

    #[test]
    fn test_export_omits_missing_video() {
        let file = AnnotationFile { video: None, keyframes: Vec::new() };
        let json = file.to_json().unwrap();
        assert!(!json.contains("video"));
        assert!(json.contains("keyframes"));
    }
}
