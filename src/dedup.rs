use std::cmp::Ordering;

use crate::detection::Detection;

/// Greedy suppression of overlapping detections within one frame.
///
/// Detections are visited by descending confidence (ties keep encounter
/// order) and kept only if their overlap with every already kept box is at
/// most `max_iou`.
pub fn deduplicate(mut detections: Vec<Detection>, max_iou: f32) -> Vec<Detection> {
    if detections.len() < 2 {
        return detections;
    }

    // stable sort, so equal confidences stay in encounter order
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for det in detections {
        if kept.iter().all(|k| k.iou(&det) <= max_iou) {
            kept.push(det);
        }
    }

    kept
}
