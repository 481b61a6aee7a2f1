use std::collections::HashMap;
use tracing::debug;

use crate::config::Config;
use crate::detection::{Detection, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub a: ObjectId,
    pub b: ObjectId,
    pub iou: f32,
}

/// Pairwise overlap check with a one-frame de-bounce per identity pair
#[derive(Debug)]
pub struct CollisionDetector {
    // unordered pair -> last frame a collision was recorded
    records: HashMap<(ObjectId, ObjectId), i64>,
    max_iou: f32,
}

#[inline]
fn pair_key(a: ObjectId, b: ObjectId) -> (ObjectId, ObjectId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl CollisionDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            records: HashMap::new(),
            max_iou: config.collision_max_iou,
        }
    }

    /// Collisions raised in `frame`: pairs overlapping strictly between
    /// `iou_threshold` and the nested-box bound, unless the same pair was
    /// recorded on the immediately preceding frame. A frame at or before the
    /// pair's last record is late and never raises or moves the record.
    pub fn evaluate(
        &mut self,
        detections: &[Detection],
        frame: i64,
        iou_threshold: f32,
    ) -> Vec<Collision> {
        let mut collisions = Vec::new();

        for (i, d1) in detections.iter().enumerate() {
            for d2 in &detections[i + 1..] {
                if d1.id == d2.id {
                    continue;
                }

                let iou = d1.iou(d2);
                if !(iou_threshold < iou && iou < self.max_iou) {
                    continue;
                }

                let key = pair_key(d1.id, d2.id);
                if let Some(&last) = self.records.get(&key) {
                    if frame <= last || frame - 1 == last {
                        continue;
                    }
                }

                self.records.insert(key, frame);
                debug!("objects {} and {} collided (iou {:.3})", d1.id, d2.id, iou);

                collisions.push(Collision {
                    a: d1.id,
                    b: d2.id,
                    iou,
                });
            }
        }

        collisions
    }

    #[inline]
    pub fn last_recorded(&self, a: ObjectId, b: ObjectId) -> Option<i64> {
        self.records.get(&pair_key(a, b)).copied()
    }

    pub fn evict_stale(&mut self, frame: i64, max_age: i64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, last| frame - *last <= max_age);

        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    fn det(id: u32, x1: f32, x2: f32) -> Detection {
        Detection {
            id: ObjectId::Tracked(id),
            class: "SUV".to_string(),
            confidence: 0.9,
            bbox: BBox::ltrb(x1, 0., x2, 99.),
        }
    }

    // 100x100 boxes; IoU = overlap / (200 - overlap) for overlap columns
    fn pair_with_iou_near_0_2() -> Vec<Detection> {
        vec![det(1, 0., 99.), det(2, 66., 165.)]
    }

    #[test]
    fn debounce_suppresses_only_the_next_frame() {
        let mut cd = CollisionDetector::new(&Config::default());
        let dets = pair_with_iou_near_0_2();
        let iou = dets[0].iou(&dets[1]);
        assert!(iou > 0.15 && iou < 0.25);

        assert_eq!(cd.evaluate(&dets, 10, 0.1).len(), 1);
        assert!(cd.evaluate(&dets, 11, 0.1).is_empty());
        assert_eq!(cd.evaluate(&dets, 12, 0.1).len(), 1);
        assert_eq!(cd.last_recorded(ObjectId::Tracked(2), ObjectId::Tracked(1)), Some(12));
    }

    #[test]
    fn late_frame_neither_fires_nor_rewinds_record() {
        let mut cd = CollisionDetector::new(&Config::default());
        let dets = pair_with_iou_near_0_2();

        let fired: Vec<bool> = [10, 5, 11, 10]
            .iter()
            .map(|&frame| !cd.evaluate(&dets, frame, 0.1).is_empty())
            .collect();

        assert_eq!(fired, vec![true, false, false, false]);
        assert_eq!(cd.last_recorded(ObjectId::Tracked(1), ObjectId::Tracked(2)), Some(10));
        assert_eq!(cd.evaluate(&dets, 12, 0.1).len(), 1);
    }

    #[test]
    fn overlap_at_threshold_is_proximity() {
        let mut cd = CollisionDetector::new(&Config::default());
        let dets = pair_with_iou_near_0_2();
        let iou = dets[0].iou(&dets[1]);

        assert!(cd.evaluate(&dets, 1, iou).is_empty());
    }

    #[test]
    fn nested_boxes_are_not_collisions() {
        let mut cd = CollisionDetector::new(&Config::default());
        let dets = vec![det(1, 0., 99.), det(2, 10., 99.)];
        assert!(dets[0].iou(&dets[1]) >= 0.6);

        assert!(cd.evaluate(&dets, 1, 0.1).is_empty());
    }

    #[test]
    fn pair_key_is_unordered() {
        let mut cd = CollisionDetector::new(&Config::default());
        let dets = pair_with_iou_near_0_2();
        cd.evaluate(&dets, 10, 0.1);

        let swapped = vec![dets[1].clone(), dets[0].clone()];
        assert!(cd.evaluate(&swapped, 11, 0.1).is_empty());
    }

    #[test]
    fn old_records_are_pruned() {
        let mut cd = CollisionDetector::new(&Config::default());
        cd.evaluate(&pair_with_iou_near_0_2(), 10, 0.1);

        assert_eq!(cd.evict_stale(100, 300), 0);
        assert_eq!(cd.evict_stale(500, 300), 1);
        assert_eq!(cd.last_recorded(ObjectId::Tracked(1), ObjectId::Tracked(2)), None);
    }
}
