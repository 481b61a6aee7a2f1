use nalgebra as na;
use std::collections::HashSet;
use tracing::debug;

use crate::arena::ObjectTable;
use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::ObjectId;
use crate::math;

const HISTORY_LEN: usize = 3;

// tolerance for a right-angle turn landing a hair above the upper bound
const ANGLE_EPSILON: f32 = 1e-3;

#[derive(Debug, Clone)]
struct History {
    points: CircularQueue<na::Point2<f32>>,
    last_frame: i64,
}

/// Two consecutive displacements over the last three recorded centers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Turn {
    pub first: na::Vector2<f32>,
    pub second: na::Vector2<f32>,
    pub angle: f32,
}

/// Flags sharp direction changes over each object's last three positions
#[derive(Debug)]
pub struct TrajectoryDetector {
    histories: ObjectTable<History>,
    fired: HashSet<(ObjectId, i64)>,
    min_displacement: f32,
    max_turn_angle: f32,
}

impl TrajectoryDetector {
    pub fn new(config: &Config) -> Self {
        Self {
            histories: ObjectTable::new(),
            fired: HashSet::new(),
            min_displacement: config.min_displacement_px,
            max_turn_angle: config.max_turn_angle,
        }
    }

    /// Records the object's center for `frame`. Frames at or before the last
    /// recorded one are ignored.
    pub fn record(&mut self, id: ObjectId, center: na::Point2<f32>, frame: i64) {
        let mut fresh = false;
        let history = self.histories.get_or_insert_with(id, frame, || {
            fresh = true;

            let mut points = CircularQueue::with_capacity(HISTORY_LEN);
            points.push(center);

            History {
                points,
                last_frame: frame,
            }
        });

        if !fresh && frame > history.last_frame {
            history.points.push(center);
            history.last_frame = frame;
        }
    }

    pub fn turn(&self, id: &ObjectId) -> Option<Turn> {
        let points = &self.histories.get(id)?.points;
        if points.len() < HISTORY_LEN {
            return None;
        }

        let (p1, p2, p3) = (points.get(0)?, points.get(1)?, points.get(2)?);
        let first = p2 - p1;
        let second = p3 - p2;

        Some(Turn {
            first,
            second,
            angle: math::angle_between(&first, &second),
        })
    }

    /// Returns the turn angle if the object swerved sharper than
    /// `angle_threshold` and this (object, frame) pair has not fired before.
    /// Only the newest recorded frame is evaluated; late frames never fire.
    pub fn evaluate(&mut self, id: ObjectId, frame: i64, angle_threshold: f32) -> Option<f32> {
        if self.histories.get(&id)?.last_frame != frame {
            return None;
        }

        let turn = self.turn(&id)?;

        if turn.first.norm() < self.min_displacement || turn.second.norm() < self.min_displacement {
            return None;
        }

        if turn.angle <= angle_threshold || turn.angle > self.max_turn_angle + ANGLE_EPSILON {
            return None;
        }

        if !self.fired.insert((id, frame)) {
            return None;
        }

        debug!("object {} trajectory anomaly: turn of {:.2} deg", id, turn.angle);

        Some(turn.angle)
    }

    pub fn evict_stale(&mut self, frame: i64, max_age: i64) -> usize {
        self.fired.retain(|&(_, f)| frame - f <= max_age);
        self.histories.evict_stale(frame, max_age)
    }

    pub fn clear(&mut self) {
        self.histories.clear();
        self.fired.clear();
    }
}
