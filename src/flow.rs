use std::time::{Duration, Instant};
use tracing::debug;

use crate::arena::ObjectTable;
use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::ObjectId;

const SECONDS_IN_HOUR: f32 = 3600.0;

#[derive(Debug, Clone, Copy)]
struct LinePosition {
    y: f32,
    counted: bool,
    frame: i64,
}

/// Counts downward crossings of a horizontal line and folds them into a
/// vehicles-per-hour-per-lane rate over fixed wall-clock windows.
#[derive(Debug)]
pub struct FlowRateEstimator {
    positions: ObjectTable<LinePosition>,
    line_fraction: f32,
    window: Duration,
    silence: Duration,
    window_start: Instant,
    last_detection: Option<Instant>,
    counter: u32,
    history: CircularQueue<f32>,
    current_rate: f32,
}

impl FlowRateEstimator {
    pub fn new(config: &Config, now: Instant) -> Self {
        Self {
            positions: ObjectTable::new(),
            line_fraction: config.line_fraction,
            window: config.flow_window(),
            silence: config.silence_period(),
            window_start: now,
            last_detection: None,
            counter: 0,
            history: CircularQueue::with_capacity(config.flow_history_len),
            current_rate: 0.0,
        }
    }

    /// Counting line position for a frame of the given height
    #[inline]
    pub fn line_y(&self, frame_height: u32) -> f32 {
        (frame_height as f32 * self.line_fraction).floor()
    }

    /// Feeds one object's center; returns true when it just crossed the line
    /// going down. The object may be counted again once it is back above.
    /// Only the first observation per object and frame counts; repeated or
    /// late frames are ignored.
    pub fn observe(&mut self, id: ObjectId, y: f32, line_y: f32, frame: i64) -> bool {
        let mut fresh = false;
        let pos = self.positions.get_or_insert_with(id, frame, || {
            fresh = true;
            LinePosition {
                y,
                counted: false,
                frame,
            }
        });

        if !fresh && frame <= pos.frame {
            return false;
        }
        pos.frame = frame;

        let crossed = !fresh && !pos.counted && pos.y < line_y && line_y <= y;
        if crossed {
            self.counter += 1;
            pos.counted = true;
            debug!("object {} crossed counting line at y={}", id, line_y);
        }

        pos.y = y;
        if y < line_y {
            pos.counted = false;
        }

        crossed
    }

    /// Advances the window clock. When a window has elapsed, closes it and
    /// returns its rate; a window with no detections during the silence
    /// period yields 0 and zeroes the displayed rate.
    pub fn tick(&mut self, now: Instant, lanes: u32, saw_detections: bool) -> Option<f32> {
        if saw_detections {
            self.last_detection = Some(now);
        }

        if now.saturating_duration_since(self.window_start) < self.window {
            return None;
        }

        let silent = self
            .last_detection
            .map_or(true, |t| now.saturating_duration_since(t) >= self.silence);

        let rate = if silent {
            0.0
        } else {
            let per_hour = SECONDS_IN_HOUR / self.window.as_secs_f32();
            (self.counter as f32 * per_hour / lanes.max(1) as f32).max(0.0)
        };

        self.history.push(rate);
        self.current_rate = if silent {
            0.0
        } else {
            self.history.mean().unwrap_or(0.0)
        };

        debug!(
            "flow window closed: {} crossings, rate {:.2} veh/h, displayed {:.2} veh/h",
            self.counter, rate, self.current_rate
        );

        self.counter = 0;
        self.window_start = now;

        Some(rate)
    }

    #[inline]
    pub fn current_rate(&self) -> f32 {
        self.current_rate
    }

    #[inline]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn history(&self) -> Vec<f32> {
        self.history.to_vec()
    }

    pub fn evict_stale(&mut self, frame: i64, max_age: i64) -> usize {
        self.positions.evict_stale(frame, max_age)
    }

    pub fn reset(&mut self, now: Instant) {
        self.positions.clear();
        self.history.clear();
        self.counter = 0;
        self.current_rate = 0.0;
        self.last_detection = None;
        self.window_start = now;
    }
}
