use serde_derive::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::Error;
use crate::math::ClassExtents;

/// Runtime tunables, adjustable while the pipeline runs
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub lanes: u32,
    /// km/h
    pub speed_threshold: f32,
    /// degrees
    pub angle_threshold: f32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lanes: 4,
            speed_threshold: 60.0,
            angle_threshold: 30.0,
            confidence_threshold: 0.3,
            iou_threshold: 0.1,
        }
    }
}

/// Partial settings change; absent fields keep their current value.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct SettingsUpdate {
    pub lanes: Option<u32>,
    pub speed_threshold: Option<f32>,
    pub angle_threshold: Option<f32>,
    pub confidence_threshold: Option<f32>,
    pub iou_threshold: Option<f32>,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if !(1..=10).contains(&self.lanes) {
            return Err(Error::invalid("lanes", self.lanes, "1..=10"));
        }

        if !(1.0..=200.0).contains(&self.speed_threshold) {
            return Err(Error::invalid(
                "speed threshold",
                self.speed_threshold,
                "1..=200 km/h",
            ));
        }

        if !(1.0..=180.0).contains(&self.angle_threshold) {
            return Err(Error::invalid(
                "angle threshold",
                self.angle_threshold,
                "1..=180 degrees",
            ));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::invalid(
                "confidence threshold",
                self.confidence_threshold,
                "0..=1",
            ));
        }

        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(Error::invalid("iou threshold", self.iou_threshold, "0..=1"));
        }

        Ok(())
    }

    /// Applies `update` only if the resulting settings are valid as a whole.
    pub fn apply(&mut self, update: SettingsUpdate) -> Result<(), Error> {
        let mut next = *self;

        if let Some(v) = update.lanes {
            next.lanes = v;
        }
        if let Some(v) = update.speed_threshold {
            next.speed_threshold = v;
        }
        if let Some(v) = update.angle_threshold {
            next.angle_threshold = v;
        }
        if let Some(v) = update.confidence_threshold {
            next.confidence_threshold = v;
        }
        if let Some(v) = update.iou_threshold {
            next.iou_threshold = v;
        }

        next.validate()?;
        *self = next;

        info!(
            "settings applied: lanes={}, speed={} km/h, angle={} deg, conf={}, iou={}",
            self.lanes,
            self.speed_threshold,
            self.angle_threshold,
            self.confidence_threshold,
            self.iou_threshold
        );

        Ok(())
    }
}

/// Static run parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub settings: Settings,
    pub fps: f32,
    /// Exponential smoothing factor for speed
    pub smoothing: f32,
    pub max_speed_kmh: f32,
    pub min_displacement_px: f32,
    /// Turns sharper than this are treated as identity swaps
    pub max_turn_angle: f32,
    /// Overlap above this is treated as nested boxes, not a collision
    pub collision_max_iou: f32,
    pub dedup_iou: f32,
    pub flow_window_secs: f32,
    pub silence_secs: f32,
    /// Counting line position as a fraction of frame height
    pub line_fraction: f32,
    pub flow_history_len: usize,
    pub input_capacity: usize,
    pub output_capacity: usize,
    pub pop_timeout_ms: u64,
    /// Identities unseen for longer than this many frames are forgotten
    pub max_idle_frames: i64,
    pub speed_sample_capacity: usize,
    pub extents: ClassExtents,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            fps: 30.0,
            smoothing: 0.3,
            max_speed_kmh: 200.0,
            min_displacement_px: 10.0,
            max_turn_angle: 90.0,
            collision_max_iou: 0.6,
            dedup_iou: 0.5,
            flow_window_secs: 5.0,
            silence_secs: 2.0,
            line_fraction: 0.5,
            flow_history_len: 100,
            input_capacity: 20,
            output_capacity: 20,
            pop_timeout_ms: 1000,
            max_idle_frames: 300,
            speed_sample_capacity: 10_000,
            extents: ClassExtents::default(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.settings.validate()?;

        if !(self.fps > 0.0 && self.fps.is_finite()) {
            return Err(Error::invalid("fps", self.fps, "> 0"));
        }

        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(Error::invalid("smoothing", self.smoothing, "0 < a <= 1"));
        }

        if !(self.max_speed_kmh > 0.0) {
            return Err(Error::invalid("max speed", self.max_speed_kmh, "> 0"));
        }

        if !(self.min_displacement_px >= 0.0) {
            return Err(Error::invalid(
                "min displacement",
                self.min_displacement_px,
                ">= 0",
            ));
        }

        if !(0.0..=180.0).contains(&self.max_turn_angle) {
            return Err(Error::invalid("max turn angle", self.max_turn_angle, "0..=180"));
        }

        if !(0.0..=1.0).contains(&self.collision_max_iou) {
            return Err(Error::invalid(
                "collision max iou",
                self.collision_max_iou,
                "0..=1",
            ));
        }

        if !(0.0..=1.0).contains(&self.dedup_iou) {
            return Err(Error::invalid("dedup iou", self.dedup_iou, "0..=1"));
        }

        if !(self.flow_window_secs > 0.0 && self.flow_window_secs.is_finite()) {
            return Err(Error::invalid("flow window", self.flow_window_secs, "> 0 s"));
        }

        if !(self.silence_secs >= 0.0 && self.silence_secs.is_finite()) {
            return Err(Error::invalid("silence period", self.silence_secs, ">= 0 s"));
        }

        if !(0.0..=1.0).contains(&self.line_fraction) {
            return Err(Error::invalid("line fraction", self.line_fraction, "0..=1"));
        }

        if self.flow_history_len == 0 || self.speed_sample_capacity == 0 {
            return Err(Error::invalid(
                "history length",
                self.flow_history_len.min(self.speed_sample_capacity),
                ">= 1",
            ));
        }

        if self.input_capacity == 0 || self.output_capacity == 0 {
            return Err(Error::invalid(
                "queue capacity",
                self.input_capacity.min(self.output_capacity),
                ">= 1",
            ));
        }

        if self.max_idle_frames < 1 {
            return Err(Error::invalid("max idle frames", self.max_idle_frames, ">= 1"));
        }

        let extents_ok = self.extents.default > 0.0 && self.extents.table.values().all(|v| *v > 0.0);
        if !extents_ok {
            return Err(Error::invalid("class extents", self.extents.default, "> 0 m"));
        }

        Ok(())
    }

    #[inline]
    pub fn flow_window(&self) -> Duration {
        Duration::from_secs_f32(self.flow_window_secs)
    }

    #[inline]
    pub fn silence_period(&self) -> Duration {
        Duration::from_secs_f32(self.silence_secs)
    }

    #[inline]
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }
}
