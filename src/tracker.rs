use nalgebra as na;

use crate::arena::ObjectTable;
use crate::config::Config;
use crate::detection::{Detection, ObjectId};
use crate::math::{self, ClassExtents};

const MS_TO_KMH: f32 = 3.6;

#[derive(Debug, Clone, PartialEq)]
pub struct KinematicState {
    pub center: na::Point2<f32>,
    pub frame: i64,
    /// meters per pixel
    pub scale: f32,
    /// smoothed, km/h
    pub speed: f32,
}

/// Per-object position history and speed estimation
#[derive(Debug)]
pub struct KinematicTracker {
    objects: ObjectTable<KinematicState>,
    extents: ClassExtents,
    fps: f32,
    alpha: f32,
    max_speed: f32,
}

impl KinematicTracker {
    pub fn new(config: &Config) -> Self {
        Self {
            objects: ObjectTable::new(),
            extents: config.extents.clone(),
            fps: config.fps,
            alpha: config.smoothing,
            max_speed: config.max_speed_kmh,
        }
    }

    /// Updates the object's state from this frame's sighting and returns its
    /// smoothed speed in km/h.
    ///
    /// First sightings report 0. Frames that do not advance past the last
    /// processed one leave the state untouched and report the previous speed.
    pub fn update(&mut self, det: &Detection, frame: i64) -> f32 {
        let center = det.center();
        let scale = self.extents.scale(&det.class, det.height_px());

        let mut fresh = false;
        let state = self.objects.get_or_insert_with(det.id, frame, || {
            fresh = true;
            KinematicState {
                center,
                frame,
                scale,
                speed: 0.0,
            }
        });

        if fresh {
            return 0.0;
        }

        let gap = frame - state.frame;
        if gap <= 0 {
            return state.speed;
        }

        let instant = instantaneous_speed(
            state,
            center,
            scale,
            gap,
            self.fps,
            self.max_speed,
        );

        state.speed = math::ema(state.speed, instant, self.alpha);
        state.center = center;
        state.frame = frame;
        state.scale = scale;

        state.speed
    }

    #[inline]
    pub fn speed(&self, id: &ObjectId) -> Option<f32> {
        self.objects.get(id).map(|s| s.speed)
    }

    #[inline]
    pub fn state(&self, id: &ObjectId) -> Option<&KinematicState> {
        self.objects.get(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn evict_stale(&mut self, frame: i64, max_age: i64) -> usize {
        self.objects.evict_stale(frame, max_age)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Speed in km/h between the previous state and a new sighting `gap` frames
/// later, clamped to `[0, max_speed]`.
pub fn instantaneous_speed(
    prev: &KinematicState,
    center: na::Point2<f32>,
    scale: f32,
    gap: i64,
    fps: f32,
    max_speed: f32,
) -> f32 {
    let dt = gap as f32 / fps;
    if !(dt > 0.0) {
        return 0.0;
    }

    let pixels = na::distance(&prev.center, &center);
    let meters = (prev.scale + scale) / 2.0 * pixels;
    let kmh = meters / dt * MS_TO_KMH;

    if kmh.is_nan() {
        return 0.0;
    }

    kmh.clamp(0.0, max_speed)
}
