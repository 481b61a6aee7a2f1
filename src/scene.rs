use std::time::Instant;
use tracing::{debug, warn};

use crate::collision::CollisionDetector;
use crate::config::{Config, Settings};
use crate::dedup;
use crate::detection::{Detection, IdentityMinter, RawDetection};
use crate::exception::{Exception, ExceptionResolver};
use crate::flow::FlowRateEstimator;
use crate::pipeline::Stages;
use crate::stats::{Statistics, StatsSnapshot};
use crate::track::Track;
use crate::tracker::KinematicTracker;
use crate::trajectory::TrajectoryDetector;

/// Analytics results for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAnalysis {
    pub tracks: Vec<Track>,
    pub line_y: Option<f32>,
    pub flow_rate: Option<f32>,
}

/// All cross-frame analytics state, driven one frame at a time
#[derive(Debug)]
pub struct Scene {
    minter: IdentityMinter,
    tracker: KinematicTracker,
    trajectories: TrajectoryDetector,
    collisions: CollisionDetector,
    flow: FlowRateEstimator,
    stats: Statistics,
    dedup_iou: f32,
    max_idle_frames: i64,
}

impl Scene {
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Instant::now())
    }

    pub fn with_clock(config: &Config, now: Instant) -> Self {
        Self {
            minter: IdentityMinter::new(),
            tracker: KinematicTracker::new(config),
            trajectories: TrajectoryDetector::new(config),
            collisions: CollisionDetector::new(config),
            flow: FlowRateEstimator::new(config, now),
            stats: Statistics::new(config),
            dedup_iou: config.dedup_iou,
            max_idle_frames: config.max_idle_frames,
        }
    }

    fn accept(&mut self, raw: Vec<RawDetection>, settings: &Settings) -> Vec<Detection> {
        let mut detections = Vec::with_capacity(raw.len());

        for r in raw {
            if r.confidence < settings.confidence_threshold {
                continue;
            }

            match Detection::from_raw(r, &mut self.minter) {
                Ok(det) => detections.push(det),
                Err(err) => warn!("dropping detection: {}", err),
            }
        }

        dedup::deduplicate(detections, self.dedup_iou)
    }

    /// Runs the full analytics sequence over one frame's detections.
    ///
    /// `settings` and `stages` are the values captured for this cycle; `now`
    /// drives the flow-rate windows.
    pub fn process(
        &mut self,
        index: i64,
        frame_height: u32,
        raw: Vec<RawDetection>,
        settings: &Settings,
        stages: Stages,
        now: Instant,
    ) -> FrameAnalysis {
        if !stages.detection {
            return FrameAnalysis::default();
        }

        let detections = self.accept(raw, settings);

        let mut resolver = ExceptionResolver::new();
        let mut speeds = Vec::with_capacity(detections.len());

        for det in &detections {
            self.trajectories.record(det.id, det.center(), index);
            self.stats.record_sighting(det.id, &det.class, index);

            // kinematics must stay current even when speed is not shown
            let speed = self.tracker.update(det, index);
            speeds.push(speed);

            if stages.speed {
                self.stats.record_speed(speed);

                if speed > settings.speed_threshold {
                    debug!("object {} speeding at {:.2} km/h", det.id, speed);
                    resolver.raise(det.id, Exception::Speeding);
                }
            }

            if stages.exceptions
                && self
                    .trajectories
                    .evaluate(det.id, index, settings.angle_threshold)
                    .is_some()
            {
                resolver.raise(det.id, Exception::Trajectory);
            }
        }

        for c in self
            .collisions
            .evaluate(&detections, index, settings.iou_threshold)
        {
            resolver.raise(c.a, Exception::Collision);
            resolver.raise(c.b, Exception::Collision);
        }

        let line_y = self.flow.line_y(frame_height);
        for det in &detections {
            self.flow.observe(det.id, det.center().y, line_y, index);
        }
        self.flow.tick(now, settings.lanes, !detections.is_empty());

        self.evict_stale(index);

        let tracks = detections
            .into_iter()
            .zip(speeds)
            .map(|(det, speed)| {
                let exception = if stages.exceptions {
                    resolver.get(&det.id)
                } else {
                    None
                };

                Track::new(det, stages.speed.then(|| speed), exception)
            })
            .collect();

        FrameAnalysis {
            tracks,
            line_y: Some(line_y),
            flow_rate: Some(self.flow.current_rate()),
        }
    }

    fn evict_stale(&mut self, index: i64) {
        let max_age = self.max_idle_frames;
        let evicted = self.tracker.evict_stale(index, max_age)
            + self.trajectories.evict_stale(index, max_age)
            + self.collisions.evict_stale(index, max_age)
            + self.flow.evict_stale(index, max_age)
            + self.stats.evict_stale(index, max_age);

        if evicted > 0 {
            debug!("frame {}: evicted {} stale entries", index, evicted);
        }
    }

    #[inline]
    pub fn tracker(&self) -> &KinematicTracker {
        &self.tracker
    }

    #[inline]
    pub fn flow(&self) -> &FlowRateEstimator {
        &self.flow
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats
            .snapshot(self.flow.current_rate(), self.flow.history())
    }

    /// Forgets all per-object state and statistics. Minted identities keep
    /// counting up so they are never reused within a run.
    pub fn reset(&mut self, now: Instant) {
        self.tracker.clear();
        self.trajectories.clear();
        self.collisions.clear();
        self.flow.reset(now);
        self.stats.clear();
    }
}
