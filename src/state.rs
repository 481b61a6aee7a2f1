use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::config::{Config, Settings, SettingsUpdate};
use crate::detection::RawDetection;
use crate::error::Error;
use crate::pipeline::{Stage, Stages};
use crate::scene::{FrameAnalysis, Scene};
use crate::stats::StatsSnapshot;

/// Everything the control surface and the worker share
#[derive(Debug)]
pub struct Analytics {
    pub settings: Settings,
    pub stages: Stages,
    pub scene: Scene,
}

/// Single lock guarding settings, stage flags and all cross-frame state.
/// Cloning hands out another handle to the same state.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<Analytics>>,
}

impl SharedState {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Analytics {
                settings: config.settings,
                stages: Stages::default(),
                scene: Scene::new(config),
            })),
        }
    }

    #[inline]
    pub fn settings(&self) -> Settings {
        self.inner.lock().settings
    }

    /// Applies a partial settings change; on error nothing is modified.
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Settings, Error> {
        let mut guard = self.inner.lock();
        guard.settings.apply(update)?;

        Ok(guard.settings)
    }

    #[inline]
    pub fn stages(&self) -> Stages {
        self.inner.lock().stages
    }

    pub fn enable(&self, stage: Stage) -> Result<(), Error> {
        let mut guard = self.inner.lock();
        guard.stages.enable(stage)?;
        info!("{:?} stage enabled", stage);

        Ok(())
    }

    pub fn disable(&self, stage: Stage) {
        let mut guard = self.inner.lock();
        guard.stages.disable(stage);
        info!("{:?} stage disabled, active: {:?}", stage, guard.stages);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.inner.lock().scene.snapshot()
    }

    /// Clears all cross-frame analytics state; settings and stages stay.
    pub fn reset(&self) {
        self.inner.lock().scene.reset(Instant::now());
        info!("analytics state reset");
    }

    /// Runs `f` with exclusive access to the shared state.
    pub fn with<R>(&self, f: impl FnOnce(&mut Analytics) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Settings and stage flags to use for one whole processing cycle
    #[inline]
    pub(crate) fn cycle_params(&self) -> (Settings, Stages) {
        let guard = self.inner.lock();
        (guard.settings, guard.stages)
    }

    pub(crate) fn analyze(
        &self,
        index: i64,
        frame_height: u32,
        raw: Vec<RawDetection>,
        settings: &Settings,
        stages: Stages,
    ) -> FrameAnalysis {
        self.inner
            .lock()
            .scene
            .process(index, frame_height, raw, settings, stages, Instant::now())
    }
}
