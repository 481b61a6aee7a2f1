use serde_derive::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, trace};

use crate::config::{Config, Settings, SettingsUpdate};
use crate::detector::Detector;
use crate::error::Error;
use crate::frame::{AnnotatedFrame, Frame};
use crate::queue::DropOldestQueue;
use crate::state::SharedState;
use crate::stats::StatsSnapshot;

const PAUSE_POLL: Duration = Duration::from_millis(10);

/// Independently toggleable processing stage
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Detection,
    Speed,
    Exceptions,
}

/// Enabled stages. Speed and exception evaluation depend on detection.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stages {
    pub detection: bool,
    pub speed: bool,
    pub exceptions: bool,
}

impl Stages {
    pub fn enable(&mut self, stage: Stage) -> Result<(), Error> {
        match stage {
            Stage::Detection => self.detection = true,
            Stage::Speed | Stage::Exceptions if !self.detection => {
                return Err(Error::DetectionDisabled(stage))
            }
            Stage::Speed => self.speed = true,
            Stage::Exceptions => self.exceptions = true,
        }

        Ok(())
    }

    /// Disabling detection switches every stage off.
    pub fn disable(&mut self, stage: Stage) {
        match stage {
            Stage::Detection => *self = Stages::default(),
            Stage::Speed => self.speed = false,
            Stage::Exceptions => self.exceptions = false,
        }
    }

    #[inline]
    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Detection => self.detection,
            Stage::Speed => self.speed,
            Stage::Exceptions => self.exceptions,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Paused,
    Stopped,
}

/// Producer handle for the input queue
pub struct FrameSender<I> {
    queue: DropOldestQueue<Frame<I>>,
}

impl<I> Clone for FrameSender<I> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<I> FrameSender<I> {
    /// Queues a frame without blocking. Returns false when an older frame
    /// had to be dropped to make room.
    pub fn push(&self, frame: Frame<I>) -> bool {
        match self.queue.push(frame) {
            Some(dropped) => {
                trace!("input queue full, dropped frame {}", dropped.index);
                false
            }
            None => true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Consumer handle for annotated output frames
pub struct FrameReceiver<I> {
    queue: DropOldestQueue<AnnotatedFrame<I>>,
}

impl<I> Clone for FrameReceiver<I> {
    fn clone(&self) -> Self {
        Self {
            queue: self.queue.clone(),
        }
    }
}

impl<I> FrameReceiver<I> {
    #[inline]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<AnnotatedFrame<I>> {
        self.queue.pop_timeout(timeout)
    }

    #[inline]
    pub fn try_recv(&self) -> Option<AnnotatedFrame<I>> {
        self.queue.try_pop()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

struct Worker<I, D> {
    shared: SharedState,
    input: DropOldestQueue<Frame<I>>,
    output: DropOldestQueue<AnnotatedFrame<I>>,
    detector: D,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    pop_timeout: Duration,
}

impl<I, D: Detector<I>> Worker<I, D> {
    fn run(mut self) {
        info!("analytics worker started");

        while self.running.load(Ordering::Acquire) {
            if self.paused.load(Ordering::Acquire) {
                thread::sleep(PAUSE_POLL);
                continue;
            }

            let frame = match self.input.pop_timeout(self.pop_timeout) {
                Some(frame) => frame,
                None => continue,
            };

            let index = frame.index;
            match panic::catch_unwind(AssertUnwindSafe(|| self.process(frame))) {
                Ok(Ok(out)) => {
                    if let Some(dropped) = self.output.push(out) {
                        trace!("output queue full, dropped frame {}", dropped.index);
                    }
                }
                Ok(Err(err)) => error!("frame {}: {}", index, err),
                Err(_) => error!("frame {}: analytics panicked, skipping", index),
            }
        }

        info!("analytics worker stopped");
    }

    fn process(&mut self, frame: Frame<I>) -> Result<AnnotatedFrame<I>, Error> {
        let (settings, stages) = self.shared.cycle_params();

        let raw = if stages.detection {
            self.detector.detect(&frame.image, &settings)?
        } else {
            Vec::new()
        };

        let analysis = self
            .shared
            .analyze(frame.index, frame.height, raw, &settings, stages);

        debug!(
            "frame {}: {} objects, flow {:?}",
            frame.index,
            analysis.tracks.len(),
            analysis.flow_rate
        );

        Ok(AnnotatedFrame {
            image: frame.image,
            index: frame.index,
            tracks: analysis.tracks,
            line_y: analysis.line_y,
            flow_rate: analysis.flow_rate,
        })
    }
}

/// Orchestrator: owns the queues, the shared analytics state and the
/// worker thread that drives them.
pub struct Pipeline<I, D> {
    shared: SharedState,
    input: DropOldestQueue<Frame<I>>,
    output: DropOldestQueue<AnnotatedFrame<I>>,
    detector: Option<D>,
    state: PipelineState,
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    pop_timeout: Duration,
    worker: Option<JoinHandle<()>>,
}

impl<I, D> Pipeline<I, D>
where
    I: Send + 'static,
    D: Detector<I> + 'static,
{
    pub fn new(config: Config, detector: D) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            shared: SharedState::new(&config),
            input: DropOldestQueue::new(config.input_capacity),
            output: DropOldestQueue::new(config.output_capacity),
            detector: Some(detector),
            state: PipelineState::Idle,
            running: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            pop_timeout: config.pop_timeout(),
            worker: None,
        })
    }

    #[inline]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn sender(&self) -> FrameSender<I> {
        FrameSender {
            queue: self.input.clone(),
        }
    }

    pub fn receiver(&self) -> FrameReceiver<I> {
        FrameReceiver {
            queue: self.output.clone(),
        }
    }

    /// Handle to the state shared with the worker, for display layers.
    pub fn shared(&self) -> SharedState {
        self.shared.clone()
    }

    fn transition(&mut self, action: &'static str, next: PipelineState) {
        info!("pipeline {}: {:?} -> {:?}", action, self.state, next);
        self.state = next;
    }

    fn invalid(&self, action: &'static str) -> Error {
        Error::InvalidTransition {
            action,
            state: self.state,
        }
    }

    pub fn start(&mut self) -> Result<(), Error> {
        if self.state != PipelineState::Idle {
            return Err(self.invalid("start"));
        }

        let detector = self.detector.take().ok_or_else(|| self.invalid("start"))?;

        self.running.store(true, Ordering::Release);
        self.paused.store(false, Ordering::Release);

        let worker = Worker {
            shared: self.shared.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
            detector,
            running: self.running.clone(),
            paused: self.paused.clone(),
            pop_timeout: self.pop_timeout,
        };

        let handle = thread::Builder::new()
            .name("qflow-worker".to_string())
            .spawn(move || worker.run());

        match handle {
            Ok(handle) => self.worker = Some(handle),
            Err(err) => {
                self.running.store(false, Ordering::Release);
                return Err(Error::Spawn(err));
            }
        }

        self.transition("start", PipelineState::Running);

        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), Error> {
        if self.state != PipelineState::Running {
            return Err(self.invalid("pause"));
        }

        self.paused.store(true, Ordering::Release);
        self.transition("pause", PipelineState::Paused);

        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), Error> {
        if self.state != PipelineState::Paused {
            return Err(self.invalid("resume"));
        }

        self.paused.store(false, Ordering::Release);
        self.transition("resume", PipelineState::Running);

        Ok(())
    }

    /// Stops the worker and waits for it. Terminal.
    pub fn stop(&mut self) -> Result<(), Error> {
        if self.state == PipelineState::Stopped {
            return Err(self.invalid("stop"));
        }

        self.shutdown();
        self.transition("stop", PipelineState::Stopped);

        Ok(())
    }

    #[inline]
    pub fn settings(&self) -> Settings {
        self.shared.settings()
    }

    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Settings, Error> {
        self.shared.update_settings(update)
    }

    #[inline]
    pub fn stages(&self) -> Stages {
        self.shared.stages()
    }

    pub fn enable(&self, stage: Stage) -> Result<(), Error> {
        self.shared.enable(stage)
    }

    pub fn disable(&self, stage: Stage) {
        self.shared.disable(stage)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.shared.snapshot()
    }

    /// Forgets all cross-frame state and drops queued frames, e.g. when a
    /// new video source is loaded. Configuration is kept.
    pub fn reset(&self) {
        let dropped = self.input.clear() + self.output.clear();
        if dropped > 0 {
            debug!("reset dropped {} queued frames", dropped);
        }

        self.shared.reset();
    }

    #[inline]
    pub fn next_output(&self, timeout: Duration) -> Option<AnnotatedFrame<I>> {
        self.output.pop_timeout(timeout)
    }

    #[inline]
    pub fn try_next_output(&self) -> Option<AnnotatedFrame<I>> {
        self.output.try_pop()
    }
}

impl<I, D> Pipeline<I, D> {
    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("analytics worker terminated abnormally");
            }
        }
    }
}

impl<I, D> Drop for Pipeline<I, D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
