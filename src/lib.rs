pub mod arena;
pub mod bbox;
pub mod circular_queue;
pub mod collision;
pub mod config;
pub mod dedup;
pub mod detection;
pub mod detector;
pub mod error;
pub mod exception;
pub mod flow;
pub mod frame;
pub mod math;
pub mod pipeline;
pub mod queue;
pub mod scene;
pub mod state;
pub mod stats;
pub mod track;
pub mod tracker;
pub mod trajectory;

pub use bbox::{BBox, Ltrb};
pub use config::{Config, Settings, SettingsUpdate};
pub use detection::{Detection, ObjectId, RawDetection};
pub use detector::Detector;
pub use error::Error;
pub use exception::Exception;
pub use frame::{AnnotatedFrame, Frame};
pub use pipeline::{FrameReceiver, FrameSender, Pipeline, PipelineState, Stage, Stages};
pub use scene::{FrameAnalysis, Scene};
pub use state::SharedState;
pub use stats::StatsSnapshot;
pub use track::Track;
