use thiserror::Error;

use crate::pipeline::{PipelineState, Stage};

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid {name}: {value} (expected {range})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("{0:?} stage requires object detection to be enabled")]
    DetectionDisabled(Stage),

    #[error("cannot {action} pipeline in {state:?} state")]
    InvalidTransition {
        action: &'static str,
        state: PipelineState,
    },

    #[error("malformed detection: {0}")]
    MalformedDetection(String),

    #[error("detector error: {0}")]
    Detector(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid<V: ToString>(name: &'static str, value: V, range: &'static str) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            range,
        }
    }
}
