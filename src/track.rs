use serde_derive::Serialize;

use crate::bbox::{BBox, Ltrb};
use crate::detection::{Detection, ObjectId};
use crate::exception::Exception;

const NORMAL_COLOR: [u8; 3] = [255, 0, 0];

/// Annotated object in an output frame
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: ObjectId,
    pub class: String,
    pub confidence: f32,
    pub bbox: BBox<Ltrb>,

    // smoothed, km/h; only when speed tracking is on
    pub speed: Option<f32>,

    // only when exception evaluation is on
    pub exception: Option<Exception>,
}

impl Track {
    pub fn new(det: Detection, speed: Option<f32>, exception: Option<Exception>) -> Self {
        Self {
            track_id: det.id,
            class: det.class,
            confidence: det.confidence,
            bbox: det.bbox,
            speed,
            exception,
        }
    }

    pub fn label(&self) -> String {
        match self.speed {
            Some(speed) => format!(
                "ID:{} {} Speed:{:.2} km/h",
                self.track_id, self.class, speed
            ),
            None => format!("ID:{} {}", self.track_id, self.class),
        }
    }

    #[inline]
    pub fn status_label(&self) -> Option<&'static str> {
        self.exception.map(|e| e.label())
    }

    /// Box color, BGR
    #[inline]
    pub fn color(&self) -> [u8; 3] {
        self.exception.map_or(NORMAL_COLOR, |e| e.color())
    }
}
