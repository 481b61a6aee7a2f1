use crate::config::Settings;
use crate::detection::RawDetection;
use crate::error::Error;

/// Source of per-frame detections for an opaque image type `I`.
///
/// Implementations wrap an external detector/tracker. Identities, when
/// present, must be stable across frames for the same physical object.
pub trait Detector<I>: Send {
    fn detect(&mut self, image: &I, settings: &Settings) -> Result<Vec<RawDetection>, Error>;
}

impl<I, F> Detector<I> for F
where
    F: FnMut(&I, &Settings) -> Result<Vec<RawDetection>, Error> + Send,
{
    #[inline]
    fn detect(&mut self, image: &I, settings: &Settings) -> Result<Vec<RawDetection>, Error> {
        self(image, settings)
    }
}

/// Detector for sources that already carry their detections, e.g. replayed
/// tracker output: the image *is* the detection list.
#[derive(Debug, Default, Clone, Copy)]
pub struct Precomputed;

impl Detector<Vec<RawDetection>> for Precomputed {
    fn detect(
        &mut self,
        image: &Vec<RawDetection>,
        _settings: &Settings,
    ) -> Result<Vec<RawDetection>, Error> {
        Ok(image.clone())
    }
}

/// Parses one frame of detections from JSON, in the compact form
/// `[{"id": 3, "c": "Sedan", "p": 0.91, "bbox": [l, t, r, b]}, ...]`.
pub fn parse_detections(json: &str) -> Result<Vec<RawDetection>, Error> {
    Ok(serde_json::from_str(json)?)
}
