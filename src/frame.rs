use crate::track::Track;

/// Input frame: an opaque image plus its source index and dimensions
pub struct Frame<I> {
    pub image: I,
    pub index: i64,
    pub width: u32,
    pub height: u32,
}

impl<I> Frame<I> {
    pub fn new(image: I, index: i64, width: u32, height: u32) -> Self {
        Self {
            image,
            index,
            width,
            height,
        }
    }
}

/// Output of one processing cycle
pub struct AnnotatedFrame<I> {
    pub image: I,
    pub index: i64,
    pub tracks: Vec<Track>,
    /// Counting line, when detection is on
    pub line_y: Option<f32>,
    /// veh/h per lane, when detection is on
    pub flow_rate: Option<f32>,
}

impl<I> AnnotatedFrame<I> {
    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn flow_label(&self) -> Option<String> {
        self.flow_rate
            .map(|rate| format!("Traffic Flow: {:.2} veh/h", rate))
    }
}
