use serde_derive::Serialize;
use std::collections::BTreeMap;

use crate::arena::ObjectTable;
use crate::circular_queue::CircularQueue;
use crate::config::Config;
use crate::detection::ObjectId;
use crate::error::Error;

/// Bin count used by the display layer's speed distribution
pub const SPEED_HISTOGRAM_BINS: usize = 20;

/// Aggregate counters fed by the pipeline and read by the display layer
#[derive(Debug)]
pub struct Statistics {
    class_counts: BTreeMap<String, u64>,
    counted: ObjectTable<()>,
    speed_samples: CircularQueue<f32>,
}

impl Statistics {
    pub fn new(config: &Config) -> Self {
        Self {
            class_counts: Self::empty_counts(config),
            counted: ObjectTable::new(),
            speed_samples: CircularQueue::with_capacity(config.speed_sample_capacity),
        }
    }

    fn empty_counts(config: &Config) -> BTreeMap<String, u64> {
        config
            .extents
            .table
            .keys()
            .map(|k| (k.clone(), 0))
            .collect()
    }

    /// Counts the object under its class the first time it is seen.
    pub fn record_sighting(&mut self, id: ObjectId, class: &str, frame: i64) {
        let mut fresh = false;
        self.counted.get_or_insert_with(id, frame, || fresh = true);

        if fresh {
            *self.class_counts.entry(class.to_string()).or_insert(0) += 1;
        }
    }

    #[inline]
    pub fn record_speed(&mut self, speed: f32) {
        self.speed_samples.push(speed);
    }

    pub fn evict_stale(&mut self, frame: i64, max_age: i64) -> usize {
        self.counted.evict_stale(frame, max_age)
    }

    pub fn clear(&mut self) {
        self.class_counts.values_mut().for_each(|c| *c = 0);
        self.counted.clear();
        self.speed_samples.clear();
    }

    pub fn snapshot(&self, flow_rate: f32, flow_history: Vec<f32>) -> StatsSnapshot {
        StatsSnapshot {
            flow_rate,
            flow_history,
            class_counts: self.class_counts.clone(),
            speed_samples: self.speed_samples.to_vec(),
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub lo: f32,
    pub hi: f32,
    pub percent: f32,
}

/// Consistent copy of the statistics taken under the shared lock
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub flow_rate: f32,
    pub flow_history: Vec<f32>,
    pub class_counts: BTreeMap<String, u64>,
    pub speed_samples: Vec<f32>,
}

impl StatsSnapshot {
    /// `(window number, rate)` pairs, windows numbered from 1
    pub fn flow_series(&self) -> Vec<(usize, f32)> {
        self.flow_history
            .iter()
            .enumerate()
            .map(|(i, r)| (i + 1, *r))
            .collect()
    }

    /// Distribution of strictly positive speed samples over `bins` equal
    /// bins spanning the observed range, as percentages.
    pub fn speed_histogram(&self, bins: usize) -> Vec<HistogramBin> {
        let speeds: Vec<f32> = self
            .speed_samples
            .iter()
            .copied()
            .filter(|s| *s > 0.0)
            .collect();

        if speeds.is_empty() || bins == 0 {
            return Vec::new();
        }

        let mut lo = speeds.iter().copied().fold(f32::INFINITY, f32::min);
        let mut hi = speeds.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if hi - lo <= f32::EPSILON {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f32;
        let mut counts = vec![0usize; bins];
        for s in &speeds {
            let idx = (((s - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }

        let total = speeds.len() as f32;
        counts
            .into_iter()
            .enumerate()
            .map(|(i, c)| HistogramBin {
                lo: lo + width * i as f32,
                hi: lo + width * (i + 1) as f32,
                percent: c as f32 / total * 100.0,
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}
