use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::detection::ObjectId;

/// Anomaly raised for an object in a frame. Variants are declared in
/// ascending priority, so `Ord` picks the winner.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Exception {
    Speeding,
    Trajectory,
    Collision,
}

impl Exception {
    #[inline]
    pub fn priority(&self) -> u8 {
        match self {
            Exception::Speeding => 1,
            Exception::Trajectory => 2,
            Exception::Collision => 3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Exception::Speeding => "Speeding Exception",
            Exception::Trajectory => "Trajectory Exception",
            Exception::Collision => "Collision Exception",
        }
    }

    /// Overlay color, BGR
    pub fn color(&self) -> [u8; 3] {
        match self {
            Exception::Speeding => [0, 0, 255],
            Exception::Trajectory => [255, 0, 255],
            Exception::Collision => [0, 255, 255],
        }
    }
}

/// Collects the conditions raised during one frame and keeps the highest
/// priority one per object.
#[derive(Debug, Default)]
pub struct ExceptionResolver {
    winners: HashMap<ObjectId, Exception>,
}

impl ExceptionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&mut self, id: ObjectId, exception: Exception) {
        self.winners
            .entry(id)
            .and_modify(|e| *e = (*e).max(exception))
            .or_insert(exception);
    }

    #[inline]
    pub fn get(&self, id: &ObjectId) -> Option<Exception> {
        self.winners.get(id).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.winners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.winners.is_empty()
    }

    pub fn into_map(self) -> HashMap<ObjectId, Exception> {
        self.winners
    }
}
