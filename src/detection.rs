use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::fmt;

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;

/// Object identity. Tracker-assigned and locally minted identities live in
/// disjoint namespaces so a tracker reset can never alias a minted one.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectId {
    Tracked(u32),
    Minted(u32),
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Tracked(id) => write!(f, "{}", id),
            ObjectId::Minted(id) => write!(f, "m{}", id),
        }
    }
}

/// Mints identities for detections the tracker could not assign.
#[derive(Debug, Default)]
pub struct IdentityMinter {
    last: u32,
}

impl IdentityMinter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn mint(&mut self) -> ObjectId {
        self.last = self.last.wrapping_add(1);

        ObjectId::Minted(self.last)
    }
}

/// Detection as reported by the external detector/tracker
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub id: Option<u32>,
    #[serde(rename = "c")]
    pub class: String,
    #[serde(rename = "p")]
    pub confidence: f32,
    pub bbox: BBox<Ltrb>,
}

impl RawDetection {
    pub fn new(id: Option<u32>, class: &str, confidence: f32, bbox: BBox<Ltrb>) -> Self {
        Self {
            id,
            class: class.to_string(),
            confidence,
            bbox,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if !self.bbox.is_finite() || !self.confidence.is_finite() {
            return Err(Error::MalformedDetection(format!(
                "non-finite values in {:?}",
                self
            )));
        }

        if self.bbox.width() < 0.0 || self.bbox.height() < 0.0 {
            return Err(Error::MalformedDetection(format!(
                "inverted box {:?}",
                self.bbox.as_slice()
            )));
        }

        Ok(())
    }
}

/// Validated detection with a resolved identity, lives for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub id: ObjectId,
    pub class: String,
    pub confidence: f32,
    pub bbox: BBox<Ltrb>,
}

impl Detection {
    pub fn from_raw(raw: RawDetection, minter: &mut IdentityMinter) -> Result<Self, Error> {
        raw.validate()?;

        let id = match raw.id {
            Some(id) => ObjectId::Tracked(id),
            None => minter.mint(),
        };

        Ok(Self {
            id,
            class: raw.class,
            confidence: raw.confidence,
            bbox: raw.bbox,
        })
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f32> {
        self.bbox.center()
    }

    #[inline(always)]
    pub fn height_px(&self) -> f32 {
        self.bbox.height_px()
    }

    #[inline]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_identity_is_minted_in_own_namespace() {
        let mut minter = IdentityMinter::new();
        let bbox = BBox::ltrb(0., 0., 10., 10.);

        let a = Detection::from_raw(RawDetection::new(None, "SUV", 0.9, bbox), &mut minter).unwrap();
        let b = Detection::from_raw(RawDetection::new(None, "SUV", 0.9, bbox), &mut minter).unwrap();
        let c = Detection::from_raw(RawDetection::new(Some(1), "SUV", 0.9, bbox), &mut minter).unwrap();

        assert_eq!(a.id, ObjectId::Minted(1));
        assert_eq!(b.id, ObjectId::Minted(2));
        assert_eq!(c.id, ObjectId::Tracked(1));
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn malformed_boxes_are_rejected() {
        let mut minter = IdentityMinter::new();

        let inverted = RawDetection::new(Some(1), "Bus", 0.5, BBox::ltrb(10., 10., 0., 0.));
        let nan = RawDetection::new(Some(2), "Bus", 0.5, BBox::ltrb(f32::NAN, 0., 1., 1.));

        assert!(matches!(
            Detection::from_raw(inverted, &mut minter),
            Err(Error::MalformedDetection(_))
        ));
        assert!(Detection::from_raw(nan, &mut minter).is_err());
    }

    #[test]
    fn identity_display() {
        assert_eq!(ObjectId::Tracked(7).to_string(), "7");
        assert_eq!(ObjectId::Minted(3).to_string(), "m3");
    }
}
