use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

use crate::math;

pub trait BBoxFormat: std::fmt::Debug + Copy {}

/// Left-top-right-bottom format, pixel corners (x1, y1, x2, y2)
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(from = "[f32; 4]", into = "[f32; 4]", bound = "")]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> From<[f32; 4]> for BBox<F> {
    fn from(raw: [f32; 4]) -> Self {
        BBox(raw, PhantomData)
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox([x1, y1, x2, y2], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    /// Box height in pixels, never below one so it can be used as a divisor.
    #[inline]
    pub fn height_px(&self) -> f32 {
        self.height().max(1.0)
    }

    #[inline]
    pub fn center(&self) -> na::Point2<f32> {
        na::Point2::new(
            (self.0[0] + self.0[2]) / 2.0,
            (self.0[1] + self.0[3]) / 2.0,
        )
    }

    /// Area counting both edge pixels, as used by the overlap ratio.
    #[inline]
    pub fn inclusive_area(&self) -> f32 {
        (self.width() + 1.0) * (self.height() + 1.0)
    }

    #[inline]
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        math::intersection_over_union(self, other)
    }
}
