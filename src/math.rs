use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::bbox::{BBox, Ltrb};

/// Overlap ratio of two boxes, counting edge pixels as covered.
///
/// Degenerate inputs (non-positive area or union) yield 0.
pub fn intersection_over_union(a: &BBox<Ltrb>, b: &BBox<Ltrb>) -> f32 {
    let a_area = a.inclusive_area();
    let b_area = b.inclusive_area();
    if a_area <= 0.0 || b_area <= 0.0 {
        return 0.0;
    }

    let i_xmin = a.left().max(b.left());
    let i_ymin = a.top().max(b.top());
    let i_xmax = a.right().min(b.right());
    let i_ymax = a.bottom().min(b.bottom());
    let i_area = (i_xmax - i_xmin + 1.).max(0.) * (i_ymax - i_ymin + 1.).max(0.);

    let union = a_area + b_area - i_area;
    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }

    (i_area / union).clamp(0.0, 1.0)
}

/// Angle between two vectors in degrees, within [0, 180].
///
/// Returns 0 when either vector has no direction.
pub fn angle_between(v1: &na::Vector2<f32>, v2: &na::Vector2<f32>) -> f32 {
    let n1 = v1.norm();
    let n2 = v2.norm();
    if n1 == 0.0 || n2 == 0.0 {
        return 0.0;
    }

    let cos = (v1.dot(v2) / (n1 * n2)).clamp(-1.0, 1.0);

    cos.acos().to_degrees()
}

/// Meters per pixel for an object of known real-world extent.
#[inline]
pub fn calibrated_scale(extent_m: f32, height_px: f32) -> f32 {
    extent_m / height_px.max(1.0)
}

#[inline]
pub fn ema(prev: f32, sample: f32, alpha: f32) -> f32 {
    alpha * sample + (1.0 - alpha) * prev
}

/// Real-world vertical extent (meters) per object class.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClassExtents {
    #[serde(default = "ClassExtents::default_table")]
    pub table: HashMap<String, f32>,
    #[serde(default = "ClassExtents::default_extent")]
    pub default: f32,
}

impl ClassExtents {
    fn default_table() -> HashMap<String, f32> {
        [
            ("Truck", 10.2),
            ("SUV", 6.2),
            ("Sedan", 5.8),
            ("Microbus", 8.6),
            ("Minivan", 8.5),
            ("Bus", 9.8),
        ]
        .iter()
        .map(|&(k, v)| (k.to_string(), v))
        .collect()
    }

    fn default_extent() -> f32 {
        2.0
    }

    #[inline]
    pub fn extent(&self, class: &str) -> f32 {
        self.table.get(class).copied().unwrap_or(self.default)
    }

    #[inline]
    pub fn is_known(&self, class: &str) -> bool {
        self.table.contains_key(class)
    }

    /// Meters per pixel for `class` observed with the given box height.
    #[inline]
    pub fn scale(&self, class: &str, height_px: f32) -> f32 {
        calibrated_scale(self.extent(class), height_px)
    }
}

impl Default for ClassExtents {
    fn default() -> Self {
        Self {
            table: Self::default_table(),
            default: Self::default_extent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn b(x1: f32, y1: f32, x2: f32, y2: f32) -> BBox<Ltrb> {
        BBox::ltrb(x1, y1, x2, y2)
    }

    #[test]
    fn iou_is_symmetric() {
        let a = b(0., 0., 50., 50.);
        let c = b(25., 10., 90., 70.);

        assert_abs_diff_eq!(
            intersection_over_union(&a, &c),
            intersection_over_union(&c, &a)
        );
    }

    #[test]
    fn iou_of_box_with_itself_is_one() {
        let a = b(3., 4., 40., 80.);

        assert_abs_diff_eq!(intersection_over_union(&a, &a), 1.0);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = b(0., 0., 10., 10.);
        let c = b(20., 20., 30., 30.);

        assert_eq!(intersection_over_union(&a, &c), 0.0);
    }

    #[test]
    fn iou_counts_edge_pixels() {
        // 11x11 boxes sharing a single column of 11 pixels
        let a = b(0., 0., 10., 10.);
        let c = b(10., 0., 20., 10.);

        assert_abs_diff_eq!(intersection_over_union(&a, &c), 11.0 / 231.0, epsilon = 1e-6);
    }

    #[test]
    fn iou_of_degenerate_boxes_is_zero() {
        let inverted = b(10., 10., 0., 0.);
        let a = b(0., 0., 10., 10.);

        assert_eq!(intersection_over_union(&inverted, &a), 0.0);
    }

    #[test]
    fn angle_with_itself_is_zero() {
        let v = na::Vector2::new(3.0, -4.0);

        assert_abs_diff_eq!(angle_between(&v, &v), 0.0, epsilon = 1e-3);
    }

    #[test]
    fn angle_with_opposite_is_straight() {
        let v = na::Vector2::new(3.0, -4.0);

        assert_abs_diff_eq!(angle_between(&v, &-v), 180.0, epsilon = 1e-3);
    }

    #[test]
    fn angle_with_zero_vector_is_zero() {
        let v = na::Vector2::new(1.0, 2.0);
        let z = na::Vector2::zeros();

        assert_eq!(angle_between(&z, &v), 0.0);
        assert_eq!(angle_between(&v, &z), 0.0);
    }

    #[test]
    fn right_angle() {
        let v1 = na::Vector2::new(0.0, 20.0);
        let v2 = na::Vector2::new(20.0, 0.0);

        assert_abs_diff_eq!(angle_between(&v1, &v2), 90.0, epsilon = 1e-3);
    }

    #[test]
    fn scale_uses_class_extent() {
        let extents = ClassExtents::default();

        assert_abs_diff_eq!(extents.scale("Truck", 102.0), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(extents.scale("Bicycle", 20.0), 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(extents.scale("Sedan", 0.0), 5.8, epsilon = 1e-6);
    }

    #[test]
    fn ema_moves_toward_sample() {
        assert_abs_diff_eq!(ema(0.0, 100.0, 0.3), 30.0, epsilon = 1e-4);
        assert_abs_diff_eq!(ema(30.0, 100.0, 0.3), 51.0, epsilon = 1e-4);
    }
}
