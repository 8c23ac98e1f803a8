//! Affine transforms and rays.
//!
//! Coordinates are y-down: positive y points toward the bottom of the frame,
//! so "above" in the combinators means smaller y. Transforms are `glam`
//! double-precision affines and compose by multiplication, outer transform
//! on the left.

use glam::{DAffine2, DVec2};

/// Crate-wide affine transform type.
pub type Affine = DAffine2;

/// Unit vector along +x (rightward).
pub const UNIT_X: DVec2 = DVec2::new(1.0, 0.0);

/// Unit vector along +y (downward).
pub const UNIT_Y: DVec2 = DVec2::new(0.0, 1.0);

pub const ORIGIN: DVec2 = DVec2::ZERO;

/// Translation by `offset`.
pub fn translation(offset: DVec2) -> Affine {
    Affine::from_translation(offset)
}

/// Counterclockwise rotation by `angle` radians (clockwise on screen,
/// since y points down).
pub fn rotation(angle: f64) -> Affine {
    Affine::from_angle(angle)
}

/// Uniform scale about the origin.
pub fn scaling(factor: f64) -> Affine {
    Affine::from_scale(DVec2::splat(factor))
}

/// Per-axis scale about the origin.
pub fn scaling_xy(x: f64, y: f64) -> Affine {
    Affine::from_scale(DVec2::new(x, y))
}

/// Shear parallel to the x axis.
pub fn shear_x(amount: f64) -> Affine {
    Affine::from_cols(DVec2::new(1.0, 0.0), DVec2::new(amount, 1.0), DVec2::ZERO)
}

/// Shear parallel to the y axis.
pub fn shear_y(amount: f64) -> Affine {
    Affine::from_cols(DVec2::new(1.0, amount), DVec2::new(0.0, 1.0), DVec2::ZERO)
}

/// Reflection across the y axis (x negates).
pub fn reflect_x() -> Affine {
    Affine::from_scale(DVec2::new(-1.0, 1.0))
}

/// Reflection across the x axis (y negates).
pub fn reflect_y() -> Affine {
    Affine::from_scale(DVec2::new(1.0, -1.0))
}

/// A parametric ray `origin + t * direction`.
///
/// `direction` is not required to be unit length; trace distances are
/// expressed in multiples of it, so pulling a ray back through an affine
/// transform preserves every parameter `t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec2,
    pub direction: DVec2,
}

impl Ray {
    pub fn new(origin: DVec2, direction: DVec2) -> Ray {
        Ray { origin, direction }
    }

    /// The point at parameter `t`.
    pub fn point_at(&self, t: f64) -> DVec2 {
        self.origin + t * self.direction
    }

    /// Map this ray into the local frame of `transform`.
    ///
    /// The origin is pulled back by the full inverse and the direction by
    /// the inverse linear part only, so intersection parameters computed in
    /// the local frame are valid in the outer frame unchanged.
    pub fn pullback(&self, transform: &Affine) -> Ray {
        let inv = transform.inverse();
        Ray {
            origin: inv.transform_point2(self.origin),
            direction: inv.transform_vector2(self.direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use glam::DVec2;

    use super::*;

    #[test]
    fn shear_x_slants_verticals() {
        let p = shear_x(2.0).transform_point2(DVec2::new(0.0, 1.0));
        assert_approx_eq!(f64, p.x, 2.0);
        assert_approx_eq!(f64, p.y, 1.0);
    }

    #[test]
    fn reflections_negate_one_axis() {
        let p = DVec2::new(3.0, 4.0);
        assert_eq!(reflect_x().transform_point2(p), DVec2::new(-3.0, 4.0));
        assert_eq!(reflect_y().transform_point2(p), DVec2::new(3.0, -4.0));
    }

    #[test]
    fn pullback_preserves_parameters() {
        // A ray hitting x = 4 at t = 2 must still report t = 2 after
        // pulling back through a scale-and-translate.
        let t = translation(DVec2::new(1.0, -2.0)) * scaling(2.0);
        let ray = Ray::new(ORIGIN, DVec2::new(2.0, 0.0));
        let local = ray.pullback(&t);
        let outer_hit = ray.point_at(2.0);
        let local_hit = local.point_at(2.0);
        let roundtrip = t.transform_point2(local_hit);
        assert_approx_eq!(f64, roundtrip.x, outer_hit.x);
        assert_approx_eq!(f64, roundtrip.y, outer_hit.y);
    }
}
