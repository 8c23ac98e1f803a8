//! Trace queries.
//!
//! The trace of a diagram answers ray probes: for a ray `p + t·v`, the
//! sorted list of parameters `t` at which the ray crosses the diagram's
//! boundary, per batch element. Snug placement uses the nearest
//! non-negative crossing to butt diagrams against each other's actual
//! outline instead of the convex envelope.
//!
//! Rays are pulled back into each primitive's local frame; because the
//! direction is pulled back by the linear part only, parameters computed
//! locally are valid in the outer frame unchanged.

use glam::DVec2;

use crate::batch::Batched;
use crate::diagram::{Diagram, Node};
use crate::errors::Result;
use crate::transform::{Affine, Ray};

/// Parameters slightly below zero still count as hits; placement probes
/// start exactly on the boundary often enough that exact zero is fragile.
const NEAR_ZERO: f64 = 1e-9;

fn merge_sorted(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] <= b[j] {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Sorted ray parameters per batch element. An empty lane is a miss.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceDistances(Batched<Vec<f64>>);

impl TraceDistances {
    /// Wrap per-element parameter lists. Each lane must already be sorted
    /// ascending.
    pub fn new(lanes: Batched<Vec<f64>>) -> TraceDistances {
        TraceDistances(lanes)
    }

    pub fn lanes(&self) -> &Batched<Vec<f64>> {
        &self.0
    }

    /// Combine two traces of the same probe, element by element.
    pub fn merge(&self, other: &TraceDistances) -> Result<TraceDistances> {
        Ok(TraceDistances(
            self.0.zip_with(&other.0, |a, b| merge_sorted(a, b))?,
        ))
    }

    /// Fold the trailing batch axis by merging lanes.
    pub fn reduce_axis(&self) -> Result<TraceDistances> {
        Ok(TraceDistances(
            self.0.reduce_last(|a, b| merge_sorted(&a, &b))?,
        ))
    }

    /// The smallest non-negative parameter per element, plus a validity
    /// mask. Masked-out entries hold 0.0 and must not be used.
    pub fn nearest(&self) -> (Batched<f64>, Batched<bool>) {
        let values = self.0.map(|lane| {
            lane.iter()
                .copied()
                .find(|&t| t >= -NEAR_ZERO)
                .unwrap_or(0.0)
        });
        let mask = self.0.map(|lane| lane.iter().any(|&t| t >= -NEAR_ZERO));
        (values, mask)
    }
}

fn visit(diagram: &Diagram, ambient: &Batched<Affine>, ray: Ray) -> Result<TraceDistances> {
    match diagram.node() {
        Node::Empty => Ok(TraceDistances(Batched::scalar(Vec::new()))),
        Node::Primitive(prim) => {
            let total = ambient.zip_with(&prim.transform, |a, b| *a * *b)?;
            let local = total.map(|t| ray.pullback(t));
            prim.shape.trace(&local)
        }
        Node::ApplyTransform { transform, child } => {
            let ambient = ambient.zip_with(transform, |a, b| *a * *b)?;
            visit(child, &ambient, ray)
        }
        // Declared bounds only override the envelope; rays keep probing
        // the drawn content.
        Node::ApplyStyle { child, .. } => visit(child, ambient, ray),
        Node::Compose { left, right } => {
            let l = visit(left, ambient, ray)?;
            let r = visit(right, ambient, ray)?;
            l.merge(&r)
        }
        Node::ComposeAxis { child } => {
            let ambient = ambient.add_trailing_axis();
            visit(child, &ambient, ray)?.reduce_axis()
        }
    }
}

/// Trace query handle over a diagram.
#[derive(Debug, Clone, Copy)]
pub struct Trace<'a> {
    diagram: &'a Diagram,
}

impl Diagram {
    pub fn trace(&self) -> Trace<'_> {
        Trace { diagram: self }
    }
}

impl Trace<'_> {
    /// All boundary crossings of the ray `point + t·v`, sorted, per batch
    /// element.
    pub fn distances(&self, point: DVec2, v: DVec2) -> Result<TraceDistances> {
        let ambient = Batched::filled(Affine::IDENTITY, self.diagram.size());
        visit(self.diagram, &ambient, Ray::new(point, v))
    }

    /// Nearest forward crossing per element, with a hit mask.
    pub fn nearest(&self, point: DVec2, v: DVec2) -> Result<(Batched<f64>, Batched<bool>)> {
        Ok(self.distances(point, v)?.nearest())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::shapes::{circle, square};
    use crate::transform::{ORIGIN, UNIT_X};

    #[test]
    fn circle_trace_from_center() {
        let d = circle(2.0);
        let (t, mask) = d.trace().nearest(ORIGIN, UNIT_X).unwrap();
        assert!(mask.values()[0]);
        assert_approx_eq!(f64, t.values()[0], 2.0);
    }

    #[test]
    fn translated_square_preserves_parameters() {
        let d = square(2.0).translate(5.0, 0.0);
        let (t, mask) = d.trace().nearest(ORIGIN, UNIT_X).unwrap();
        assert!(mask.values()[0]);
        assert_approx_eq!(f64, t.values()[0], 4.0);
    }

    #[test]
    fn miss_reports_false_mask() {
        let d = square(1.0).translate(0.0, 10.0);
        let (_, mask) = d.trace().nearest(ORIGIN, UNIT_X).unwrap();
        assert!(!mask.values()[0]);
    }

    #[test]
    fn compose_merges_crossings() {
        let d = square(2.0).atop(&square(4.0)).unwrap();
        let all = d.trace().distances(ORIGIN, UNIT_X).unwrap();
        let lane = &all.lanes().values()[0];
        assert_eq!(lane.len(), 4);
        assert_approx_eq!(f64, lane[0], -2.0);
        assert_approx_eq!(f64, lane[1], -1.0);
        assert_approx_eq!(f64, lane[2], 1.0);
        assert_approx_eq!(f64, lane[3], 2.0);
    }

    #[test]
    fn declared_bounds_do_not_affect_trace() {
        let d = square(2.0).with_envelope(&square(10.0)).unwrap();
        let (t, mask) = d.trace().nearest(ORIGIN, UNIT_X).unwrap();
        assert!(mask.values()[0]);
        assert_approx_eq!(f64, t.values()[0], 1.0);
    }

    #[test]
    fn scaled_ray_parameters_stay_in_outer_units() {
        // Scaling the diagram scales the hit distance in world terms, but
        // the parameter is measured in multiples of the probe direction.
        let d = circle(1.0).scale(3.0);
        let (t, _) = d.trace().nearest(ORIGIN, UNIT_X).unwrap();
        assert_approx_eq!(f64, t.values()[0], 3.0);
    }
}
