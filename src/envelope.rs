//! Envelope queries.
//!
//! The envelope of a diagram is its directional support function: for a
//! query direction `v`, the largest `(p · v) / (v · v)` over all points `p`
//! of the diagram's convex bound, one value per batch element. Placement
//! combinators use it to answer "how far does this diagram extend along
//! `v`, in multiples of `v`".
//!
//! Envelopes are computed fresh per query by one recursive pass over the
//! tree with the ambient transform accumulated top-down. An empty diagram
//! has no envelope; that is the monoid identity internally and surfaces as
//! [`Error::EnvelopeUndefined`] from the public API.

use std::rc::Rc;

use glam::DVec2;

use crate::batch::Batched;
use crate::diagram::{Diagram, Node};
use crate::errors::{Error, Result};
use crate::shapes::BoxShape;
use crate::transform::{Affine, UNIT_X, UNIT_Y};

const DEGENERATE: f64 = 1e-12;

/// For an affine `T = (A, b)` wrapping content with support `env_S`, the
/// wrapped support is
/// `env_T(v) = env_S(Aᵀv) · |Aᵀv|² / |v|² + (b · v) / |v|²`.
/// When `Aᵀv` vanishes (the content is flattened along `v`) only the
/// translation term remains.
fn visit(diagram: &Diagram, ambient: &Batched<Affine>, v: DVec2) -> Result<Option<Batched<f64>>> {
    match diagram.node() {
        Node::Empty => Ok(None),
        Node::Primitive(prim) => {
            let total = ambient.zip_with(&prim.transform, |a, b| *a * *b)?;
            let pulled = total.map(|t| t.matrix2.transpose() * v);
            // Degenerate directions get a placeholder so the shape query
            // stays finite; the combine step below discards those lanes.
            let safe = pulled.map(|u| {
                if u.length_squared() < DEGENERATE {
                    UNIT_X
                } else {
                    *u
                }
            });
            let inner = prim.shape.envelope(&safe)?;
            let out = inner.zip_with(&total, |env_u, t| {
                let u = t.matrix2.transpose() * v;
                let vv = v.length_squared();
                let shift = t.translation.dot(v) / vv;
                let uu = u.length_squared();
                if uu < DEGENERATE {
                    shift
                } else {
                    env_u * uu / vv + shift
                }
            })?;
            Ok(Some(out))
        }
        Node::ApplyTransform { transform, child } => {
            let ambient = ambient.zip_with(transform, |a, b| *a * *b)?;
            visit(child, &ambient, v)
        }
        Node::ApplyStyle { style, child } => match &style.bounds {
            Some(bounds) => visit(bounds, ambient, v),
            None => visit(child, ambient, v),
        },
        Node::Compose { left, right } => {
            let l = visit(left, ambient, v)?;
            let r = visit(right, ambient, v)?;
            match (l, r) {
                (Some(l), Some(r)) => Ok(Some(l.zip_with(&r, |a, b| a.max(*b))?)),
                (Some(one), None) | (None, Some(one)) => Ok(Some(one)),
                (None, None) => Ok(None),
            }
        }
        Node::ComposeAxis { child } => {
            let ambient = ambient.add_trailing_axis();
            match visit(child, &ambient, v)? {
                Some(env) => Ok(Some(env.reduce_last(f64::max)?)),
                None => Ok(None),
            }
        }
    }
}

/// Envelope query handle over a diagram.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    diagram: &'a Diagram,
}

impl Diagram {
    pub fn envelope(&self) -> Envelope<'_> {
        Envelope { diagram: self }
    }
}

impl Envelope<'_> {
    /// Signed extent along `v`, in multiples of `v`, per batch element.
    pub fn at(&self, v: DVec2) -> Result<Batched<f64>> {
        let ambient = Batched::filled(Affine::IDENTITY, self.diagram.size());
        visit(self.diagram, &ambient, v)?.ok_or(Error::EnvelopeUndefined { op: "envelope" })
    }

    /// The boundary point reached along `v`, as a vector: `v · at(v)`.
    pub fn envelope_v(&self, v: DVec2) -> Result<Batched<DVec2>> {
        Ok(self.at(v)?.map(|e| v * *e))
    }

    pub fn width(&self) -> Result<Batched<f64>> {
        let right = self.at(UNIT_X)?;
        let left = self.at(-UNIT_X)?;
        right.zip_with(&left, |r, l| r + l)
    }

    pub fn height(&self) -> Result<Batched<f64>> {
        let down = self.at(UNIT_Y)?;
        let up = self.at(-UNIT_Y)?;
        down.zip_with(&up, |d, u| d + u)
    }

    /// Center of the bounding box, per batch element.
    pub fn center(&self) -> Result<Batched<DVec2>> {
        let bb = self.to_bounding_box()?;
        bb.min.zip_with(&bb.max, |lo, hi| (*lo + *hi) / 2.0)
    }

    pub fn to_bounding_box(&self) -> Result<BoundingBox> {
        let right = self.at(UNIT_X)?;
        let left = self.at(-UNIT_X)?;
        let down = self.at(UNIT_Y)?;
        let up = self.at(-UNIT_Y)?;
        let min = left.zip_with(&up, |x, y| DVec2::new(-x, -y))?;
        let max = right.zip_with(&down, |x, y| DVec2::new(*x, *y))?;
        Ok(BoundingBox { min, max })
    }

    pub fn is_empty(&self) -> bool {
        self.diagram.is_empty()
    }
}

/// Axis-aligned bounding box, one corner pair per batch element.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub min: Batched<DVec2>,
    pub max: Batched<DVec2>,
}

impl BoundingBox {
    pub fn width(&self) -> Result<Batched<f64>> {
        self.min.zip_with(&self.max, |lo, hi| hi.x - lo.x)
    }

    pub fn height(&self) -> Result<Batched<f64>> {
        self.min.zip_with(&self.max, |lo, hi| hi.y - lo.y)
    }

    /// Scale both corners about the origin.
    pub fn scale(&self, factor: f64) -> BoundingBox {
        BoundingBox {
            min: self.min.map(|p| *p * factor),
            max: self.max.map(|p| *p * factor),
        }
    }

    /// A box diagram with exactly this extent, one rectangle per batch
    /// element.
    pub fn to_rect(&self) -> Result<Diagram> {
        let half = self.min.zip_with(&self.max, |lo, hi| (*hi - *lo) / 2.0)?;
        let centers = self.min.zip_with(&self.max, |lo, hi| (*lo + *hi) / 2.0)?;
        let transforms = centers.map(|c| Affine::from_translation(*c));
        Diagram::primitive(Rc::new(BoxShape::batched(half)), transforms, None)
    }
}
