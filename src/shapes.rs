//! The shape contract and the built-in boundary shapes.
//!
//! A [`Shape`] answers the two geometric queries the algebra is built on,
//! in its own local frame: the directional support function (envelope) and
//! ray-intersection parameters (trace). Shapes may carry batch dimensions
//! of their own (one half-extent or radius per batch element); queries
//! broadcast the shape's batch against the query's batch.
//!
//! Only the minimal shapes the algebra itself needs live here. Richer
//! shape libraries implement [`Shape`] externally.

use std::fmt;
use std::rc::Rc;

use glam::DVec2;

use crate::batch::{Batched, Size};
use crate::diagram::Diagram;
use crate::errors::{Error, Result};
use crate::trace::TraceDistances;
use crate::transform::Ray;

/// A convex-boundary primitive, queried in its local frame.
///
/// Object-safe so diagrams can hold `Rc<dyn Shape>` from external crates.
pub trait Shape: fmt::Debug {
    /// Batch dimensions carried by the shape itself.
    fn size(&self) -> Size;

    /// Support function: for each direction `v`, the largest
    /// `(p · v) / (v · v)` over boundary points `p`.
    ///
    /// Scaling by `1 / |v|²` makes the result the extent of the shape in
    /// multiples of `v`, which is what the placement combinators consume.
    fn envelope(&self, directions: &Batched<DVec2>) -> Result<Batched<f64>>;

    /// All intersection parameters of each ray with the shape boundary,
    /// sorted ascending. An empty lane is a miss.
    fn trace(&self, rays: &Batched<Ray>) -> Result<TraceDistances>;

    /// Extract batch element `index` along the shape's leading axis.
    fn split(&self, index: usize) -> Result<Rc<dyn Shape>>;
}

/// Intersection parameter of `ray` with the segment from `a` to `b`.
///
/// Returns the ray parameter `t` (unrestricted in sign) when the ray's
/// supporting line crosses the segment interior, `None` when parallel or
/// when the crossing lies outside the segment.
pub(crate) fn ray_segment_intersection(ray: &Ray, a: DVec2, b: DVec2) -> Option<f64> {
    let s = b - a;
    let denom = ray.direction.perp_dot(s);
    if denom == 0.0 {
        return None;
    }
    let q = a - ray.origin;
    let t = q.perp_dot(s) / denom;
    let u = q.perp_dot(ray.direction) / denom;
    (0.0..=1.0).contains(&u).then_some(t)
}

/// Intersection parameters of `ray` with a circle of `radius` about the
/// origin, sorted ascending. Tangent rays report a single parameter.
pub(crate) fn ray_circle_intersection(ray: &Ray, radius: f64) -> Vec<f64> {
    const EPS: f64 = 1e-6;
    let a = ray.direction.length_squared();
    let b = 2.0 * ray.origin.dot(ray.direction);
    let c = ray.origin.length_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if a == 0.0 || disc < -EPS {
        Vec::new()
    } else if disc.abs() <= EPS {
        vec![-b / (2.0 * a)]
    } else {
        let root = disc.sqrt();
        let t0 = (-b - root) / (2.0 * a);
        let t1 = (-b + root) / (2.0 * a);
        vec![t0.min(t1), t0.max(t1)]
    }
}

/// Axis-aligned box centered at the origin, one half-extent per batch
/// element.
#[derive(Debug, Clone)]
pub struct BoxShape {
    half: Batched<DVec2>,
}

impl BoxShape {
    pub fn new(half: DVec2) -> BoxShape {
        BoxShape {
            half: Batched::scalar(half),
        }
    }

    pub fn batched(half: Batched<DVec2>) -> BoxShape {
        BoxShape { half }
    }

    fn corners(half: &DVec2) -> [DVec2; 4] {
        [
            DVec2::new(-half.x, -half.y),
            DVec2::new(half.x, -half.y),
            DVec2::new(half.x, half.y),
            DVec2::new(-half.x, half.y),
        ]
    }
}

impl Shape for BoxShape {
    fn size(&self) -> Size {
        self.half.size().clone()
    }

    fn envelope(&self, directions: &Batched<DVec2>) -> Result<Batched<f64>> {
        self.half.zip_with(directions, |h, v| {
            (h.x * v.x.abs() + h.y * v.y.abs()) / v.length_squared()
        })
    }

    fn trace(&self, rays: &Batched<Ray>) -> Result<TraceDistances> {
        let lanes = self.half.zip_with(rays, |h, ray| {
            let corners = Self::corners(h);
            let mut ts: Vec<f64> = (0..4)
                .filter_map(|i| ray_segment_intersection(ray, corners[i], corners[(i + 1) % 4]))
                .collect();
            ts.sort_by(f64::total_cmp);
            ts
        })?;
        Ok(TraceDistances::new(lanes))
    }

    fn split(&self, index: usize) -> Result<Rc<dyn Shape>> {
        Ok(Rc::new(BoxShape {
            half: self.half.select_leading(index)?,
        }))
    }
}

/// Circle centered at the origin, one radius per batch element.
#[derive(Debug, Clone)]
pub struct Circle {
    radius: Batched<f64>,
}

impl Circle {
    pub fn new(radius: f64) -> Circle {
        Circle {
            radius: Batched::scalar(radius),
        }
    }

    pub fn batched(radius: Batched<f64>) -> Circle {
        Circle { radius }
    }
}

impl Shape for Circle {
    fn size(&self) -> Size {
        self.radius.size().clone()
    }

    fn envelope(&self, directions: &Batched<DVec2>) -> Result<Batched<f64>> {
        self.radius
            .zip_with(directions, |r, v| r / v.length())
    }

    fn trace(&self, rays: &Batched<Ray>) -> Result<TraceDistances> {
        let lanes = self
            .radius
            .zip_with(rays, |r, ray| ray_circle_intersection(ray, *r))?;
        Ok(TraceDistances::new(lanes))
    }

    fn split(&self, index: usize) -> Result<Rc<dyn Shape>> {
        Ok(Rc::new(Circle {
            radius: self.radius.select_leading(index)?,
        }))
    }
}

/// Zero-area segment through the origin, used as invisible spacing.
///
/// Spans from `-along / 2` to `along / 2`, so its extent along its own
/// direction is `|along|` and its extent perpendicular is zero.
#[derive(Debug, Clone, Copy)]
pub struct Strut {
    along: DVec2,
}

impl Strut {
    pub fn new(along: DVec2) -> Strut {
        Strut { along }
    }
}

impl Shape for Strut {
    fn size(&self) -> Size {
        Size::scalar()
    }

    fn envelope(&self, directions: &Batched<DVec2>) -> Result<Batched<f64>> {
        let half = self.along / 2.0;
        Ok(directions.map(|v| (half.dot(*v)).abs() / v.length_squared()))
    }

    fn trace(&self, rays: &Batched<Ray>) -> Result<TraceDistances> {
        let half = self.along / 2.0;
        let lanes = rays.map(|ray| {
            ray_segment_intersection(ray, -half, half)
                .into_iter()
                .collect::<Vec<f64>>()
        });
        Ok(TraceDistances::new(lanes))
    }

    fn split(&self, _index: usize) -> Result<Rc<dyn Shape>> {
        Err(Error::MissingBatchAxis { op: "strut split" })
    }
}

/// Axis-aligned rectangle of the given width and height, centered at the
/// origin.
pub fn rect(width: f64, height: f64) -> Diagram {
    Diagram::from_shape(Rc::new(BoxShape::new(DVec2::new(width / 2.0, height / 2.0))))
}

pub fn square(side: f64) -> Diagram {
    rect(side, side)
}

/// Circle of the given radius, centered at the origin.
pub fn circle(radius: f64) -> Diagram {
    Diagram::from_shape(Rc::new(Circle::new(radius)))
}

/// Invisible spacer spanning `along`, centered at the origin.
pub fn strut(along: DVec2) -> Diagram {
    Diagram::from_shape(Rc::new(Strut::new(along)))
}

/// Horizontal spacer of the given width.
pub fn hstrut(width: f64) -> Diagram {
    strut(DVec2::new(width, 0.0))
}

/// Vertical spacer of the given height.
pub fn vstrut(height: f64) -> Diagram {
    strut(DVec2::new(0.0, height))
}
