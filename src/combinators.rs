//! Placement combinators.
//!
//! Everything here resolves relative position from geometric queries
//! instead of explicit coordinates: envelope-based placement butts convex
//! bounds together, snug placement probes the actual outline with rays,
//! and the `cat` family folds sequences into rows and columns. The batched
//! variants place the elements of the trailing batch axis relative to each
//! other and fold the axis into overlay composition.

use glam::DVec2;

use crate::diagram::Diagram;
use crate::errors::{Error, Result};
use crate::shapes::strut;
use crate::style::Style;
use crate::transform::{self, ORIGIN, UNIT_X, UNIT_Y};

impl Diagram {
    /// Draw this diagram unchanged, but answer envelope queries from
    /// `bounds` instead.
    pub fn with_envelope(&self, bounds: &Diagram) -> Result<Diagram> {
        if bounds.is_empty() {
            return Err(Error::EnvelopeUndefined { op: "with_envelope" });
        }
        self.apply_style(Style::with_bounds(bounds.clone()))
    }

    /// Grow (or shrink) the envelope by scaling the bounding box about the
    /// origin. Drawn content is unchanged.
    pub fn pad(&self, extra: f64) -> Result<Diagram> {
        if self.is_empty() {
            return Err(Error::EnvelopeUndefined { op: "pad" });
        }
        let bounds = self.envelope().to_bounding_box()?.scale(extra).to_rect()?;
        self.with_envelope(&bounds)
    }

    /// Move `other` so its envelope touches this diagram's along `dir`.
    ///
    /// Returns the moved copy of `other` only; compose with [`beside`]
    /// to also keep `self`.
    ///
    /// [`beside`]: Diagram::beside
    pub fn juxtapose(&self, other: &Diagram, dir: DVec2) -> Result<Diagram> {
        if self.is_empty() || other.is_empty() {
            return Err(Error::EnvelopeUndefined { op: "juxtapose" });
        }
        let near = self.envelope().at(dir)?;
        let far = other.envelope().at(-dir)?;
        let shifts = near.zip_with(&far, |a, b| transform::translation(dir * (a + b)))?;
        other.apply_transform(shifts)
    }

    /// This diagram with `other` placed against its envelope along `dir`.
    pub fn beside(&self, other: &Diagram, dir: DVec2) -> Result<Diagram> {
        self.atop(&self.juxtapose(other, dir)?)
    }

    /// Place `other` below this diagram (y points down).
    pub fn above(&self, other: &Diagram) -> Result<Diagram> {
        self.beside(other, UNIT_Y)
    }

    /// Place this diagram above `other`, anchored at `other`.
    ///
    /// Unlike [`above`], the result keeps `other` at its original position
    /// and moves `self` upward, and `other` paints first.
    ///
    /// [`above`]: Diagram::above
    pub fn above2(&self, other: &Diagram) -> Result<Diagram> {
        other.beside(self, -UNIT_Y)
    }

    /// Like [`juxtapose`], but probe the actual outline with a ray from
    /// the origin instead of using the convex envelope.
    ///
    /// Every batch element's probe must hit on both sides, else
    /// [`Error::TraceMiss`].
    ///
    /// [`juxtapose`]: Diagram::juxtapose
    pub fn juxtapose_snug(&self, other: &Diagram, dir: DVec2) -> Result<Diagram> {
        let (near, hit_near) = self.trace().nearest(ORIGIN, dir)?;
        let (far, hit_far) = other.trace().nearest(ORIGIN, -dir)?;
        let all_hit = hit_near.values().iter().all(|&h| h)
            && hit_far.values().iter().all(|&h| h);
        if !all_hit {
            return Err(Error::TraceMiss {
                op: "juxtapose_snug",
            });
        }
        let shifts = near.zip_with(&far, |a, b| transform::translation(dir * (a + b)))?;
        other.apply_transform(shifts)
    }

    /// This diagram with `other` placed snugly against its outline.
    pub fn beside_snug(&self, other: &Diagram, dir: DVec2) -> Result<Diagram> {
        self.atop(&self.juxtapose_snug(other, dir)?)
    }

    /// Overlay `other` centered on this diagram's bounding-box center.
    pub fn at_center(&self, other: &Diagram) -> Result<Diagram> {
        if self.is_empty() {
            return Err(Error::EnvelopeUndefined { op: "at_center" });
        }
        let centers = self.envelope().center()?;
        let moved = other.apply_transform(centers.map(|c| transform::translation(*c)))?;
        self.atop(&moved)
    }

    /// Recenter on the bounding-box center, per batch element.
    pub fn center_xy(&self) -> Result<Diagram> {
        if self.is_empty() {
            return Err(Error::EnvelopeUndefined { op: "center_xy" });
        }
        let centers = self.envelope().center()?;
        self.apply_transform(centers.map(|c| transform::translation(-*c)))
    }

    /// Place the elements of the trailing batch axis in a row along `dir`,
    /// separated by `sep`, then fold the axis into overlay composition.
    pub fn batch_cat(&self, dir: DVec2, sep: f64) -> Result<Diagram> {
        if self.size().is_scalar() {
            return Err(Error::MissingBatchAxis { op: "batch_cat" });
        }
        let forward = self.envelope().at(dir)?;
        let backward = self.envelope().at(-dir)?;
        // Gap between lane neighbors: predecessor's forward extent plus
        // our own backward extent; the first element stays put.
        let gaps = forward
            .roll_last()?
            .zip_with(&backward, |a, b| a + b + sep)?
            .with_lane_head(0.0)?;
        let offsets = gaps.cumsum_last()?;
        let shifts = offsets.map(|t| transform::translation(dir * *t));
        self.apply_transform(shifts)?.compose_axis()
    }

    pub fn batch_hcat(&self, sep: f64) -> Result<Diagram> {
        self.batch_cat(UNIT_X, sep)
    }

    pub fn batch_vcat(&self, sep: f64) -> Result<Diagram> {
        self.batch_cat(UNIT_Y, sep)
    }

    /// Fold the trailing batch axis into overlay composition in place.
    pub fn batch_concat(&self) -> Result<Diagram> {
        self.compose_axis()
    }
}

/// Fold a sequence into a row along `dir`, inserting a `sep`-long invisible
/// strut between consecutive elements.
///
/// An empty sequence yields [`Diagram::empty`]; a single element is
/// returned as-is, with no separator.
pub fn cat(diagrams: impl IntoIterator<Item = Diagram>, dir: DVec2, sep: f64) -> Result<Diagram> {
    let mut acc: Option<Diagram> = None;
    for d in diagrams {
        acc = Some(match acc {
            None => d,
            Some(row) => {
                let row = if sep != 0.0 {
                    row.beside(&strut(dir.normalize() * sep), dir)?
                } else {
                    row
                };
                row.beside(&d, dir)?
            }
        });
    }
    Ok(acc.unwrap_or_else(Diagram::empty))
}

/// Horizontal [`cat`].
pub fn hcat(diagrams: impl IntoIterator<Item = Diagram>, sep: f64) -> Result<Diagram> {
    cat(diagrams, UNIT_X, sep)
}

/// Vertical [`cat`].
pub fn vcat(diagrams: impl IntoIterator<Item = Diagram>, sep: f64) -> Result<Diagram> {
    cat(diagrams, UNIT_Y, sep)
}

/// Overlay a sequence, first element at the bottom of the paint order.
pub fn concat(diagrams: impl IntoIterator<Item = Diagram>) -> Result<Diagram> {
    let mut acc = Diagram::empty();
    for d in diagrams {
        acc = acc.atop(&d)?;
    }
    Ok(acc)
}

/// Translate each diagram to its matching point and overlay them all.
///
/// Pairs are consumed in lockstep; leftovers on either side are dropped.
pub fn place_at(
    diagrams: impl IntoIterator<Item = Diagram>,
    points: impl IntoIterator<Item = DVec2>,
) -> Result<Diagram> {
    let mut acc = Diagram::empty();
    for (d, p) in diagrams.into_iter().zip(points) {
        acc = acc.atop(&d.translate_by(p))?;
    }
    Ok(acc)
}
