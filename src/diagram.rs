//! The diagram tree.
//!
//! A [`Diagram`] is an immutable value: a reference-counted tree of
//! primitives, transforms, style annotations, and compositions. Combinators
//! never mutate; they wrap existing trees in new nodes, so shared subtrees
//! are free. Batch dimensions live in the `Batched` payloads on each node,
//! and composing two diagrams broadcasts their sizes together up front so
//! every later query can assume aligned operands.

use std::rc::Rc;

use glam::DVec2;

use crate::batch::{Batched, Size};
use crate::errors::{Error, Result};
use crate::shapes::Shape;
use crate::style::{Attrs, Color, Style};
use crate::transform::{self, Affine};

/// A placed primitive: a shape plus the batched local transform covering
/// the shape's batch dimensions. `order` optionally pre-assigns relative
/// draw order within the primitive's own batch.
#[derive(Debug, Clone)]
pub(crate) struct Prim {
    pub(crate) shape: Rc<dyn Shape>,
    pub(crate) transform: Batched<Affine>,
    pub(crate) order: Option<Batched<i64>>,
}

#[derive(Debug)]
pub(crate) enum Node {
    Empty,
    Primitive(Prim),
    ApplyTransform {
        transform: Batched<Affine>,
        child: Diagram,
    },
    ApplyStyle {
        style: Style,
        child: Diagram,
    },
    Compose {
        left: Diagram,
        right: Diagram,
    },
    /// Folds the child's trailing batch axis into overlay composition.
    ComposeAxis {
        child: Diagram,
    },
}

/// An immutable, shareable diagram value.
#[derive(Debug, Clone)]
pub struct Diagram(pub(crate) Rc<Node>);

impl Diagram {
    /// The zero of composition: draws nothing, identity for [`atop`].
    ///
    /// [`atop`]: Diagram::atop
    pub fn empty() -> Diagram {
        Diagram(Rc::new(Node::Empty))
    }

    /// A primitive diagram with an explicit batched placement.
    ///
    /// The transform must cover the shape's batch dimensions; it is
    /// broadcast up to them here so the node's size is definite.
    pub fn primitive(
        shape: Rc<dyn Shape>,
        transform: Batched<Affine>,
        order: Option<Batched<i64>>,
    ) -> Result<Diagram> {
        let size = transform.size().unify(&shape.size())?;
        let transform = transform.broadcast_to(&size)?;
        let order = match order {
            Some(o) => Some(o.broadcast_to(&size)?),
            None => None,
        };
        Ok(Diagram(Rc::new(Node::Primitive(Prim {
            shape,
            transform,
            order,
        }))))
    }

    /// A primitive diagram placed at the origin.
    pub fn from_shape(shape: Rc<dyn Shape>) -> Diagram {
        let size = shape.size();
        Diagram(Rc::new(Node::Primitive(Prim {
            shape,
            transform: Batched::filled(Affine::IDENTITY, size),
            order: None,
        })))
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        matches!(*self.0, Node::Empty)
    }

    /// The diagram's batch size.
    pub fn size(&self) -> Size {
        match self.node() {
            Node::Empty => Size::scalar(),
            Node::Primitive(prim) => prim.transform.size().clone(),
            Node::ApplyTransform { transform, .. } => transform.size().clone(),
            Node::ApplyStyle { style, .. } => style.size().clone(),
            Node::Compose { left, .. } => left.size(),
            Node::ComposeAxis { child } => child.size().drop_last(),
        }
    }

    // ----- tree broadcasting ------------------------------------------

    /// Add a leading batch axis of the given extent, repeating every
    /// batched payload in the tree. `Empty` is unchanged.
    pub fn add_axis(&self, extent: usize) -> Result<Diagram> {
        let node = match self.node() {
            Node::Empty => return Ok(self.clone()),
            Node::Primitive(prim) => Node::Primitive(Prim {
                shape: Rc::clone(&prim.shape),
                transform: prim.transform.add_leading_axis(extent),
                order: prim.order.as_ref().map(|o| o.add_leading_axis(extent)),
            }),
            Node::ApplyTransform { transform, child } => Node::ApplyTransform {
                transform: transform.add_leading_axis(extent),
                child: child.add_axis(extent)?,
            },
            Node::ApplyStyle { style, child } => Node::ApplyStyle {
                style: style.add_leading_axis(extent)?,
                child: child.add_axis(extent)?,
            },
            Node::Compose { left, right } => Node::Compose {
                left: left.add_axis(extent)?,
                right: right.add_axis(extent)?,
            },
            // The folded axis is trailing, so a new leading axis passes
            // straight through to the child.
            Node::ComposeAxis { child } => Node::ComposeAxis {
                child: child.add_axis(extent)?,
            },
        };
        Ok(Diagram(Rc::new(node)))
    }

    /// Repeat a singleton batch axis to the given extent, tree-wide.
    pub fn repeat_axis(&self, axis: usize, extent: usize) -> Result<Diagram> {
        let node = match self.node() {
            Node::Empty => return Ok(self.clone()),
            Node::Primitive(prim) => Node::Primitive(Prim {
                shape: Rc::clone(&prim.shape),
                transform: prim.transform.repeat_axis(axis, extent)?,
                order: match &prim.order {
                    Some(o) => Some(o.repeat_axis(axis, extent)?),
                    None => None,
                },
            }),
            Node::ApplyTransform { transform, child } => Node::ApplyTransform {
                transform: transform.repeat_axis(axis, extent)?,
                child: child.repeat_axis(axis, extent)?,
            },
            Node::ApplyStyle { style, child } => Node::ApplyStyle {
                style: style.repeat_axis(axis, extent)?,
                child: child.repeat_axis(axis, extent)?,
            },
            Node::Compose { left, right } => Node::Compose {
                left: left.repeat_axis(axis, extent)?,
                right: right.repeat_axis(axis, extent)?,
            },
            // Leading axis indices are the same in the child, which only
            // differs by its extra trailing axis.
            Node::ComposeAxis { child } => Node::ComposeAxis {
                child: child.repeat_axis(axis, extent)?,
            },
        };
        Ok(Diagram(Rc::new(node)))
    }

    /// Materialize this diagram at exactly `target`.
    pub fn broadcast_to(&self, target: &Size) -> Result<Diagram> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let size = self.size();
        if &size == target {
            return Ok(self.clone());
        }
        let unified = size.unify(target)?;
        if &unified != target {
            return Err(Error::ShapeMismatch {
                left: size,
                right: target.clone(),
            });
        }
        let mut out = self.clone();
        while out.size().ndim() < target.ndim() {
            let extent = target.dims()[target.ndim() - out.size().ndim() - 1];
            out = out.add_axis(extent)?;
        }
        let dims = out.size();
        for (axis, (&have, &want)) in dims.dims().iter().zip(target.dims()).enumerate() {
            if have != want {
                out = out.repeat_axis(axis, want)?;
            }
        }
        Ok(out)
    }

    /// Broadcast two diagrams to their unified size.
    pub fn broadcast_with(&self, other: &Diagram) -> Result<(Diagram, Diagram)> {
        let size = self.size().unify(&other.size())?;
        Ok((self.broadcast_to(&size)?, other.broadcast_to(&size)?))
    }

    /// Extract batch element `index` along the leading axis, tree-wide.
    ///
    /// The counterpart of [`add_axis`]: the result has one fewer batch
    /// dimension. Shapes that carry the full batch rank are split;
    /// lower-rank payloads were broadcast and pass through unchanged.
    ///
    /// [`add_axis`]: Diagram::add_axis
    pub fn select(&self, index: usize) -> Result<Diagram> {
        if self.size().is_scalar() {
            return Err(Error::MissingBatchAxis { op: "select" });
        }
        let rank = self.size().ndim();
        let node = match self.node() {
            Node::Empty => return Ok(self.clone()),
            Node::Primitive(prim) => {
                let shape = if prim.shape.size().ndim() == rank {
                    prim.shape.split(index)?
                } else {
                    Rc::clone(&prim.shape)
                };
                Node::Primitive(Prim {
                    shape,
                    transform: prim.transform.select_leading(index)?,
                    order: match &prim.order {
                        Some(o) => Some(o.select_leading(index)?),
                        None => None,
                    },
                })
            }
            Node::ApplyTransform { transform, child } => Node::ApplyTransform {
                transform: transform.select_leading(index)?,
                child: child.select(index)?,
            },
            Node::ApplyStyle { style, child } => Node::ApplyStyle {
                style: style.select_leading(index)?,
                child: child.select(index)?,
            },
            Node::Compose { left, right } => Node::Compose {
                left: left.select(index)?,
                right: right.select(index)?,
            },
            // The child shares the leading axis; only its trailing axis
            // differs from the node's.
            Node::ComposeAxis { child } => Node::ComposeAxis {
                child: child.select(index)?,
            },
        };
        Ok(Diagram(Rc::new(node)))
    }

    // ----- composition ------------------------------------------------

    /// Overlay `other` on top of this diagram (painted later).
    ///
    /// `Empty` is the identity on either side; otherwise the operands are
    /// broadcast to a shared size.
    pub fn atop(&self, other: &Diagram) -> Result<Diagram> {
        if self.is_empty() {
            return Ok(other.clone());
        }
        if other.is_empty() {
            return Ok(self.clone());
        }
        let (left, right) = self.broadcast_with(other)?;
        Ok(Diagram(Rc::new(Node::Compose { left, right })))
    }

    /// Fold the trailing batch axis into overlay composition: element `i`
    /// of the axis paints before element `i + 1`.
    pub fn compose_axis(&self) -> Result<Diagram> {
        if self.size().is_scalar() {
            return Err(Error::MissingBatchAxis { op: "compose_axis" });
        }
        Ok(Diagram(Rc::new(Node::ComposeAxis {
            child: self.clone(),
        })))
    }

    // ----- transforms -------------------------------------------------

    /// Apply a batched transform, broadcasting it against this diagram.
    pub fn apply_transform(&self, transform: Batched<Affine>) -> Result<Diagram> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let size = self.size().unify(transform.size())?;
        Ok(Diagram(Rc::new(Node::ApplyTransform {
            transform: transform.broadcast_to(&size)?,
            child: self.broadcast_to(&size)?,
        })))
    }

    /// Apply one affine uniformly across the batch.
    pub fn transformed(&self, affine: Affine) -> Diagram {
        if self.is_empty() {
            return self.clone();
        }
        Diagram(Rc::new(Node::ApplyTransform {
            transform: Batched::filled(affine, self.size()),
            child: self.clone(),
        }))
    }

    pub fn translate(&self, x: f64, y: f64) -> Diagram {
        self.translate_by(DVec2::new(x, y))
    }

    pub fn translate_by(&self, offset: DVec2) -> Diagram {
        self.transformed(transform::translation(offset))
    }

    pub fn scale(&self, factor: f64) -> Diagram {
        self.transformed(transform::scaling(factor))
    }

    pub fn scale_x(&self, factor: f64) -> Diagram {
        self.transformed(transform::scaling_xy(factor, 1.0))
    }

    pub fn scale_y(&self, factor: f64) -> Diagram {
        self.transformed(transform::scaling_xy(1.0, factor))
    }

    pub fn rotate(&self, radians: f64) -> Diagram {
        self.transformed(transform::rotation(radians))
    }

    pub fn rotate_by(&self, degrees: f64) -> Diagram {
        self.rotate(degrees.to_radians())
    }

    pub fn reflect_x(&self) -> Diagram {
        self.transformed(transform::reflect_x())
    }

    pub fn reflect_y(&self) -> Diagram {
        self.transformed(transform::reflect_y())
    }

    pub fn shear_x(&self, amount: f64) -> Diagram {
        self.transformed(transform::shear_x(amount))
    }

    pub fn shear_y(&self, amount: f64) -> Diagram {
        self.transformed(transform::shear_y(amount))
    }

    // ----- styles -------------------------------------------------------

    /// Attach a style annotation, broadcasting it against this diagram.
    pub fn apply_style(&self, style: Style) -> Result<Diagram> {
        if self.is_empty() {
            return Ok(self.clone());
        }
        let size = self.size().unify(style.size())?;
        let bounds = match style.bounds {
            Some(b) => Some(b.broadcast_to(&size)?),
            None => None,
        };
        Ok(Diagram(Rc::new(Node::ApplyStyle {
            style: Style {
                attrs: style.attrs.broadcast_to(&size)?,
                bounds,
            },
            child: self.broadcast_to(&size)?,
        })))
    }

    fn styled(&self, attrs: Attrs) -> Diagram {
        if self.is_empty() {
            return self.clone();
        }
        Diagram(Rc::new(Node::ApplyStyle {
            style: Style {
                attrs: Batched::filled(attrs, self.size()),
                bounds: None,
            },
            child: self.clone(),
        }))
    }

    pub fn fill_color(&self, color: Color) -> Diagram {
        self.styled(Attrs {
            fill: Some(color),
            ..Attrs::default()
        })
    }

    pub fn line_color(&self, color: Color) -> Diagram {
        self.styled(Attrs {
            stroke: Some(color),
            ..Attrs::default()
        })
    }

    pub fn line_width(&self, width: f64) -> Diagram {
        self.styled(Attrs {
            stroke_width: Some(width),
            ..Attrs::default()
        })
    }

    pub fn opacity(&self, opacity: f64) -> Diagram {
        self.styled(Attrs {
            opacity: Some(opacity),
            ..Attrs::default()
        })
    }

    pub fn dashing(&self, pattern: Vec<f64>) -> Diagram {
        self.styled(Attrs {
            dashing: Some(pattern),
            ..Attrs::default()
        })
    }
}
