//! Compiling diagram trees to flat render lists.
//!
//! Rendering backends consume a flat sequence of primitives, each with its
//! global transform, resolved style, and paint order. The compiler is one
//! post-order pass accumulating an [`OrderList`]: a monoid whose
//! concatenation shifts the right operand's paint orders past everything
//! the left operand emitted, so "later in the tree" means "painted on
//! top", independently per batch element.

use std::rc::Rc;

use glam::DVec2;

use crate::batch::Batched;
use crate::diagram::{Diagram, Node};
use crate::errors::{Error, Result};
use crate::log::{debug, warn};
use crate::shapes::Shape;
use crate::style::{Attrs, Style};
use crate::transform::{self, Affine, UNIT_X, UNIT_Y};

/// A compiled primitive: shape, global placement, resolved style
/// attributes, and paint order per batch element. Lower orders paint
/// first.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub shape: Rc<dyn Shape>,
    pub transform: Batched<Affine>,
    pub attrs: Batched<Attrs>,
    pub order: Batched<i64>,
}

/// Compiler accumulator. `counter` tracks, per batch element, how many
/// paint layers the compiled subtree occupies; primitives may carry more
/// trailing batch axes than the subtree, so the counter broadcasts onto
/// each primitive by trailing-singleton padding.
struct OrderList {
    prims: Vec<Rendered>,
    counter: Batched<i64>,
}

impl OrderList {
    fn empty() -> OrderList {
        OrderList {
            prims: Vec::new(),
            counter: Batched::scalar(0),
        }
    }

    /// Monoid concatenation: the right operand paints strictly after the
    /// left, per batch element.
    fn concat(mut self, right: OrderList) -> Result<OrderList> {
        for mut prim in right.prims {
            let pad = prim
                .order
                .size()
                .ndim()
                .saturating_sub(self.counter.size().ndim());
            let offset = self.counter.with_trailing_axes(pad);
            prim.order = prim.order.zip_with(&offset, |o, c| o + c)?;
            self.prims.push(prim);
        }
        let counter = self.counter.zip_with(&right.counter, |a, b| a + b)?;
        Ok(OrderList {
            prims: self.prims,
            counter,
        })
    }
}

fn compile(diagram: &Diagram, ambient: &Batched<Affine>) -> Result<OrderList> {
    match diagram.node() {
        Node::Empty => Ok(OrderList::empty()),
        Node::Primitive(prim) => {
            let total = ambient.zip_with(&prim.transform, |a, b| *a * *b)?;
            let size = total.size().clone();
            let (order, counter) = match &prim.order {
                Some(order) => {
                    let order = order.broadcast_to(&size)?;
                    let counter = order.map(|o| o + 1);
                    (order, counter)
                }
                None => (
                    Batched::filled(0i64, size.clone()),
                    Batched::filled(1i64, size.clone()),
                ),
            };
            Ok(OrderList {
                prims: vec![Rendered {
                    shape: Rc::clone(&prim.shape),
                    transform: total,
                    attrs: Batched::filled(Attrs::default(), size),
                    order,
                }],
                counter,
            })
        }
        Node::ApplyTransform { transform, child } => {
            let ambient = ambient.zip_with(transform, |a, b| *a * *b)?;
            compile(child, &ambient)
        }
        Node::ApplyStyle { style, child } => {
            let mut list = compile(child, ambient)?;
            for prim in &mut list.prims {
                let pad = prim
                    .attrs
                    .size()
                    .ndim()
                    .saturating_sub(style.attrs.size().ndim());
                let outer = style.attrs.with_trailing_axes(pad);
                prim.attrs = prim.attrs.zip_with(&outer, |inner, anc| inner.inherit(anc))?;
            }
            Ok(list)
        }
        Node::Compose { left, right } => {
            let l = compile(left, ambient)?;
            let r = compile(right, ambient)?;
            l.concat(r)
        }
        Node::ComposeAxis { child } => {
            let ambient = ambient.add_trailing_axis();
            let mut list = compile(child, &ambient)?;
            // Element i of the folded axis paints after everything the
            // elements before it emitted.
            let offsets = list.counter.exclusive_cumsum_last()?;
            for prim in &mut list.prims {
                let pad = prim
                    .order
                    .size()
                    .ndim()
                    .saturating_sub(offsets.size().ndim());
                let offset = offsets.with_trailing_axes(pad);
                prim.order = prim.order.zip_with(&offset, |o, c| o + c)?;
            }
            let counter = list.counter.sum_last()?;
            Ok(OrderList {
                prims: list.prims,
                counter,
            })
        }
    }
}

/// A diagram fitted to an output frame, ready for a backend.
#[derive(Debug, Clone)]
pub struct Layout {
    pub primitives: Vec<Rendered>,
    pub height: u32,
    pub width: u32,
}

/// Fraction of the frame kept as margin by [`Diagram::layout`].
const MARGIN: f64 = 0.05;

impl Diagram {
    /// Compile to a flat render list with global transforms, resolved
    /// styles, and paint orders.
    pub fn render_list(&self) -> Result<Vec<Rendered>> {
        debug!("compiling diagram to a render list");
        let ambient = Batched::filled(Affine::IDENTITY, self.size());
        Ok(compile(self, &ambient)?.prims)
    }

    /// Fit the diagram into an output frame of the given pixel height.
    ///
    /// When `width` is omitted it is inferred from the diagram's aspect
    /// ratio. The content is uniformly scaled (never stretched), centered,
    /// padded by a 5% margin, and shifted so the frame's origin is the
    /// top-left corner. Batched diagrams are fitted to the largest extent
    /// across batch elements so every element lands inside the frame.
    pub fn layout(&self, height: u32, width: Option<u32>) -> Result<Layout> {
        let env = self.envelope();
        let env_w = env
            .width()?
            .max_all()
            .ok_or(Error::EnvelopeUndefined { op: "layout" })?;
        let env_h = env
            .height()?
            .max_all()
            .ok_or(Error::EnvelopeUndefined { op: "layout" })?;
        if env_w <= 0.0 || env_h <= 0.0 {
            warn!("fitting a diagram with zero extent; the scale factor is degenerate");
        }
        let width =
            width.unwrap_or_else(|| (f64::from(height) * env_w / env_h).round() as u32);
        let h = f64::from(height);
        let w = f64::from(width);
        debug!("laying out diagram into a {width}x{height} frame");

        let alpha = if env_w - w <= env_h - h {
            h / ((1.0 + MARGIN) * env_h)
        } else {
            w / ((1.0 + MARGIN) * env_w)
        };
        let fitted = self.scale(alpha).center_xy()?.pad(1.0 + MARGIN)?;

        // Shift so the bounding box's min corner lands on the frame origin.
        let e = fitted.envelope();
        let left = e.at(-UNIT_X)?;
        let up = e.at(-UNIT_Y)?;
        let shift = left.zip_with(&up, |x, y| transform::translation(DVec2::new(*x, *y)))?;
        let framed = fitted
            .apply_transform(shift)?
            .apply_style(Style::root(h.max(w)))?;

        Ok(Layout {
            primitives: framed.render_list()?,
            height,
            width,
        })
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::shapes::{circle, square};
    use crate::style::Color;

    #[test]
    fn single_primitive_orders_zero() {
        let prims = square(1.0).render_list().unwrap();
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].order.values(), &[0]);
    }

    #[test]
    fn compose_orders_are_strictly_increasing() {
        let d = square(1.0)
            .atop(&circle(1.0))
            .unwrap()
            .atop(&square(2.0))
            .unwrap();
        let prims = d.render_list().unwrap();
        let orders: Vec<i64> = prims.iter().map(|p| p.order.values()[0]).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn compose_axis_orders_follow_the_folded_axis() {
        let d = square(1.0).add_axis(3).unwrap().compose_axis().unwrap();
        let prims = d.render_list().unwrap();
        assert_eq!(prims.len(), 1);
        assert_eq!(prims[0].order.values(), &[0, 1, 2]);
    }

    #[test]
    fn style_resolution_is_leafward_first() {
        let d = square(1.0)
            .fill_color(Color::named("red"))
            .fill_color(Color::named("blue"))
            .line_width(3.0);
        let prims = d.render_list().unwrap();
        let attrs = &prims[0].attrs.values()[0];
        assert_eq!(attrs.fill, Some(Color::named("red")));
        assert_eq!(attrs.stroke_width, Some(3.0));
    }

    #[test]
    fn transforms_accumulate_outer_first() {
        let d = square(1.0).translate(1.0, 0.0).scale(2.0);
        let prims = d.render_list().unwrap();
        let t = prims[0].transform.values()[0];
        let p = t.transform_point2(DVec2::ZERO);
        assert_approx_eq!(f64, p.x, 2.0);
    }

    #[test]
    fn layout_fits_the_frame() {
        let d = square(1.0);
        let layout = square(10.0).atop(&d).unwrap().layout(200, None).unwrap();
        assert_eq!(layout.width, 200);
        assert_eq!(layout.primitives.len(), 2);
        // Root style stroke width is inherited by unstyled primitives.
        let attrs = &layout.primitives[0].attrs.values()[0];
        assert_approx_eq!(f64, attrs.stroke_width.unwrap(), 2.0);
    }

    #[test]
    fn layout_infers_width_from_aspect() {
        let layout = crate::shapes::rect(4.0, 2.0).layout(100, None).unwrap();
        assert_eq!(layout.width, 200);
    }

    #[test]
    fn empty_layout_is_undefined() {
        assert!(matches!(
            Diagram::empty().layout(100, None),
            Err(Error::EnvelopeUndefined { .. })
        ));
    }
}
