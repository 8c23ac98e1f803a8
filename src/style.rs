//! Styling: colors, attribute bags, and the batched style annotation.

use std::fmt;

use crate::batch::{Batched, Size};
use crate::diagram::Diagram;
use crate::errors::Result;

/// A paint color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
    /// CSS named color, e.g. `"steelblue"`.
    Named(String),
    Rgb(u8, u8, u8),
    Rgba(u8, u8, u8, u8),
}

impl Color {
    pub fn named(name: impl Into<String>) -> Color {
        Color::Named(name.into())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Named(name) => write!(f, "{name}"),
            Color::Rgb(r, g, b) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            Color::Rgba(r, g, b, a) => {
                write!(f, "rgba({r}, {g}, {b}, {:.3})", f64::from(*a) / 255.0)
            }
        }
    }
}

/// One element's worth of style attributes. Every field is optional;
/// unset fields inherit from ancestor styles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attrs {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f64>,
    pub opacity: Option<f64>,
    pub dashing: Option<Vec<f64>>,
}

impl Attrs {
    /// Fill this bag's unset fields from `ancestor`. Fields already set
    /// here (closer to the leaf) win.
    pub fn inherit(&self, ancestor: &Attrs) -> Attrs {
        Attrs {
            fill: self.fill.clone().or_else(|| ancestor.fill.clone()),
            stroke: self.stroke.clone().or_else(|| ancestor.stroke.clone()),
            stroke_width: self.stroke_width.or(ancestor.stroke_width),
            opacity: self.opacity.or(ancestor.opacity),
            dashing: self.dashing.clone().or_else(|| ancestor.dashing.clone()),
        }
    }

    pub fn is_unset(&self) -> bool {
        self == &Attrs::default()
    }
}

/// A style annotation attached to a subtree.
///
/// `attrs` broadcasts against the child's batch size. `bounds`, when
/// present, is an undrawn diagram whose envelope stands in for the child's;
/// trace queries ignore it and keep answering from the drawn content.
#[derive(Debug, Clone)]
pub struct Style {
    pub attrs: Batched<Attrs>,
    pub bounds: Option<Diagram>,
}

impl Style {
    pub fn new(attrs: Attrs) -> Style {
        Style {
            attrs: Batched::scalar(attrs),
            bounds: None,
        }
    }

    pub fn batched(attrs: Batched<Attrs>) -> Style {
        Style {
            attrs,
            bounds: None,
        }
    }

    /// An attribute-free style that only overrides the envelope.
    pub fn with_bounds(bounds: Diagram) -> Style {
        Style {
            attrs: Batched::scalar(Attrs::default()),
            bounds: Some(bounds),
        }
    }

    /// Root context attached by `layout`: a default stroke width
    /// proportional to the output frame, inherited by every primitive
    /// that does not set its own.
    pub fn root(output_size: f64) -> Style {
        Style::new(Attrs {
            stroke: Some(Color::named("black")),
            stroke_width: Some(output_size * 0.01),
            ..Attrs::default()
        })
    }

    pub fn size(&self) -> &Size {
        self.attrs.size()
    }

    pub fn add_leading_axis(&self, extent: usize) -> Result<Style> {
        Ok(Style {
            attrs: self.attrs.add_leading_axis(extent),
            bounds: match &self.bounds {
                Some(d) => Some(d.add_axis(extent)?),
                None => None,
            },
        })
    }

    pub fn select_leading(&self, index: usize) -> Result<Style> {
        Ok(Style {
            attrs: self.attrs.select_leading(index)?,
            bounds: match &self.bounds {
                Some(d) => Some(d.select(index)?),
                None => None,
            },
        })
    }

    pub fn repeat_axis(&self, axis: usize, extent: usize) -> Result<Style> {
        Ok(Style {
            attrs: self.attrs.repeat_axis(axis, extent)?,
            bounds: match &self.bounds {
                Some(d) => Some(d.repeat_axis(axis, extent)?),
                None => None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_display_forms() {
        assert_eq!(Color::named("red").to_string(), "red");
        assert_eq!(Color::Rgb(255, 128, 0).to_string(), "#ff8000");
        assert_eq!(Color::Rgba(0, 0, 0, 255).to_string(), "rgba(0, 0, 0, 1.000)");
    }

    #[test]
    fn inherit_prefers_leafward_values() {
        let leaf = Attrs {
            fill: Some(Color::named("red")),
            ..Attrs::default()
        };
        let ancestor = Attrs {
            fill: Some(Color::named("blue")),
            stroke_width: Some(2.0),
            ..Attrs::default()
        };
        let merged = leaf.inherit(&ancestor);
        assert_eq!(merged.fill, Some(Color::named("red")));
        assert_eq!(merged.stroke_width, Some(2.0));
    }

    #[test]
    fn root_style_scales_with_frame() {
        let s = Style::root(200.0);
        let attrs = s.attrs.first().unwrap();
        assert_eq!(attrs.stroke_width, Some(2.0));
    }
}
