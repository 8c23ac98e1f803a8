//! collage is a declarative diagram-composition library.
//!
//! Diagrams are immutable tree values built from primitive shapes, affine
//! transforms, and style annotations, and combined functionally: `atop`
//! overlays, `beside`/`above` place relative to each other, `hcat`/`vcat`
//! fold whole sequences into rows and columns. Position is resolved from
//! geometric queries on the operands themselves: the envelope (a
//! directional support function) and the trace (ray-intersection
//! distances). There are no explicit coordinates to keep in sync.
//!
//! Diagrams may also carry arbitrary leading batch dimensions, broadcast
//! NumPy-style when combined, which makes "a row of 100 bars" a single
//! value rather than 100 compositions.
//!
//! The output boundary is [`Diagram::render_list`] / [`Diagram::layout`]:
//! a flat list of primitives with global transforms, resolved styles, and
//! paint order, ready for any rendering backend.
//!
//! ```
//! use collage::{hcat, square, circle, Color};
//!
//! let row = hcat(
//!     [square(1.0), circle(0.5).fill_color(Color::named("red"))],
//!     0.1,
//! )?;
//! let layout = row.layout(200, None)?;
//! // Two shapes plus the invisible separator strut.
//! assert_eq!(layout.primitives.len(), 3);
//! # Ok::<(), collage::Error>(())
//! ```

pub mod batch;
pub mod combinators;
pub mod diagram;
pub mod envelope;
pub mod errors;
pub mod layout;
pub mod log;
pub mod shapes;
pub mod style;
pub mod trace;
pub mod transform;

pub use batch::{Batched, Size};
pub use combinators::{cat, concat, hcat, place_at, vcat};
pub use diagram::Diagram;
pub use envelope::{BoundingBox, Envelope};
pub use errors::{Error, Result};
pub use layout::{Layout, Rendered};
pub use shapes::{BoxShape, Circle, Shape, Strut, circle, hstrut, rect, square, strut, vstrut};
pub use style::{Attrs, Color, Style};
pub use trace::{Trace, TraceDistances};
pub use transform::{Affine, ORIGIN, Ray, UNIT_X, UNIT_Y};
