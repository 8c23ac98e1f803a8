//! Batch sizes and the broadcast algebra.
//!
//! Diagrams carry arbitrary leading "batch" dimensions that are orthogonal
//! to their 2D geometric content. [`Size`] is the tuple of those dimensions
//! and [`Batched`] is the flat per-element container every batched field
//! (transforms, paint orders, style attributes) lives in. Broadcasting
//! follows the NumPy rule: sizes are right-aligned and each aligned pair of
//! dimensions must be equal or contain a 1.

use std::fmt;

use crate::errors::{Error, Result};

/// Ordered tuple of batch dimensions.
///
/// `Size::scalar()` (the empty tuple) is the identity of [`Size::unify`],
/// which makes `Size` a commutative monoid under unification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Size(Vec<usize>);

impl Size {
    /// The empty size: a single, unbatched element.
    pub fn scalar() -> Size {
        Size(Vec::new())
    }

    pub fn new(dims: impl Into<Vec<usize>>) -> Size {
        Size(dims.into())
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    pub fn is_scalar(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of batch elements (product of dimensions; 1 for scalar).
    pub fn count(&self) -> usize {
        self.0.iter().product()
    }

    /// Extent of the trailing axis, if any.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Size with the trailing axis removed. Scalar sizes are unchanged.
    pub fn drop_last(&self) -> Size {
        let mut dims = self.0.clone();
        dims.pop();
        Size(dims)
    }

    /// Size with a new leading axis of the given extent.
    pub fn with_leading(&self, extent: usize) -> Size {
        let mut dims = Vec::with_capacity(self.ndim() + 1);
        dims.push(extent);
        dims.extend_from_slice(&self.0);
        Size(dims)
    }

    /// Size with `n` singleton axes appended.
    pub fn with_trailing_ones(&self, n: usize) -> Size {
        let mut dims = self.0.clone();
        dims.extend(std::iter::repeat(1).take(n));
        Size(dims)
    }

    /// Unify two sizes under the broadcast rule.
    ///
    /// Dimensions are right-aligned; each aligned pair must be equal or
    /// contain a 1, and the result takes the larger extent. Missing leading
    /// dimensions are adopted from the other side.
    pub fn unify(&self, other: &Size) -> Result<Size> {
        let n = self.ndim().max(other.ndim());
        let mut dims = vec![0usize; n];
        for i in 0..n {
            let a = (i < self.ndim()).then(|| self.0[self.ndim() - 1 - i]);
            let b = (i < other.ndim()).then(|| other.0[other.ndim() - 1 - i]);
            dims[n - 1 - i] = match (a, b) {
                (Some(a), Some(b)) if a == b || b == 1 => a,
                (Some(1), Some(b)) => b,
                (Some(a), None) | (None, Some(a)) => a,
                _ => {
                    return Err(Error::ShapeMismatch {
                        left: self.clone(),
                        right: other.clone(),
                    });
                }
            };
        }
        Ok(Size(dims))
    }
}

impl From<&[usize]> for Size {
    fn from(dims: &[usize]) -> Size {
        Size(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Size {
    fn from(dims: [usize; N]) -> Size {
        Size(dims.to_vec())
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        if self.0.len() == 1 {
            write!(f, ",")?;
        }
        write!(f, ")")
    }
}

/// Strides of `size` aligned to the right against `out`, with zero stride
/// for broadcast (extent-1 or missing) axes.
fn aligned_strides(size: &Size, out: &Size) -> Vec<usize> {
    debug_assert!(out.ndim() >= size.ndim());
    let offset = out.ndim() - size.ndim();
    let mut strides = vec![0usize; out.ndim()];
    let mut acc = 1usize;
    for i in (0..size.ndim()).rev() {
        let d = size.dims()[i];
        if d != 1 {
            strides[offset + i] = acc;
        }
        acc *= d;
    }
    strides
}

/// Row-major odometer over an output size that advances one flat index per
/// operand on every step, honoring zero strides on broadcast axes.
struct Odometer<'a> {
    dims: &'a [usize],
    index: Vec<usize>,
}

impl<'a> Odometer<'a> {
    fn new(size: &'a Size) -> Self {
        Odometer {
            dims: size.dims(),
            index: vec![0; size.ndim()],
        }
    }

    fn step(&mut self, flats: &mut [usize], strides: &[&[usize]]) {
        for d in (0..self.dims.len()).rev() {
            self.index[d] += 1;
            for (flat, s) in flats.iter_mut().zip(strides) {
                *flat += s[d];
            }
            if self.index[d] < self.dims[d] {
                return;
            }
            self.index[d] = 0;
            for (flat, s) in flats.iter_mut().zip(strides) {
                *flat -= s[d] * self.dims[d];
            }
        }
    }
}

/// A batched value: one `T` per batch element, stored flat in row-major
/// order alongside its [`Size`].
///
/// Invariant: `data.len() == size.count()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Batched<T> {
    data: Vec<T>,
    size: Size,
}

impl<T: Clone> Batched<T> {
    /// A single unbatched value.
    pub fn scalar(value: T) -> Batched<T> {
        Batched {
            data: vec![value],
            size: Size::scalar(),
        }
    }

    /// A batched value from flat row-major data.
    pub fn from_vec(data: Vec<T>, size: Size) -> Result<Batched<T>> {
        if data.len() != size.count() {
            return Err(Error::ShapeMismatch {
                left: Size::new([data.len()]),
                right: size,
            });
        }
        Ok(Batched { data, size })
    }

    /// A one-axis batch from a vector of values.
    pub fn from_slice(data: &[T]) -> Batched<T> {
        Batched {
            data: data.to_vec(),
            size: Size::new([data.len()]),
        }
    }

    /// The same value repeated over every element of `size`.
    pub fn filled(value: T, size: Size) -> Batched<T> {
        Batched {
            data: vec![value; size.count()],
            size,
        }
    }

    pub fn size(&self) -> &Size {
        &self.size
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Flat row-major view of the per-element values.
    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn first(&self) -> Option<&T> {
        self.data.first()
    }

    /// Elementwise map, preserving the size.
    pub fn map<U: Clone>(&self, f: impl Fn(&T) -> U) -> Batched<U> {
        Batched {
            data: self.data.iter().map(f).collect(),
            size: self.size.clone(),
        }
    }

    /// Elementwise combination under broadcasting.
    pub fn zip_with<U: Clone, V: Clone>(
        &self,
        other: &Batched<U>,
        f: impl Fn(&T, &U) -> V,
    ) -> Result<Batched<V>> {
        let out = self.size.unify(&other.size)?;
        let sa = aligned_strides(&self.size, &out);
        let sb = aligned_strides(&other.size, &out);
        let mut odo = Odometer::new(&out);
        let mut flats = [0usize, 0usize];
        let n = out.count();
        let mut data = Vec::with_capacity(n);
        for _ in 0..n {
            data.push(f(&self.data[flats[0]], &other.data[flats[1]]));
            odo.step(&mut flats, &[sa.as_slice(), sb.as_slice()]);
        }
        Ok(Batched { data, size: out })
    }

    /// Materialize this value at exactly `target`, repeating broadcast axes.
    pub fn broadcast_to(&self, target: &Size) -> Result<Batched<T>> {
        if &self.size == target {
            return Ok(self.clone());
        }
        let unified = self.size.unify(target)?;
        if &unified != target {
            return Err(Error::ShapeMismatch {
                left: self.size.clone(),
                right: target.clone(),
            });
        }
        let strides = aligned_strides(&self.size, target);
        let mut odo = Odometer::new(target);
        let mut flats = [0usize];
        let n = target.count();
        let mut data = Vec::with_capacity(n);
        for _ in 0..n {
            data.push(self.data[flats[0]].clone());
            odo.step(&mut flats, &[strides.as_slice()]);
        }
        Ok(Batched {
            data,
            size: target.clone(),
        })
    }

    /// Add a new leading axis of the given extent by repeating the content.
    pub fn add_leading_axis(&self, extent: usize) -> Batched<T> {
        let mut data = Vec::with_capacity(self.data.len() * extent);
        for _ in 0..extent {
            data.extend(self.data.iter().cloned());
        }
        Batched {
            data,
            size: self.size.with_leading(extent),
        }
    }

    /// Append a trailing singleton axis. The data is unchanged.
    pub fn add_trailing_axis(&self) -> Batched<T> {
        self.with_trailing_axes(1)
    }

    /// Append `n` trailing singleton axes. The data is unchanged.
    pub fn with_trailing_axes(&self, n: usize) -> Batched<T> {
        Batched {
            data: self.data.clone(),
            size: self.size.with_trailing_ones(n),
        }
    }

    /// Repeat a singleton axis to the given extent.
    pub fn repeat_axis(&self, axis: usize, extent: usize) -> Result<Batched<T>> {
        if axis >= self.size.ndim() || self.size.dims()[axis] != 1 {
            return Err(Error::ShapeMismatch {
                left: self.size.clone(),
                right: {
                    let mut dims = self.size.dims().to_vec();
                    if axis < dims.len() {
                        dims[axis] = extent;
                    }
                    Size::new(dims)
                },
            });
        }
        let mut dims = self.size.dims().to_vec();
        dims[axis] = extent;
        let block: usize = self.size.dims()[axis + 1..].iter().product();
        let mut data = Vec::with_capacity(self.data.len() * extent);
        for chunk in self.data.chunks(block.max(1)) {
            for _ in 0..extent {
                data.extend(chunk.iter().cloned());
            }
        }
        Ok(Batched {
            data,
            size: Size::new(dims),
        })
    }

    /// Extract batch element `index` along the leading axis.
    pub fn select_leading(&self, index: usize) -> Result<Batched<T>> {
        let Some(&extent) = self.size.dims().first() else {
            return Err(Error::MissingBatchAxis { op: "select" });
        };
        if index >= extent {
            return Err(Error::ShapeMismatch {
                left: Size::new([index]),
                right: self.size.clone(),
            });
        }
        let block = self.data.len() / extent;
        Ok(Batched {
            data: self.data[index * block..(index + 1) * block].to_vec(),
            size: Size::new(&self.size.dims()[1..]),
        })
    }

    /// Fold the trailing axis with `f`, producing a value of one fewer axis.
    pub fn reduce_last(&self, f: impl Fn(T, T) -> T) -> Result<Batched<T>> {
        let lane = self
            .size
            .last()
            .ok_or(Error::MissingBatchAxis { op: "axis fold" })?;
        if lane == 0 {
            return Err(Error::MissingBatchAxis { op: "axis fold" });
        }
        let mut data = Vec::with_capacity(self.data.len() / lane);
        for chunk in self.data.chunks(lane) {
            let mut acc = chunk[0].clone();
            for v in &chunk[1..] {
                acc = f(acc, v.clone());
            }
            data.push(acc);
        }
        Ok(Batched {
            data,
            size: self.size.drop_last(),
        })
    }

    /// Rotate every trailing-axis lane right by one position.
    pub fn roll_last(&self) -> Result<Batched<T>> {
        let lane = self
            .size
            .last()
            .ok_or(Error::MissingBatchAxis { op: "roll" })?;
        if lane == 0 {
            return Ok(self.clone());
        }
        let mut data = Vec::with_capacity(self.data.len());
        for chunk in self.data.chunks(lane) {
            data.push(chunk[lane - 1].clone());
            data.extend(chunk[..lane - 1].iter().cloned());
        }
        Ok(Batched {
            data,
            size: self.size.clone(),
        })
    }

    /// Replace the first element of every trailing-axis lane.
    pub fn with_lane_head(&self, value: T) -> Result<Batched<T>> {
        let lane = self
            .size
            .last()
            .ok_or(Error::MissingBatchAxis { op: "lane head" })?;
        let mut data = self.data.clone();
        if lane > 0 {
            for i in (0..data.len()).step_by(lane) {
                data[i] = value.clone();
            }
        }
        Ok(Batched {
            data,
            size: self.size.clone(),
        })
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> Batched<T> {
    /// Inclusive prefix sum along the trailing axis.
    pub fn cumsum_last(&self) -> Result<Batched<T>> {
        let lane = self
            .size
            .last()
            .ok_or(Error::MissingBatchAxis { op: "cumsum" })?;
        let mut data = Vec::with_capacity(self.data.len());
        for chunk in self.data.chunks(lane.max(1)) {
            let mut acc = T::default();
            for &v in chunk {
                acc = acc + v;
                data.push(acc);
            }
        }
        Ok(Batched {
            data,
            size: self.size.clone(),
        })
    }

    /// Exclusive prefix sum along the trailing axis: element `i` receives
    /// the sum of elements `0..i`, and every lane starts at zero.
    pub fn exclusive_cumsum_last(&self) -> Result<Batched<T>> {
        let lane = self
            .size
            .last()
            .ok_or(Error::MissingBatchAxis { op: "cumsum" })?;
        let mut data = Vec::with_capacity(self.data.len());
        for chunk in self.data.chunks(lane.max(1)) {
            let mut acc = T::default();
            for &v in chunk {
                data.push(acc);
                acc = acc + v;
            }
        }
        Ok(Batched {
            data,
            size: self.size.clone(),
        })
    }

    /// Sum along the trailing axis, producing a value of one fewer axis.
    pub fn sum_last(&self) -> Result<Batched<T>> {
        let lane = self
            .size
            .last()
            .ok_or(Error::MissingBatchAxis { op: "sum" })?;
        let mut data = Vec::with_capacity(self.data.len() / lane.max(1));
        for chunk in self.data.chunks(lane.max(1)) {
            let mut acc = T::default();
            for &v in chunk {
                acc = acc + v;
            }
            data.push(acc);
        }
        Ok(Batched {
            data,
            size: self.size.drop_last(),
        })
    }
}

impl Batched<f64> {
    /// Maximum over every batch element.
    pub fn max_all(&self) -> Option<f64> {
        self.data.iter().copied().reduce(f64::max)
    }
}


#[cfg(test)]
mod proptest_tests {
    use proptest::prelude::*;

    use super::*;

    fn size_strategy() -> impl Strategy<Value = Size> {
        prop::collection::vec(1usize..4, 0..4).prop_map(Size::new)
    }

    /// A size broadcast-compatible with `base`: trailing-aligned dims that
    /// either match or are 1, with an arbitrary number of leading dims kept.
    fn compatible_with(base: &Size) -> impl Strategy<Value = Size> + use<> {
        let dims = base.dims().to_vec();
        let choices: Vec<_> = dims
            .iter()
            .map(|&d| prop::sample::select(vec![d, 1]))
            .collect();
        (choices, 0..=dims.len()).prop_map(move |(picked, keep_from)| {
            Size::new(picked[keep_from..].to_vec())
        })
    }

    proptest! {
        #[test]
        fn unify_is_commutative(a in size_strategy(), b in size_strategy()) {
            prop_assert_eq!(a.unify(&b).ok(), b.unify(&a).ok());
        }

        #[test]
        fn unify_is_associative(
            a in size_strategy(),
            (b, c) in size_strategy().prop_flat_map(|s| {
                let b = compatible_with(&s);
                let c = compatible_with(&s);
                (b, c)
            }),
        ) {
            // Restrict b and c so that at least one association succeeds;
            // whenever both succeed they must agree.
            let left = a.unify(&b).and_then(|ab| ab.unify(&c)).ok();
            let right = b.unify(&c).and_then(|bc| a.unify(&bc)).ok();
            if let (Some(l), Some(r)) = (left, right) {
                prop_assert_eq!(l, r);
            }
        }

        #[test]
        fn unify_identity(a in size_strategy()) {
            prop_assert_eq!(a.unify(&Size::scalar()).unwrap(), a);
        }

        #[test]
        fn broadcast_matches_unified_count(a in size_strategy(), b in size_strategy()) {
            if let Ok(u) = a.unify(&b) {
                let lhs = Batched::filled(1i64, a);
                let rhs = Batched::filled(2i64, b);
                let out = lhs.zip_with(&rhs, |x, y| x + y).unwrap();
                prop_assert_eq!(out.size(), &u);
                prop_assert_eq!(out.len(), u.count());
                prop_assert!(out.values().iter().all(|&v| v == 3));
            }
        }
    }
}
