use std::fmt;
use std::ops::Range;

use crate::buffer::{block_size_for, TiledBuffer};
use crate::dtype::{DType, Element};
use crate::error::TensorError;
use crate::shape::{validate_perm, Shape};
use crate::Result;

/// An n-dimensional array: a [`TiledBuffer`] laid out by a row-major [`Shape`].
///
/// The block size is always derived from the last dimension (see
/// [`block_size_for`]), so every run of whole rows is a run of whole blocks.
/// Views taken with [`Tensor::view`] or [`Tensor::row`] borrow those blocks
/// without copying and cannot outlive the tensor.
///
/// # Examples
///
/// ```
/// use tessel_core::Tensor;
///
/// let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// assert_eq!(t.row(1).unwrap().as_slice(), &[4.0, 5.0, 6.0]);
///
/// let flat = t.reshape(&[6]).unwrap();
/// assert_eq!(flat.dims(), &[6]);
/// ```
#[derive(Clone, PartialEq)]
pub struct Tensor<T: Element> {
    buffer: TiledBuffer<T>,
    shape: Shape,
}

/// Read-only view over a block range of a parent tensor.
#[derive(Clone)]
pub struct TensorView<'a, T: Element> {
    data: &'a [T],
    shape: Shape,
}

/// Mutable view over a block range of a parent tensor.
pub struct TensorViewMut<'a, T: Element> {
    data: &'a mut [T],
    shape: Shape,
}

/// Element range and narrowed shape for an index prefix.
fn narrow(shape: &Shape, prefix: &[usize]) -> Result<(Range<usize>, Shape)> {
    let offset = shape.prefix_offset(prefix)?;
    let inner = shape.trailing(prefix.len());
    let len = inner.numel();
    Ok((offset..offset + len, inner))
}

impl<T: Element> Tensor<T> {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a tensor from row-major data.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        let shape = Shape::new(dims);
        if shape.numel() != data.len() {
            return Err(TensorError::ShapeMismatch {
                expected: dims.to_vec(),
                got: vec![data.len()],
            });
        }
        let buffer = TiledBuffer::from_vec(data, block_size_for(shape.row_len()))?;
        Ok(Self { buffer, shape })
    }

    /// Create a tensor by copying row-major data.
    pub fn from_slice(data: &[T], dims: &[usize]) -> Result<Self> {
        Self::from_vec(data.to_vec(), dims)
    }

    /// Tensor filled with the default value (zero for numeric types).
    pub fn zeros(dims: &[usize]) -> Self {
        Self::full(dims, T::default())
    }

    /// Tensor filled with `value`.
    pub fn full(dims: &[usize], value: T) -> Self {
        let shape = Shape::new(dims);
        let data = vec![value; shape.numel()];
        Self {
            buffer: TiledBuffer::for_rows(data, shape.row_len()),
            shape,
        }
    }

    /// 0-dimensional tensor holding one value.
    pub fn scalar(value: T) -> Self {
        Self::full(&[], value)
    }

    /// Build a tensor from a function of the linear element index.
    pub fn from_fn(dims: &[usize], f: impl FnMut(usize) -> T) -> Self {
        let shape = Shape::new(dims);
        let data: Vec<T> = (0..shape.numel()).map(f).collect();
        Self {
            buffer: TiledBuffer::for_rows(data, shape.row_len()),
            shape,
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_scalar()
    }

    pub fn buffer(&self) -> &TiledBuffer<T> {
        &self.buffer
    }

    /// Row-major element data.
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    /// Mutable row-major element data.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buffer.as_mut_slice()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.buffer.as_slice().to_vec()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.buffer.into_vec()
    }

    /// Element at a full multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.buffer.as_slice()[self.shape.offset(index)?])
    }

    /// Overwrite the element at a full multi-dimensional index.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let offset = self.shape.offset(index)?;
        self.buffer.as_mut_slice()[offset] = value;
        Ok(())
    }

    /// The single value of a one-element tensor.
    pub fn item(&self) -> Result<T> {
        match self.as_slice() {
            [v] => Ok(*v),
            _ => Err(TensorError::ShapeMismatch {
                expected: vec![],
                got: self.dims().to_vec(),
            }),
        }
    }

    // =========================================================================
    // Views (no copy)
    // =========================================================================

    /// Whole-tensor read view.
    pub fn as_view(&self) -> TensorView<'_, T> {
        TensorView {
            data: self.buffer.as_slice(),
            shape: self.shape.clone(),
        }
    }

    /// Whole-tensor mutable view.
    pub fn as_view_mut(&mut self) -> TensorViewMut<'_, T> {
        TensorViewMut {
            data: self.buffer.as_mut_slice(),
            shape: self.shape.clone(),
        }
    }

    /// View with the leading axes fixed to `prefix`.
    ///
    /// For any prefix shorter than the rank the result starts on a block
    /// boundary and spans whole blocks of the parent buffer.
    pub fn view(&self, prefix: &[usize]) -> Result<TensorView<'_, T>> {
        let (range, inner) = narrow(&self.shape, prefix)?;
        Ok(TensorView {
            data: self.block_slice(range),
            shape: inner,
        })
    }

    /// Mutable view with the leading axes fixed to `prefix`.
    pub fn view_mut(&mut self, prefix: &[usize]) -> Result<TensorViewMut<'_, T>> {
        let (range, inner) = narrow(&self.shape, prefix)?;
        let data = if inner.is_scalar() {
            &mut self.buffer.as_mut_slice()[range]
        } else {
            let bs = self.buffer.block_size();
            self.buffer.block_range_mut(range.start / bs, range.len() / bs)
        };
        Ok(TensorViewMut { data, shape: inner })
    }

    /// View of index `i` along the leading axis.
    pub fn row(&self, i: usize) -> Result<TensorView<'_, T>> {
        self.view(&[i])
    }

    /// Mutable view of index `i` along the leading axis.
    pub fn row_mut(&mut self, i: usize) -> Result<TensorViewMut<'_, T>> {
        self.view_mut(&[i])
    }

    /// Disjoint mutable views over every index of the leading axis.
    pub fn rows_mut(&mut self) -> Result<impl Iterator<Item = TensorViewMut<'_, T>>> {
        let shape = self.shape.clone();
        rows_mut_of(self.buffer.as_mut_slice(), &shape)
    }

    fn block_slice(&self, range: Range<usize>) -> &[T] {
        let bs = self.buffer.block_size();
        if range.start % bs == 0 && range.len() % bs == 0 {
            self.buffer.block_range(range.start / bs, range.len() / bs)
        } else {
            &self.buffer.as_slice()[range]
        }
    }

    // =========================================================================
    // Layout changes
    // =========================================================================

    /// Reinterpret with a new shape (`-1` infers, `0` copies the input dim).
    ///
    /// No data moves. When the trailing dimension is unchanged the buffer is
    /// reused as-is; otherwise its tiling is rebuilt for the new row length.
    pub fn reshape(self, target: &[i64]) -> Result<Tensor<T>> {
        let shape = self.shape.resolve_reshape(target)?;
        self.into_shape(shape)
    }

    /// Reinterpret with explicit dims; the element count must match.
    pub fn into_shape(self, shape: Shape) -> Result<Tensor<T>> {
        if shape.numel() != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: self.dims().to_vec(),
            });
        }
        let buffer = if shape.row_len() == self.shape.row_len() {
            self.buffer
        } else {
            self.buffer.retile(block_size_for(shape.row_len()))?
        };
        Ok(Tensor { buffer, shape })
    }

    /// Copying reshape of a shared tensor.
    pub fn reshaped(&self, target: &[i64]) -> Result<Tensor<T>> {
        self.clone().reshape(target)
    }

    /// Reorder axes by `perm`, rebuilding storage in the new row-major order.
    pub fn transpose(&self, perm: &[usize]) -> Result<Tensor<T>> {
        validate_perm(perm, self.ndim())?;
        if perm.iter().enumerate().all(|(i, &p)| i == p) {
            return Ok(self.clone());
        }
        let out_shape = self.shape.permuted(perm)?;
        // source stride for each output axis
        let src_strides: Vec<usize> = perm.iter().map(|&p| self.shape.strides()[p]).collect();
        let src = self.as_slice();
        let mut data = Vec::with_capacity(self.numel());
        let mut index = vec![0usize; out_shape.ndim()];
        for _ in 0..out_shape.numel() {
            let offset: usize = index.iter().zip(&src_strides).map(|(i, s)| i * s).sum();
            data.push(src[offset]);
            increment_index(&mut index, out_shape.dims());
        }
        Tensor::from_vec(data, out_shape.dims())
    }

    /// Swap the last two axes.
    pub fn t(&self) -> Result<Tensor<T>> {
        let n = self.ndim();
        if n < 2 {
            return Err(TensorError::RankMismatch { expected: 2, got: n });
        }
        let mut perm: Vec<usize> = (0..n).collect();
        perm.swap(n - 2, n - 1);
        self.transpose(&perm)
    }

    /// Copy out a sub-block given one half-open range per leading axis.
    /// Axes without a range are taken whole.
    pub fn slice(&self, ranges: &[Range<usize>]) -> Result<Tensor<T>> {
        if ranges.len() > self.ndim() {
            return Err(TensorError::RankMismatch {
                expected: self.ndim(),
                got: ranges.len(),
            });
        }
        let dims = self.dims();
        let mut out_dims = dims.to_vec();
        for (axis, r) in ranges.iter().enumerate() {
            if r.start > r.end || r.end > dims[axis] {
                return Err(TensorError::IndexOutOfBounds {
                    index: vec![r.start, r.end],
                    shape: dims.to_vec(),
                });
            }
            out_dims[axis] = r.len();
        }
        let mut data = Vec::with_capacity(out_dims.iter().product());
        slice_into(self.as_view(), ranges, &mut data);
        Tensor::from_vec(data, &out_dims)
    }

    /// Apply `f` to every element, producing a new tensor of the same shape.
    pub fn map<U: Element>(&self, f: impl Fn(T) -> U) -> Tensor<U> {
        self.as_view().map(f)
    }

    /// Apply `f` to every element in place.
    pub fn map_inplace(&mut self, f: impl Fn(T) -> T) {
        self.as_mut_slice().iter_mut().for_each(|v| *v = f(*v));
    }
}

fn slice_into<T: Element>(view: TensorView<'_, T>, ranges: &[Range<usize>], out: &mut Vec<T>) {
    match ranges.split_first() {
        None => out.extend_from_slice(view.as_slice()),
        Some((r, rest)) if view.ndim() == 1 => {
            debug_assert!(rest.is_empty());
            out.extend_from_slice(&view.as_slice()[r.clone()]);
        }
        Some((r, rest)) => {
            for i in r.clone() {
                if let Ok(row) = view.row(i) {
                    slice_into(row, rest, out);
                }
            }
        }
    }
}

/// Advance a row-major multi-index by one.
pub(crate) fn increment_index(index: &mut [usize], dims: &[usize]) {
    for axis in (0..index.len()).rev() {
        index[axis] += 1;
        if index[axis] < dims[axis] {
            return;
        }
        index[axis] = 0;
    }
}

fn rows_mut_of<'a, T: Element>(
    data: &'a mut [T],
    shape: &Shape,
) -> Result<impl Iterator<Item = TensorViewMut<'a, T>>> {
    let n = shape.dim(0).ok_or(TensorError::RankMismatch {
        expected: 1,
        got: 0,
    })?;
    let inner = shape.trailing(1);
    let len = inner.numel();
    let mut rest = data;
    Ok((0..n).map(move |_| {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        rest = tail;
        TensorViewMut {
            data: head,
            shape: inner.clone(),
        }
    }))
}

impl<'a, T: Element> TensorView<'a, T> {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.is_scalar()
    }

    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Block size this view is tiled with.
    pub fn block_size(&self) -> usize {
        block_size_for(self.shape.row_len())
    }

    /// Iterate over the view's blocks.
    pub fn blocks(&self) -> std::slice::ChunksExact<'a, T> {
        self.data.chunks_exact(self.block_size())
    }

    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.data[self.shape.offset(index)?])
    }

    /// Sub-view with the leading axes fixed to `prefix`.
    pub fn view(&self, prefix: &[usize]) -> Result<TensorView<'a, T>> {
        let (range, inner) = narrow(&self.shape, prefix)?;
        Ok(TensorView {
            data: &self.data[range],
            shape: inner,
        })
    }

    pub fn row(&self, i: usize) -> Result<TensorView<'a, T>> {
        self.view(&[i])
    }

    /// Same data under a shape with the same element count.
    pub fn reinterpret(&self, shape: Shape) -> Result<TensorView<'a, T>> {
        if shape.numel() != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.dims().to_vec(),
                got: self.dims().to_vec(),
            });
        }
        Ok(TensorView {
            data: self.data,
            shape,
        })
    }

    /// Copy the view into a new owned tensor.
    pub fn to_owned(&self) -> Tensor<T> {
        Tensor {
            buffer: TiledBuffer::for_rows(self.data.to_vec(), self.shape.row_len()),
            shape: self.shape.clone(),
        }
    }

    pub fn map<U: Element>(&self, f: impl Fn(T) -> U) -> Tensor<U> {
        let data: Vec<U> = self.data.iter().map(|&v| f(v)).collect();
        Tensor {
            buffer: TiledBuffer::for_rows(data, self.shape.row_len()),
            shape: self.shape.clone(),
        }
    }
}

impl<'a, T: Element> TensorViewMut<'a, T> {
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    pub fn as_slice(&self) -> &[T] {
        self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }

    /// Consume the view, keeping the borrow of the parent's elements.
    pub fn into_slice(self) -> &'a mut [T] {
        self.data
    }

    pub fn get(&self, index: &[usize]) -> Result<T> {
        Ok(self.data[self.shape.offset(index)?])
    }

    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let offset = self.shape.offset(index)?;
        self.data[offset] = value;
        Ok(())
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Mutable sub-view of index `i` along the leading axis.
    pub fn row_mut(&mut self, i: usize) -> Result<TensorViewMut<'_, T>> {
        let (range, inner) = narrow(&self.shape, &[i])?;
        Ok(TensorViewMut {
            data: &mut self.data[range],
            shape: inner,
        })
    }

    /// Split into disjoint mutable views along the leading axis.
    pub fn into_rows(self) -> Result<impl Iterator<Item = TensorViewMut<'a, T>>> {
        let TensorViewMut { data, shape } = self;
        rows_mut_of(data, &shape)
    }

    /// Split at leading index `mid` into two disjoint mutable views.
    pub fn split_rows_mut(self, mid: usize) -> Result<(TensorViewMut<'a, T>, TensorViewMut<'a, T>)> {
        let TensorViewMut { data, shape } = self;
        let n = shape.dim(0).ok_or(TensorError::RankMismatch {
            expected: 1,
            got: 0,
        })?;
        if mid > n {
            return Err(TensorError::IndexOutOfBounds {
                index: vec![mid],
                shape: shape.dims().to_vec(),
            });
        }
        let (a, b) = data.split_at_mut(mid * shape.strides()[0]);
        let mut dims_a = shape.dims().to_vec();
        let mut dims_b = dims_a.clone();
        dims_a[0] = mid;
        dims_b[0] = n - mid;
        Ok((
            TensorViewMut {
                data: a,
                shape: Shape::from(dims_a),
            },
            TensorViewMut {
                data: b,
                shape: Shape::from(dims_b),
            },
        ))
    }
}

impl<T: Element> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, dtype={}, block_size={})",
            self.shape,
            T::DTYPE,
            self.buffer.block_size()
        )
    }
}

impl<T: Element> fmt::Debug for TensorView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorView(shape={}, dtype={})", self.shape, T::DTYPE)
    }
}

impl<T: Element> fmt::Debug for TensorViewMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TensorViewMut(shape={}, dtype={})", self.shape, T::DTYPE)
    }
}

impl<'a, T: Element> From<&'a Tensor<T>> for TensorView<'a, T> {
    fn from(t: &'a Tensor<T>) -> Self {
        t.as_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iota(dims: &[usize]) -> Tensor<f32> {
        Tensor::from_fn(dims, |i| i as f32)
    }

    #[test]
    fn test_from_vec_validates_len() {
        assert!(Tensor::from_vec(vec![1.0f32, 2.0, 3.0], &[2, 2]).is_err());
        let t = Tensor::from_vec(vec![1i32, 2, 3, 4], &[2, 2]).unwrap();
        assert_eq!(t.dtype(), DType::I32);
        assert_eq!(t.get(&[1, 0]).unwrap(), 3);
    }

    #[test]
    fn test_scalar() {
        let s = Tensor::scalar(2.5f64);
        assert!(s.is_scalar());
        assert_eq!(s.numel(), 1);
        assert_eq!(s.item().unwrap(), 2.5);
        assert_eq!(s.get(&[]).unwrap(), 2.5);
    }

    #[test]
    fn test_block_layout_follows_rows() {
        let t = iota(&[3, 128]);
        assert_eq!(t.buffer().block_size(), 64);
        assert_eq!(t.buffer().blocks_num(), 6);
        let small = iota(&[4, 5]);
        assert_eq!(small.buffer().block_size(), 5);
    }

    #[test]
    fn test_view_shares_blocks() {
        let t = iota(&[2, 3, 128]);
        let v = t.view(&[1, 2]).unwrap();
        assert_eq!(v.dims(), &[128]);
        assert_eq!(v.as_slice()[0], (3 * 128 + 2 * 128) as f32);
        assert_eq!(v.blocks().count(), 2);
        // same memory, not a copy
        let parent = t.as_slice();
        let offset = (v.as_slice().as_ptr() as usize - parent.as_ptr() as usize) / 4;
        assert_eq!(offset, 5 * 128);
    }

    #[test]
    fn test_nested_view() {
        let t = iota(&[2, 3, 4]);
        let row = t.row(1).unwrap();
        let inner = row.row(2).unwrap();
        assert_eq!(inner.as_slice(), &[20.0, 21.0, 22.0, 23.0]);
        assert_eq!(inner.get(&[3]).unwrap(), 23.0);
        assert!(t.row(2).is_err());
    }

    #[test]
    fn test_mutable_view_writes_through() {
        let mut t = Tensor::<i32>::zeros(&[3, 4]);
        {
            let mut v = t.row_mut(1).unwrap();
            v.fill(7);
            v.set(&[0], 1).unwrap();
        }
        assert_eq!(t.get(&[1, 0]).unwrap(), 1);
        assert_eq!(t.get(&[1, 3]).unwrap(), 7);
        assert_eq!(t.get(&[0, 0]).unwrap(), 0);
        assert_eq!(t.get(&[2, 0]).unwrap(), 0);
    }

    #[test]
    fn test_rows_mut_are_disjoint() {
        let mut t = Tensor::<i64>::zeros(&[3, 2]);
        for (i, mut row) in t.rows_mut().unwrap().enumerate() {
            row.fill(i as i64 + 1);
        }
        assert_eq!(t.as_slice(), &[1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_split_rows_mut() {
        let mut t = Tensor::<u8>::zeros(&[4, 2]);
        let (mut a, mut b) = t.as_view_mut().split_rows_mut(1).unwrap();
        a.fill(1);
        b.fill(2);
        assert_eq!(b.dims(), &[3, 2]);
        assert_eq!(t.as_slice(), &[1, 1, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_reshape_same_row_is_noop() {
        let t = iota(&[4, 6]);
        let ptr = t.as_slice().as_ptr();
        let r = t.reshape(&[2, 2, 6]).unwrap();
        assert_eq!(r.as_slice().as_ptr(), ptr);
        assert_eq!(r.buffer().block_size(), 6);
    }

    #[test]
    fn test_reshape_new_row_retiles() {
        let t = iota(&[2, 128]);
        let r = t.reshape(&[-1, 32]).unwrap();
        assert_eq!(r.dims(), &[8, 32]);
        assert_eq!(r.buffer().block_size(), 32);
        assert_eq!(r.get(&[7, 31]).unwrap(), 255.0);
    }

    #[test]
    fn test_transpose() {
        let t = iota(&[2, 3]);
        let tt = t.t().unwrap();
        assert_eq!(tt.dims(), &[3, 2]);
        assert_eq!(tt.as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);

        let t3 = iota(&[2, 3, 4]);
        let p = t3.transpose(&[2, 0, 1]).unwrap();
        assert_eq!(p.dims(), &[4, 2, 3]);
        for a in 0..2 {
            for b in 0..3 {
                for c in 0..4 {
                    assert_eq!(p.get(&[c, a, b]).unwrap(), t3.get(&[a, b, c]).unwrap());
                }
            }
        }
        assert!(iota(&[3]).t().is_err());
    }

    #[test]
    fn test_slice() {
        let t = iota(&[3, 4]);
        let s = t.slice(&[1..3, 1..3]).unwrap();
        assert_eq!(s.dims(), &[2, 2]);
        assert_eq!(s.as_slice(), &[5.0, 6.0, 9.0, 10.0]);
        let rows = t.slice(&[2..3]).unwrap();
        assert_eq!(rows.as_slice(), &[8.0, 9.0, 10.0, 11.0]);
        assert!(t.slice(&[0..5]).is_err());
    }

    #[test]
    fn test_zero_sized() {
        let mut t = Tensor::<f32>::zeros(&[3, 0]);
        assert_eq!(t.numel(), 0);
        assert_eq!(t.rows_mut().unwrap().count(), 3);
        assert_eq!(t.row(2).unwrap().numel(), 0);
    }

    #[test]
    fn test_view_to_owned_and_map() {
        let t = iota(&[2, 2]);
        let owned = t.row(1).unwrap().to_owned();
        assert_eq!(owned.as_slice(), &[2.0, 3.0]);
        let doubled = t.map(|v| (v * 2.0) as i32);
        assert_eq!(doubled.as_slice(), &[0, 2, 4, 6]);
    }
}
