use smallvec::SmallVec;
use std::fmt;

use crate::error::TensorError;
use crate::Result;

/// Dimension list with stack storage for the common rank <= 4 case.
pub type Dims = SmallVec<[usize; 4]>;

/// Immutable strided shape: dimension sizes plus derived row-major strides.
///
/// `strides[i]` is the number of elements skipped per unit step along axis `i`,
/// i.e. the product of all trailing dimensions. A shape with no dimensions is a
/// scalar and holds exactly one element.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Dims,
    strides: Dims,
}

impl Shape {
    /// Create a new shape from dimensions.
    pub fn new(dims: &[usize]) -> Self {
        Self::from_dims(SmallVec::from_slice(dims))
    }

    fn from_dims(dims: Dims) -> Self {
        let strides = contiguous_strides(&dims);
        Self { dims, strides }
    }

    /// Scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
            strides: SmallVec::new(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements. A scalar has one.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    /// Dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Row-major strides, in elements.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Size of a specific dimension.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    /// Size of the last (contiguous) dimension; 1 for scalars.
    pub fn row_len(&self) -> usize {
        self.dims.last().copied().unwrap_or(1)
    }

    /// Whether this is a scalar (0-dimensional).
    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Linear offset of a full multi-dimensional index.
    pub fn offset(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.ndim() {
            return Err(TensorError::RankMismatch {
                expected: self.ndim(),
                got: index.len(),
            });
        }
        self.prefix_offset(index)
    }

    /// Linear offset of an index prefix (leading axes only).
    pub fn prefix_offset(&self, prefix: &[usize]) -> Result<usize> {
        if prefix.len() > self.ndim() {
            return Err(TensorError::RankMismatch {
                expected: self.ndim(),
                got: prefix.len(),
            });
        }
        let mut offset = 0;
        for (axis, &i) in prefix.iter().enumerate() {
            if i >= self.dims[axis] {
                return Err(TensorError::IndexOutOfBounds {
                    index: prefix.to_vec(),
                    shape: self.dims.to_vec(),
                });
            }
            offset += i * self.strides[axis];
        }
        Ok(offset)
    }

    /// Shape left after fixing the leading `n` axes.
    pub fn trailing(&self, n: usize) -> Shape {
        Shape::new(&self.dims[n.min(self.ndim())..])
    }

    /// Shape padded with leading size-1 axes up to `rank`.
    pub fn unsqueezed_to(&self, rank: usize) -> Shape {
        if rank <= self.ndim() {
            return self.clone();
        }
        let mut dims: Dims = SmallVec::from_elem(1, rank - self.ndim());
        dims.extend_from_slice(&self.dims);
        Shape::from_dims(dims)
    }

    /// Normalize a possibly negative axis into `0..ndim`.
    pub fn normalize_axis(&self, axis: isize) -> Result<usize> {
        normalize_axis(axis, self.ndim())
    }

    /// Resolve an ONNX-style reshape target.
    ///
    /// `-1` infers one dimension from the remaining element count and `0`
    /// copies the corresponding input dimension.
    pub fn resolve_reshape(&self, target: &[i64]) -> Result<Shape> {
        let invalid = || TensorError::InvalidReshape {
            numel: self.numel(),
            shape: target.to_vec(),
        };
        let mut inferred = None;
        let mut dims: Dims = SmallVec::with_capacity(target.len());
        for (i, &d) in target.iter().enumerate() {
            match d {
                -1 => {
                    if inferred.replace(i).is_some() {
                        return Err(invalid());
                    }
                    dims.push(1);
                }
                0 => dims.push(self.dim(i).ok_or_else(invalid)?),
                d if d > 0 => dims.push(d as usize),
                _ => return Err(invalid()),
            }
        }
        let known: usize = dims.iter().product();
        if let Some(idx) = inferred {
            if known == 0 || self.numel() % known != 0 {
                return Err(invalid());
            }
            dims[idx] = self.numel() / known;
        }
        let resolved = Shape::from_dims(dims);
        if resolved.numel() != self.numel() {
            return Err(invalid());
        }
        Ok(resolved)
    }

    /// Shape with axes reordered by `perm`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Shape> {
        validate_perm(perm, self.ndim())?;
        Ok(Shape::from_dims(perm.iter().map(|&p| self.dims[p]).collect()))
    }

    /// Broadcast this shape with another. See [`crate::broadcast::broadcast_shapes`].
    pub fn broadcast_with(&self, other: &Shape) -> Result<Shape> {
        crate::broadcast::broadcast_shapes(&[self.dims(), other.dims()]).map(Shape::from)
    }
}

/// Row-major strides for `dims`.
pub fn contiguous_strides(dims: &[usize]) -> Dims {
    let ndim = dims.len();
    let mut strides: Dims = SmallVec::from_elem(1, ndim);
    for i in (0..ndim.saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Normalize a possibly negative axis into `0..ndim`.
pub fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    if resolved < 0 || resolved as usize >= ndim {
        return Err(TensorError::InvalidAxis { axis, ndim });
    }
    Ok(resolved as usize)
}

pub(crate) fn validate_perm(perm: &[usize], ndim: usize) -> Result<()> {
    if perm.len() != ndim {
        return Err(TensorError::RankMismatch {
            expected: ndim,
            got: perm.len(),
        });
    }
    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || std::mem::replace(&mut seen[p], true) {
            return Err(TensorError::InvalidArgument(format!(
                "{perm:?} is not a permutation of 0..{ndim}"
            )));
        }
    }
    Ok(())
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::from_dims(SmallVec::from_vec(dims))
    }
}

impl From<Dims> for Shape {
    fn from(dims: Dims) -> Self {
        Shape::from_dims(dims)
    }
}

macro_rules! impl_shape_from_array {
    ($($n:expr),*) => {
        $(
            impl From<[usize; $n]> for Shape {
                fn from(dims: [usize; $n]) -> Self {
                    Shape::new(&dims)
                }
            }
        )*
    };
}

impl_shape_from_array!(0, 1, 2, 3, 4, 5, 6);
