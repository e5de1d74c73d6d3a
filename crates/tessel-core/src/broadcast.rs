//! Shape unification and broadcast evaluation.
//!
//! Operands are right-aligned and padded with leading size-1 axes. When all
//! aligned shapes already match the kernel runs over whole blocks; otherwise
//! the leading axis is peeled recursively, replaying size-1 operands and
//! slicing matching ones, until the remaining shapes match. No operand is ever
//! materialized at the full broadcast shape.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::dtype::Element;
use crate::error::TensorError;
use crate::shape::{Dims, Shape};
use crate::tensor::{Tensor, TensorView, TensorViewMut};
use crate::Result;

/// Output element count above which rows are spread over the worker pool.
pub(crate) const PAR_THRESHOLD: usize = 1 << 15;

/// Blocks handed to one task on the flat path.
const BLOCKS_PER_TASK: usize = 64;

/// Unify any number of shapes under numpy broadcasting rules.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Dims> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out: Dims = SmallVec::from_elem(1, rank);
    for shape in shapes {
        let pad = rank - shape.len();
        for (i, &d) in shape.iter().enumerate() {
            let axis = pad + i;
            let cur = out[axis];
            if d == cur || d == 1 {
                continue;
            }
            if cur == 1 {
                out[axis] = d;
            } else {
                return Err(TensorError::Broadcast {
                    shapes: shapes.iter().map(|s| s.to_vec()).collect(),
                    axis,
                    a: cur,
                    b: d,
                });
            }
        }
    }
    Ok(out)
}

/// Pad `view` with leading size-1 axes up to `rank`.
fn align<'a, T: Element>(view: &TensorView<'a, T>, rank: usize) -> Result<TensorView<'a, T>> {
    view.reinterpret(view.shape().unsqueezed_to(rank))
}

/// Combine two operands elementwise under broadcasting.
pub fn broadcast_binary<A, B, R, F>(a: TensorView<'_, A>, b: TensorView<'_, B>, f: F) -> Result<Tensor<R>>
where
    A: Element,
    B: Element,
    R: Element,
    F: Fn(A, B) -> R + Sync,
{
    let dims = broadcast_shapes(&[a.dims(), b.dims()])?;
    let a = align(&a, dims.len())?;
    let b = align(&b, dims.len())?;
    let mut out = Tensor::<R>::zeros(&dims);
    zip_into(&a, &b, out.as_view_mut(), &f, true)?;
    Ok(out)
}

fn zip_into<A, B, R, F>(
    a: &TensorView<'_, A>,
    b: &TensorView<'_, B>,
    mut out: TensorViewMut<'_, R>,
    f: &F,
    parallel: bool,
) -> Result<()>
where
    A: Element,
    B: Element,
    R: Element,
    F: Fn(A, B) -> R + Sync,
{
    let parallel = parallel && out.numel() >= PAR_THRESHOLD;
    if a.dims() == out.dims() && b.dims() == out.dims() {
        flat_zip(a.as_slice(), b.as_slice(), out.as_mut_slice(), a.block_size(), f, parallel);
        return Ok(());
    }
    if a.numel() == 1 && b.dims() == out.dims() {
        let x = a.as_slice()[0];
        for (o, &y) in out.as_mut_slice().iter_mut().zip(b.as_slice()) {
            *o = f(x, y);
        }
        return Ok(());
    }
    if b.numel() == 1 && a.dims() == out.dims() {
        let y = b.as_slice()[0];
        for (o, &x) in out.as_mut_slice().iter_mut().zip(a.as_slice()) {
            *o = f(x, y);
        }
        return Ok(());
    }

    let replay_a = a.dims()[0] == 1;
    let replay_b = b.dims()[0] == 1;
    let step = |(i, row): (usize, TensorViewMut<'_, R>)| -> Result<()> {
        let ar = a.row(if replay_a { 0 } else { i })?;
        let br = b.row(if replay_b { 0 } else { i })?;
        zip_into(&ar, &br, row, f, false)
    };
    if parallel {
        let rows: Vec<_> = out.into_rows()?.collect();
        rows.into_par_iter().enumerate().try_for_each(step)
    } else {
        out.into_rows()?.enumerate().try_for_each(step)
    }
}

fn flat_zip<A, B, R, F>(a: &[A], b: &[B], out: &mut [R], block_size: usize, f: &F, parallel: bool)
where
    A: Element,
    B: Element,
    R: Element,
    F: Fn(A, B) -> R + Sync,
{
    let kernel = |(o, (x, y)): (&mut [R], (&[A], &[B]))| {
        for ((o, &x), &y) in o.iter_mut().zip(x).zip(y) {
            *o = f(x, y);
        }
    };
    if parallel {
        let chunk = block_size * BLOCKS_PER_TASK;
        out.par_chunks_mut(chunk)
            .zip(a.par_chunks(chunk).zip(b.par_chunks(chunk)))
            .for_each(kernel);
    } else {
        kernel((out, (a, b)));
    }
}

/// Update `dest` in place with a broadcast operand: `dest[i] = f(dest[i], src[j])`.
///
/// The destination never changes shape; if broadcasting would require it to
/// grow (including a 0-d destination against a non-scalar source) the call
/// fails with [`TensorError::InPlaceResize`].
pub fn broadcast_assign<T, B, F>(dest: &mut Tensor<T>, src: TensorView<'_, B>, op: &'static str, f: F) -> Result<()>
where
    T: Element,
    B: Element,
    F: Fn(T, B) -> T + Sync,
{
    let dims = broadcast_shapes(&[dest.dims(), src.dims()])?;
    if dims.as_slice() != dest.dims() {
        return Err(TensorError::InPlaceResize {
            op,
            dest: dest.dims().to_vec(),
            required: dims.to_vec(),
        });
    }
    let src = align(&src, dims.len())?;
    assign_into(dest.as_view_mut(), &src, &f)
}

fn assign_into<T, B, F>(mut dest: TensorViewMut<'_, T>, src: &TensorView<'_, B>, f: &F) -> Result<()>
where
    T: Element,
    B: Element,
    F: Fn(T, B) -> T + Sync,
{
    if src.dims() == dest.dims() {
        for (d, &s) in dest.as_mut_slice().iter_mut().zip(src.as_slice()) {
            *d = f(*d, s);
        }
        return Ok(());
    }
    if src.numel() == 1 {
        let s = src.as_slice()[0];
        dest.as_mut_slice().iter_mut().for_each(|d| *d = f(*d, s));
        return Ok(());
    }
    let replay = src.dims()[0] == 1;
    for (i, row) in dest.into_rows()?.enumerate() {
        assign_into(row, &src.row(if replay { 0 } else { i })?, f)?;
    }
    Ok(())
}

/// Materialize `src` at the broadcast shape `dims`.
pub fn broadcast_to<T: Element>(src: TensorView<'_, T>, dims: &[usize]) -> Result<Tensor<T>> {
    let unified = broadcast_shapes(&[src.dims(), dims])?;
    if unified.as_slice() != dims {
        return Err(TensorError::ShapeMismatch {
            expected: dims.to_vec(),
            got: src.dims().to_vec(),
        });
    }
    let src = align(&src, dims.len())?;
    let mut out = Tensor::<T>::zeros(dims);
    expand_into(&src, out.as_view_mut())?;
    Ok(out)
}

fn expand_into<T: Element>(src: &TensorView<'_, T>, mut out: TensorViewMut<'_, T>) -> Result<()> {
    if src.dims() == out.dims() {
        out.as_mut_slice().copy_from_slice(src.as_slice());
        return Ok(());
    }
    if src.numel() == 1 {
        out.fill(src.as_slice()[0]);
        return Ok(());
    }
    let replay = src.dims()[0] == 1;
    for (i, row) in out.into_rows()?.enumerate() {
        expand_into(&src.row(if replay { 0 } else { i })?, row)?;
    }
    Ok(())
}

/// Right-aligned batch shape shared by two operands' leading axes.
pub fn broadcast_batch(a: &Shape, b: &Shape, trailing: usize) -> Result<Dims> {
    let lead = |s: &Shape| s.dims()[..s.ndim().saturating_sub(trailing)].to_vec();
    broadcast_shapes(&[&lead(a), &lead(b)])
}
