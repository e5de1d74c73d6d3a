//! Numeric properties of the tensor engine, checked against naive references.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tessel_core::broadcast::broadcast_to;
use tessel_core::ops::quantize::{dequantize_linear, dynamic_quantize_linear};
use tessel_core::{Tensor, TensorError};

fn assert_close(a: &[f32], b: &[f32], tol: f32) {
    assert_eq!(a.len(), b.len(), "length mismatch: {} vs {}", a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        assert!(
            (x - y).abs() <= tol,
            "element {} differs: {} vs {} (tol={})",
            i, x, y, tol
        );
    }
}

fn random(rng: &mut StdRng, dims: &[usize]) -> Tensor<f32> {
    Tensor::from_fn(dims, |_| rng.gen_range(-4.0f32..4.0))
}

// ============================================================================
// Broadcasting
// ============================================================================

#[test]
fn test_broadcast_4x1x3_plus_1x5x3() {
    let mut rng = StdRng::seed_from_u64(7);
    let a = random(&mut rng, &[4, 1, 3]);
    let b = random(&mut rng, &[1, 5, 3]);
    let c = a.add(&b).unwrap();
    assert_eq!(c.dims(), &[4, 5, 3]);
    for i in 0..4 {
        for j in 0..5 {
            for k in 0..3 {
                let expected = a.get(&[i, 0, k]).unwrap() + b.get(&[0, j, k]).unwrap();
                assert_eq!(c.get(&[i, j, k]).unwrap(), expected);
            }
        }
    }
}

#[test]
fn test_scalar_fast_path_matches_broadcast() {
    let mut rng = StdRng::seed_from_u64(11);
    let t = random(&mut rng, &[3, 4, 70]);
    let s = Tensor::scalar(1.25f32);
    let fast = t.mul(&s).unwrap();
    let expanded = broadcast_to(s.reshaped(&[1, 1, 1]).unwrap().as_view(), t.dims()).unwrap();
    let slow = t.mul(&expanded).unwrap();
    assert_eq!(fast, slow);

    let fast = s.sub(&t).unwrap();
    let slow = expanded.sub(&t).unwrap();
    assert_eq!(fast, slow);
}

#[test]
fn test_incompatible_shapes() {
    let a = Tensor::<f32>::zeros(&[2, 3]);
    let b = Tensor::<f32>::zeros(&[4, 3]);
    assert!(matches!(a.add(&b), Err(TensorError::Broadcast { .. })));
}

// ============================================================================
// Matmul
// ============================================================================

#[test]
fn test_matmul_2x3_3x4() {
    let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    let b = Tensor::from_fn(&[3, 4], |i| i as f32);
    let c = a.matmul(&b).unwrap();
    assert_eq!(c.dims(), &[2, 4]);
    assert_eq!(c.as_slice(), &[32.0, 38.0, 44.0, 50.0, 68.0, 83.0, 98.0, 113.0]);
}

#[test]
fn test_matmul_batched_2x2x3_2x3x4() {
    let mut rng = StdRng::seed_from_u64(3);
    let a = random(&mut rng, &[2, 2, 3]);
    let b = random(&mut rng, &[2, 3, 4]);
    let c = a.matmul(&b).unwrap();
    assert_eq!(c.dims(), &[2, 2, 4]);
    for batch in 0..2 {
        let lhs = a.row(batch).unwrap().to_owned();
        let rhs = b.row(batch).unwrap().to_owned();
        let expected = lhs.matmul(&rhs).unwrap();
        assert_eq!(c.row(batch).unwrap().as_slice(), expected.as_slice());
    }
}

#[test]
fn test_matmul_parallel_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random(&mut rng, &[96, 200]);
    let b = random(&mut rng, &[200, 80]);
    let first = a.matmul(&b).unwrap();
    for _ in 0..3 {
        assert_eq!(a.matmul(&b).unwrap(), first);
    }
}

// ============================================================================
// Quantization
// ============================================================================

#[test]
fn test_quantize_round_trip_within_half_scale() {
    let mut rng = StdRng::seed_from_u64(42);
    let x = random(&mut rng, &[16, 33]);
    let q = dynamic_quantize_linear(&x).unwrap();
    let scale = Tensor::scalar(q.scale);
    let zp = Tensor::scalar(q.zero_point);
    let back = dequantize_linear(&q.values, &scale, Some(&zp), 0).unwrap();
    assert_close(back.as_slice(), x.as_slice(), q.scale / 2.0 + 1e-5);
}

#[test]
fn test_quantize_round_trip_full_range_with_endpoints() {
    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data: Vec<f32> = (0..7 * 19).map(|_| rng.gen_range(-10.0f32..=10.0)).collect();
        data[0] = -10.0;
        data[7 * 19 - 1] = 10.0;
        let x = Tensor::from_vec(data, &[7, 19]).unwrap();

        let q = dynamic_quantize_linear(&x).unwrap();
        assert_close(&[q.scale], &[20.0 / 255.0], 1e-6);
        assert!((0..=255).contains(&i32::from(q.zero_point)));
        // the zero point is where 0.0 lands
        assert_close(&[q.zero_point as f32 * q.scale], &[10.0], q.scale);

        let back = dequantize_linear(&q.values, &Tensor::scalar(q.scale), Some(&Tensor::scalar(q.zero_point)), 0).unwrap();
        assert_close(back.as_slice(), x.as_slice(), q.scale / 2.0 + 1e-5);
    }
}

// ============================================================================
// Views
// ============================================================================

#[test]
fn test_view_aliasing() {
    let mut t = Tensor::<f32>::zeros(&[4, 128]);
    {
        let mut row = t.row_mut(2).unwrap();
        row.set(&[5], 9.0).unwrap();
    }
    let view = t.view(&[2]).unwrap();
    assert_eq!(view.get(&[5]).unwrap(), 9.0);
    assert_eq!(t.get(&[2, 5]).unwrap(), 9.0);
    let base = t.as_slice().as_ptr() as usize;
    let start = view.as_slice().as_ptr() as usize;
    assert_eq!((start - base) / std::mem::size_of::<f32>(), 2 * 128);
    assert_eq!(view.blocks().count(), 2);
}
