//! Benchmark: blocked matmul vs a naive triple loop, plus integer matmul.

use std::time::Instant;

use tessel_core::ops::quantize::{dynamic_quantize_linear, matmul_integer};
use tessel_core::Tensor;

fn naive(a: &[f32], b: &[f32], m: usize, n: usize, k: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        for p in 0..k {
            let a_val = a[i * k + p];
            for j in 0..n {
                c[i * n + j] += a_val * b[p * n + j];
            }
        }
    }
    c
}

fn bench_naive(a: &Tensor<f32>, b: &Tensor<f32>, m: usize, n: usize, k: usize, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let _ = naive(a.as_slice(), b.as_slice(), m, n, k);
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn bench_blocked(a: &Tensor<f32>, b: &Tensor<f32>, iters: usize) -> f64 {
    let start = Instant::now();
    for _ in 0..iters {
        let _ = a.matmul(b).unwrap();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn bench_integer(a: &Tensor<f32>, b: &Tensor<f32>, iters: usize) -> f64 {
    let qa = dynamic_quantize_linear(a).unwrap();
    let qb = dynamic_quantize_linear(b).unwrap();
    let a_zp = Tensor::scalar(qa.zero_point);
    let b_zp = Tensor::scalar(qb.zero_point);
    let start = Instant::now();
    for _ in 0..iters {
        let _ = matmul_integer(&qa.values, &qb.values, Some(&a_zp), Some(&b_zp)).unwrap();
    }
    start.elapsed().as_secs_f64() / iters as f64
}

fn gflops(m: usize, n: usize, k: usize, secs: f64) -> f64 {
    (2.0 * m as f64 * n as f64 * k as f64) / secs / 1e9
}

fn main() {
    println!("=== Tessel Matmul Benchmark ===");
    println!("threads: {}\n", rayon::current_num_threads());

    let sizes: &[(usize, usize, usize)] = &[
        (64, 64, 64),
        (128, 128, 128),
        (256, 256, 256),
        (512, 512, 512),
    ];

    println!("{:<12} {:>12} {:>12} {:>10} {:>12} {:>10}",
        "Size", "Naive (ms)", "Blocked (ms)", "Speedup", "Int8 (ms)", "GF/s");
    println!("{}", "-".repeat(72));

    for &(m, n, k) in sizes {
        let a = Tensor::from_fn(&[m, k], |i| ((i * 7 + 3) % 13) as f32 * 0.1 - 0.6);
        let b = Tensor::from_fn(&[k, n], |i| ((i * 11 + 5) % 17) as f32 * 0.1 - 0.8);

        let iters = if m <= 128 { 200 } else if m <= 256 { 20 } else { 5 };

        let naive_s = bench_naive(&a, &b, m, n, k, iters);
        let blocked_s = bench_blocked(&a, &b, iters);
        let int_s = bench_integer(&a, &b, iters);

        println!("{:<12} {:>10.3}ms {:>10.3}ms {:>9.1}x {:>10.3}ms {:>9.2}",
            format!("{}x{}x{}", m, n, k),
            naive_s * 1000.0,
            blocked_s * 1000.0,
            naive_s / blocked_s,
            int_s * 1000.0,
            gflops(m, n, k, blocked_s),
        );
    }
}
