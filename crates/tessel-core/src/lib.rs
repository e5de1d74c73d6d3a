//! # tessel-core
//!
//! Tiled tensor engine for the Tessel inference runtime.
//!
//! Provides the `Tensor` type with:
//! - Block-tiled contiguous storage for f32, f64, i8, u8, i32 and i64
//! - Borrowed views that share the parent's blocks without copying
//! - Numpy-style broadcasting by recursive leading-axis peeling
//! - Blocked matrix multiply, GEMM and integer matmul
//! - Dynamic and static linear quantization

pub mod any;
pub mod broadcast;
pub mod buffer;
pub mod dtype;
pub mod error;
pub mod ops;
pub mod shape;
pub mod tensor;

pub use any::AnyTensor;
pub use buffer::TiledBuffer;
pub use dtype::{DType, Element, Float, Numeric, Signed};
pub use error::TensorError;
pub use shape::Shape;
pub use tensor::{Tensor, TensorView, TensorViewMut};

pub type Result<T> = std::result::Result<T, TensorError>;
