//! # vitset-core
//!
//! Shapes, element types and a small CPU tensor for vitset.
//!
//! This crate provides:
//! - [`Tensor`] — contiguous, row-major n-dimensional array
//! - [`Shape`] — dimension sizes and contiguous strides
//! - [`DType`] / [`WithDType`] — element types (F32, F64, U8, U32, I64)
//! - [`Error`] / [`Result`] — the error type shared by all tensor operations
// The tensor here only does what batch assembly needs: build from a flat
// buffer, index into it, and stack along a new dimension.

pub mod dtype;
pub mod error;
pub mod shape;
pub mod tensor;

pub use dtype::{DType, WithDType};
pub use error::{Error, Result};
pub use shape::Shape;
pub use tensor::Tensor;
