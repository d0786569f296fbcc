use std::sync::Arc;

use crate::dtype::{DType, WithDType};
use crate::error::{Error, Result};
use crate::shape::Shape;

// Tensor — contiguous n-dimensional array on the CPU
//
// Data is stored row-major in a shared buffer. Cloning a Tensor only bumps the
// reference count, so samples can be handed between worker threads and
// collected into batches without copying pixel data twice.
//
// Every operation here returns a new tensor; there is no in-place mutation
// and no view machinery. `stack` is the one operation batch assembly relies
// on: N tensors of identical shape become one tensor with a new dimension.

/// A contiguous n-dimensional array with elements of type `T`.
///
/// # Example
/// ```
/// use vitset_core::Tensor;
///
/// let a = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], (2, 2))?;
/// let b = Tensor::from_vec(vec![5.0f32, 6.0, 7.0, 8.0], (2, 2))?;
/// let batch = Tensor::stack(&[a, b], 0)?;
/// assert_eq!(batch.dims(), &[2, 2, 2]);
/// # Ok::<(), vitset_core::Error>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct Tensor<T: WithDType> {
    data: Arc<Vec<T>>,
    shape: Shape,
}

impl<T: WithDType> std::fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor(shape={}, dtype={})", self.shape, T::DTYPE)
    }
}

impl<T: WithDType> Tensor<T> {
    // Constructors

    /// Create a tensor from a flat row-major buffer.
    ///
    /// Fails if `data.len()` differs from the element count of `shape`.
    pub fn from_vec(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count();
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: data.len(),
            });
        }
        Ok(Tensor {
            data: Arc::new(data),
            shape,
        })
    }

    /// A 1-D tensor holding `data`.
    pub fn vector(data: Vec<T>) -> Self {
        let shape = Shape::from(data.len());
        Tensor {
            data: Arc::new(data),
            shape,
        }
    }

    /// A tensor of the given shape filled with zeros.
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        let shape = shape.into();
        Tensor {
            data: Arc::new(vec![T::zero(); shape.elem_count()]),
            shape,
        }
    }

    // Accessors

    /// The shape of this tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// The dimensions as a slice (shortcut for shape().dims()).
    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Element type tag.
    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Total number of elements.
    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    /// The underlying row-major buffer.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Copy the data out into an owned vector.
    pub fn to_vec(&self) -> Vec<T> {
        self.data.as_ref().clone()
    }

    /// Element at the given multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        if index.len() != self.rank() {
            return Err(Error::RankMismatch {
                expected: self.rank(),
                got: index.len(),
            });
        }
        let strides = self.shape.stride_contiguous();
        let mut offset = 0;
        for (dim, (&i, &size)) in index.iter().zip(self.dims()).enumerate() {
            if i >= size {
                return Err(Error::IndexOutOfRange {
                    dim,
                    index: i,
                    size,
                });
            }
            offset += i * strides[dim];
        }
        Ok(self.data[offset])
    }

    // Stack — concatenate along a new dimension

    /// Stack tensors along a new dimension.
    ///
    /// All tensors must have the same shape. Inserts a new dimension at `dim`.
    /// `stack([a, b], dim=0)` where a,b are shape [2,3] → [2, 2, 3].
    pub fn stack(tensors: &[Self], dim: usize) -> Result<Self> {
        let first = tensors.first().ok_or(Error::EmptyStack)?;
        let out_shape = first.shape.insert_dim(dim, tensors.len())?;

        for (i, t) in tensors.iter().enumerate().skip(1) {
            if t.shape != first.shape {
                return Err(Error::StackShapeMismatch {
                    index: i,
                    expected: first.shape.clone(),
                    got: t.shape.clone(),
                });
            }
        }

        // Every input contributes one contiguous chunk of `inner` elements
        // per position in the leading `outer` dims.
        let outer: usize = first.dims()[..dim].iter().product();
        let inner: usize = first.dims()[dim..].iter().product();

        let mut data = Vec::with_capacity(out_shape.elem_count());
        for o in 0..outer {
            for t in tensors {
                data.extend_from_slice(&t.data[o * inner..(o + 1) * inner]);
            }
        }

        Tensor::from_vec(data, out_shape)
    }
}
