// Collation — turning a list of samples into one batch
//
// `collate` takes samples in the order given, converts each image to a tensor
// and stacks them along a new leading dimension; labels become a 1-D i64
// tensor in the same order. Images of differing shapes cannot be stacked and
// fail the whole batch with the tensor layer's shape error.

use vitset_core::{Tensor, WithDType};

use crate::dataset::Sample;
use crate::decode::Image;
use crate::DataError;

/// Anything that can become one image tensor in a batch.
pub trait IntoTensor {
    type Elem: WithDType;

    fn into_tensor(self) -> Result<Tensor<Self::Elem>, DataError>;
}

/// Untransformed images batch as raw `u8` pixels in `[H, W, C]` layout.
impl IntoTensor for Image {
    type Elem = u8;

    fn into_tensor(self) -> Result<Tensor<u8>, DataError> {
        self.into_hwc_tensor()
    }
}

impl<T: WithDType> IntoTensor for Tensor<T> {
    type Elem = T;

    fn into_tensor(self) -> Result<Tensor<T>, DataError> {
        Ok(self)
    }
}

/// A stacked group of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T: WithDType> {
    /// `[N, ...]` where `...` is the per-sample image shape.
    pub images: Tensor<T>,
    /// `[N]` class indices.
    pub labels: Tensor<i64>,
}

impl<T: WithDType> Batch<T> {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.elem_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_parts(self) -> (Tensor<T>, Tensor<i64>) {
        (self.images, self.labels)
    }
}

/// Stack `batch` into `(images [N, ...], labels [N])`, preserving order.
///
/// Fails with [`DataError::EmptyBatch`] for an empty input and with the
/// tensor layer's shape mismatch if two images differ in shape.
pub fn collate<I: IntoTensor>(batch: Vec<Sample<I>>) -> Result<Batch<I::Elem>, DataError> {
    if batch.is_empty() {
        return Err(DataError::EmptyBatch);
    }

    let mut images = Vec::with_capacity(batch.len());
    let mut labels = Vec::with_capacity(batch.len());
    for sample in batch {
        let (image, label) = sample.into_parts();
        images.push(image.into_tensor()?);
        labels.push(label);
    }

    Ok(Batch {
        images: Tensor::stack(&images, 0)?,
        labels: Tensor::vector(labels),
    })
}
