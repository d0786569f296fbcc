//! # vitset-data
//!
//! Lazy image classification datasets and batching for vitset.
//!
//! This crate provides:
//! - [`ImageDataset`] — indexed view over parallel (path, label) sequences
//!   that decodes one RGB image per `get` call
//! - [`collate`] — stacks samples into a [`Batch`] of image and label tensors
//! - [`DataLoader`] — batching, shuffling, parallel sample fetch
//! - [`Transform`] — preprocessing pipeline (resize, crop, flip, to-tensor, normalize)
//! - [`read_split_data`] — class-folder train/validation split
//!
//! ```no_run
//! use vitset_data::{collate, Dataset, ImageDataset, Resize, ToTensor, TransformExt};
//!
//! let ds = ImageDataset::new(["data/a.jpg", "data/b.jpg"], [0, 1])
//!     .with_transform(Resize::new(224, 224).then(ToTensor));
//! let batch = collate(vec![ds.get(0)?, ds.get(1)?])?;
//! assert_eq!(batch.images.dims(), &[2, 3, 224, 224]);
//! # Ok::<(), vitset_data::DataError>(())
//! ```

use std::path::PathBuf;

pub mod augment;
pub mod collate;
pub mod dataset;
pub mod decode;
pub mod loader;
pub mod split;
pub mod transform;

pub use augment::{CenterCrop, RandomHorizontalFlip, RandomResizedCrop, Resize};
pub use collate::{collate, Batch, IntoTensor};
pub use dataset::{Dataset, ImageDataset, Sample};
pub use decode::{FileDecoder, Image, ImageDecoder, PixelMode};
pub use loader::{BatchIterator, DataLoader, DataLoaderConfig};
pub use split::{read_split_data, SplitConfig, SplitData};
pub use transform::{
    transform_fn, Chain, FnTransform, Identity, Normalize, ToTensor, Transform, TransformExt,
};

/// Errors from loading, validating and batching image samples.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The file exists but could not be decoded as an image.
    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The file could not be opened, read or written.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decoded image is not three-channel 8-bit RGB.
    #[error("image: {} isn't RGB mode (found {mode})", .path.display())]
    NotRgb { path: PathBuf, mode: PixelMode },

    /// Index past the end of the path or label sequence.
    #[error("index {index} out of range for {sequence} of length {len}")]
    IndexOutOfRange {
        sequence: &'static str,
        index: usize,
        len: usize,
    },

    /// Path and label sequences differ in length.
    #[error("{paths} image paths but {labels} labels")]
    LengthMismatch { paths: usize, labels: usize },

    /// `collate` was called with no samples.
    #[error("cannot collate an empty batch")]
    EmptyBatch,

    /// Stacking or tensor construction failed.
    #[error(transparent)]
    Tensor(#[from] vitset_core::Error),

    /// The dataset root is missing or not a directory.
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The dataset root has no class subdirectories.
    #[error("no class subdirectories in {}", .0.display())]
    NoClasses(PathBuf),

    /// A class directory name is not valid UTF-8 and cannot be a class name.
    #[error("class directory name is not valid UTF-8: {}", .0.display())]
    ClassNameNotUtf8(PathBuf),

    /// Validation fraction outside `[0, 1]`.
    #[error("validation rate must be within [0, 1], got {0}")]
    InvalidValRate(f64),

    /// Class index map could not be serialized.
    #[error("failed to serialize class indices for {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Generic message, mostly for caller-supplied transforms.
    #[error("{0}")]
    Msg(String),
}

impl DataError {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        DataError::Msg(s.into())
    }
}
