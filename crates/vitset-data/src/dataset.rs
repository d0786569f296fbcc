// Dataset trait and the image classification dataset
//
// `ImageDataset` is a read-only view over two parallel sequences, image paths
// and integer labels. Nothing is read at construction. Each `get(i)`:
//
//   1. decodes paths[i] (decode errors propagate as-is)
//   2. rejects anything that is not 8-bit RGB, naming the path
//   3. looks up labels[i]
//   4. runs the transform (Identity when none was given)
//
// There is no cache; calling `get(i)` twice decodes the file twice. The two
// sequences are not checked against each other up front: a short label list
// surfaces as an out-of-range error on the first index past its end.
// `check_aligned` is available for callers who want to fail early.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::decode::{FileDecoder, Image, ImageDecoder, PixelMode};
use crate::transform::{Identity, Transform};
use crate::DataError;

/// One labelled example.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<I> {
    /// The (possibly transformed) image.
    pub image: I,
    /// Class index.
    pub label: i64,
}

impl<I> Sample<I> {
    pub fn new(image: I, label: i64) -> Self {
        Sample { image, label }
    }

    /// Split into `(image, label)`.
    pub fn into_parts(self) -> (I, i64) {
        (self.image, self.label)
    }
}

/// A dataset is an indexed collection of samples.
///
/// Implementations must be `Send + Sync` so DataLoader can read from multiple
/// threads when parallel fetching is enabled.
pub trait Dataset: Send + Sync {
    /// What `get` returns on success.
    type Item;

    /// Total number of samples in the dataset.
    fn len(&self) -> usize;

    /// Whether the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Retrieve the sample at position `index`.
    fn get(&self, index: usize) -> Result<Self::Item, DataError>;

    /// Optional human-readable name.
    fn name(&self) -> &str {
        "dataset"
    }
}

/// Lazily decoded image classification dataset over parallel path and label
/// sequences.
///
/// `X` is the transform applied to every decoded image and `D` the decoder.
///
/// ```no_run
/// use vitset_data::{Dataset, ImageDataset};
///
/// let ds = ImageDataset::new(["a.jpg", "b.jpg"], [0, 1]);
/// let sample = ds.get(1)?;
/// assert_eq!(sample.label, 1);
/// # Ok::<(), vitset_data::DataError>(())
/// ```
pub struct ImageDataset<X = Identity, D = FileDecoder> {
    paths: Vec<PathBuf>,
    labels: Vec<i64>,
    transform: X,
    decoder: D,
}

impl ImageDataset {
    /// A dataset with no transform that reads from the filesystem.
    ///
    /// No I/O happens here, and the two sequences are not compared.
    pub fn new<P, L>(paths: P, labels: L) -> Self
    where
        P: IntoIterator,
        P::Item: Into<PathBuf>,
        L: IntoIterator<Item = i64>,
    {
        ImageDataset {
            paths: paths.into_iter().map(Into::into).collect(),
            labels: labels.into_iter().collect(),
            transform: Identity,
            decoder: FileDecoder,
        }
    }
}

impl<X, D> ImageDataset<X, D> {
    /// Replace the transform applied after decoding and validation.
    pub fn with_transform<Y>(self, transform: Y) -> ImageDataset<Y, D>
    where
        Y: Transform<Image>,
    {
        ImageDataset {
            paths: self.paths,
            labels: self.labels,
            transform,
            decoder: self.decoder,
        }
    }

    /// Replace the image decoder.
    pub fn with_decoder<E>(self, decoder: E) -> ImageDataset<X, E>
    where
        E: ImageDecoder,
    {
        ImageDataset {
            paths: self.paths,
            labels: self.labels,
            transform: self.transform,
            decoder,
        }
    }

    /// All image paths, in index order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// All labels, in index order.
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Path of the i-th sample.
    pub fn path_of(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    /// Label of the i-th sample.
    pub fn label_of(&self, index: usize) -> Option<i64> {
        self.labels.get(index).copied()
    }

    /// Fail if the path and label sequences differ in length.
    pub fn check_aligned(&self) -> Result<(), DataError> {
        if self.paths.len() != self.labels.len() {
            return Err(DataError::LengthMismatch {
                paths: self.paths.len(),
                labels: self.labels.len(),
            });
        }
        Ok(())
    }
}

impl<X, D> ImageDataset<X, D>
where
    D: ImageDecoder,
{
    /// Decode the image at `index` and make sure it is RGB.
    fn load_rgb(&self, index: usize) -> Result<Image, DataError> {
        let path = self
            .paths
            .get(index)
            .ok_or(DataError::IndexOutOfRange {
                sequence: "paths",
                index,
                len: self.paths.len(),
            })?;
        let image = self.decoder.decode(path)?;
        let mode = image.mode();
        if mode != PixelMode::Rgb {
            return Err(DataError::NotRgb {
                path: path.clone(),
                mode,
            });
        }
        Ok(image)
    }
}

impl<X, D> Dataset for ImageDataset<X, D>
where
    X: Transform<Image>,
    D: ImageDecoder,
{
    type Item = Sample<X::Output>;

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn get(&self, index: usize) -> Result<Sample<X::Output>, DataError> {
        let image = self.load_rgb(index)?;
        let label = self.label_of(index).ok_or(DataError::IndexOutOfRange {
            sequence: "labels",
            index,
            len: self.labels.len(),
        })?;
        trace!(index, label, "loaded sample");
        let image = self.transform.apply(image)?;
        Ok(Sample { image, label })
    }

    fn name(&self) -> &str {
        "ImageDataset"
    }
}

impl<X, D> fmt::Debug for ImageDataset<X, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageDataset")
            .field("paths", &self.paths.len())
            .field("labels", &self.labels.len())
            .field("transform", &std::any::type_name::<X>())
            .finish()
    }
}
