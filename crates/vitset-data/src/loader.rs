// DataLoader — batching, shuffling, iteration

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::debug;

use crate::collate::{collate, Batch, IntoTensor};
use crate::dataset::{Dataset, Sample};
use crate::DataError;

/// Configuration for the DataLoader.
#[derive(Debug, Clone)]
pub struct DataLoaderConfig {
    /// Number of samples per batch.
    pub batch_size: usize,
    /// Whether to shuffle indices each epoch.
    pub shuffle: bool,
    /// Whether to drop the last incomplete batch.
    pub drop_last: bool,
    /// Number of parallel workers for sample fetching (0 = sequential).
    pub num_workers: usize,
    /// Optional random seed for reproducible shuffling.
    pub seed: Option<u64>,
}

impl Default for DataLoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shuffle: true,
            drop_last: false,
            num_workers: 0,
            seed: None,
        }
    }
}

impl DataLoaderConfig {
    /// Samples per batch; clamped to at least 1.
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs.max(1);
        self
    }

    pub fn shuffle(mut self, s: bool) -> Self {
        self.shuffle = s;
        self
    }

    pub fn drop_last(mut self, d: bool) -> Self {
        self.drop_last = d;
        self
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }
}

/// A DataLoader wraps a Dataset of [`Sample`]s and produces collated
/// [`Batch`]es.
///
/// A sample that fails to load fails the batch it belongs to; the iterator
/// then moves on to the next batch.
pub struct DataLoader<'a, D: Dataset> {
    dataset: &'a D,
    config: DataLoaderConfig,
    indices: Vec<usize>,
    rng: StdRng,
}

impl<'a, D: Dataset> DataLoader<'a, D> {
    /// Create a new DataLoader over a dataset.
    pub fn new(dataset: &'a D, config: DataLoaderConfig) -> Self {
        let indices: Vec<usize> = (0..dataset.len()).collect();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            dataset,
            config,
            indices,
            rng,
        }
    }

    /// The number of batches per epoch.
    pub fn num_batches(&self) -> usize {
        let bs = self.config.batch_size.max(1);
        if self.config.drop_last {
            self.dataset.len() / bs
        } else {
            self.dataset.len().div_ceil(bs)
        }
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn config(&self) -> &DataLoaderConfig {
        &self.config
    }

    /// Current sample order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Reshuffle indices (call at the start of each epoch).
    ///
    /// With a seed, the sequence of epoch orders is reproducible.
    pub fn reshuffle(&mut self) {
        if self.config.shuffle {
            self.indices.shuffle(&mut self.rng);
        }
    }
}

impl<'a, D, I> DataLoader<'a, D>
where
    D: Dataset<Item = Sample<I>>,
    I: IntoTensor + Send,
{
    /// Fetch a slice of samples, optionally in parallel via rayon.
    ///
    /// Output order always matches `indices`.
    fn fetch_samples(&self, indices: &[usize]) -> Result<Vec<Sample<I>>, DataError> {
        if self.config.num_workers > 0 && indices.len() > 1 {
            indices
                .par_iter()
                .map(|&i| self.dataset.get(i))
                .collect()
        } else {
            indices.iter().map(|&i| self.dataset.get(i)).collect()
        }
    }

    fn load_batch(&self, batch_idx: usize) -> Option<Result<Batch<I::Elem>, DataError>> {
        let bs = self.config.batch_size.max(1);
        let n = self.indices.len();
        let start = batch_idx * bs;

        if start >= n {
            return None;
        }
        if self.config.drop_last && start + bs > n {
            return None;
        }

        let end = (start + bs).min(n);
        Some(self.fetch_samples(&self.indices[start..end]).and_then(collate))
    }

    /// Iterate over batches one at a time, reshuffling first.
    pub fn iter_batches(&mut self) -> BatchIterator<'_, 'a, D> {
        self.reshuffle();
        debug!(
            dataset = self.dataset.name(),
            samples = self.len(),
            batches = self.num_batches(),
            shuffle = self.config.shuffle,
            "starting epoch"
        );
        BatchIterator {
            loader: self,
            batch_idx: 0,
        }
    }

    /// Produce all batches for one epoch, failing on the first bad batch.
    pub fn epoch_batches(&mut self) -> Result<Vec<Batch<I::Elem>>, DataError> {
        self.iter_batches().collect()
    }
}

/// Iterator that yields one batch at a time.
pub struct BatchIterator<'l, 'a, D: Dataset> {
    loader: &'l DataLoader<'a, D>,
    batch_idx: usize,
}

impl<'l, 'a, D, I> Iterator for BatchIterator<'l, 'a, D>
where
    D: Dataset<Item = Sample<I>>,
    I: IntoTensor + Send,
{
    type Item = Result<Batch<I::Elem>, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = self.loader.load_batch(self.batch_idx)?;
        self.batch_idx += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.loader.num_batches().saturating_sub(self.batch_idx);
        (left, Some(left))
    }
}
