// Class-folder split — produce the path/label sequences an ImageDataset needs
//
// Expects one subdirectory per class directly under the root:
//
//   root/
//     daisy/     img_001.jpg  img_002.jpg ...
//     roses/     ...
//     tulips/    ...
//
// Classes are numbered by sorted directory name. Within each class the files
// are sorted, then floor(n * val_rate) of them are drawn for validation using
// one RNG seeded from the config; the rest are training samples. Only regular
// files directly inside a class directory whose extension is in the
// configured list are used.
//
// Optionally writes the index → class name map as JSON:
//
//   {
//     "0": "daisy",
//     "1": "roses"
//   }

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::ImageDataset;
use crate::DataError;

/// Settings for [`read_split_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of each class held out for validation.
    pub val_rate: f64,
    /// Seed for the validation draw.
    pub seed: u64,
    /// Accepted file extensions, without the dot. Matched case-sensitively.
    pub extensions: Vec<String>,
    /// Where to write the class index JSON, if anywhere.
    pub class_indices_path: Option<PathBuf>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            val_rate: 0.2,
            seed: 0,
            extensions: ["jpg", "JPG", "jpeg", "JPEG", "png", "PNG"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            class_indices_path: None,
        }
    }
}

impl SplitConfig {
    pub fn val_rate(mut self, rate: f64) -> Self {
        self.val_rate = rate;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn extensions<S: Into<String>>(mut self, exts: impl IntoIterator<Item = S>) -> Self {
        self.extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    pub fn class_indices_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.class_indices_path = Some(path.into());
        self
    }
}

/// Result of [`read_split_data`]: parallel path/label sequences per split.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitData {
    /// Class names; the label of a class is its position here.
    pub class_names: Vec<String>,
    pub train_paths: Vec<PathBuf>,
    pub train_labels: Vec<i64>,
    pub val_paths: Vec<PathBuf>,
    pub val_labels: Vec<i64>,
    /// Images found per class, before splitting.
    pub per_class_counts: Vec<usize>,
}

impl SplitData {
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Untransformed training and validation datasets.
    pub fn into_datasets(self) -> (ImageDataset, ImageDataset) {
        (
            ImageDataset::new(self.train_paths, self.train_labels),
            ImageDataset::new(self.val_paths, self.val_labels),
        )
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DataError + '_ {
    move |source| DataError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Sorted `(name, path)` of every subdirectory of `root`.
fn class_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>, DataError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(root).map_err(io_error(root))? {
        let entry = entry.map_err(io_error(root))?;
        let path = entry.path();
        if path.is_dir() {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => return Err(DataError::ClassNameNotUtf8(path)),
            };
            dirs.push((name, path));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Sorted image files directly inside `dir`.
fn class_images(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, DataError> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let path = entry.map_err(io_error(dir))?.path();
        let accepted = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|x| x == e))
            .unwrap_or(false);
        if accepted && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

fn write_class_indices(path: &Path, class_names: &[String]) -> Result<(), DataError> {
    let map: BTreeMap<usize, &str> = class_names
        .iter()
        .enumerate()
        .map(|(i, name)| (i, name.as_str()))
        .collect();
    let json = serde_json::to_string_pretty(&map).map_err(|source| DataError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(io_error(path))?;
    debug!(path = %path.display(), "wrote class indices");
    Ok(())
}

/// Split a class-folder dataset into training and validation sequences.
pub fn read_split_data(
    root: impl AsRef<Path>,
    config: &SplitConfig,
) -> Result<SplitData, DataError> {
    let root = root.as_ref();
    if !root.is_dir() {
        return Err(DataError::NotADirectory(root.to_path_buf()));
    }
    if !(0.0..=1.0).contains(&config.val_rate) {
        return Err(DataError::InvalidValRate(config.val_rate));
    }

    let dirs = class_dirs(root)?;
    if dirs.is_empty() {
        return Err(DataError::NoClasses(root.to_path_buf()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut split = SplitData::default();

    for (label, (name, dir)) in dirs.into_iter().enumerate() {
        let images = class_images(&dir, &config.extensions)?;
        let n_val = (images.len() as f64 * config.val_rate) as usize;
        let val: HashSet<usize> = index::sample(&mut rng, images.len(), n_val)
            .into_iter()
            .collect();

        debug!(class = %name, label, images = images.len(), val = n_val, "scanned class");
        split.per_class_counts.push(images.len());
        split.class_names.push(name);

        for (i, path) in images.into_iter().enumerate() {
            if val.contains(&i) {
                split.val_paths.push(path);
                split.val_labels.push(label as i64);
            } else {
                split.train_paths.push(path);
                split.train_labels.push(label as i64);
            }
        }
    }

    if let Some(path) = &config.class_indices_path {
        write_class_indices(path, &split.class_names)?;
    }

    info!(
        classes = split.num_classes(),
        total = split.per_class_counts.iter().sum::<usize>(),
        train = split.train_paths.len(),
        val = split.val_paths.len(),
        "split dataset"
    );
    Ok(split)
}
