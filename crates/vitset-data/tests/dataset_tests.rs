// Tests for vitset-data: ImageDataset over real files, collate, DataLoader

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use vitset_data::{
    collate, DataError, DataLoader, DataLoaderConfig, Dataset, FileDecoder, Image, ImageDataset,
    ImageDecoder, Normalize, PixelMode, Resize, ToTensor, Transform, TransformExt,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("vitset_data=trace")
        .try_init();
}

/// Fresh scratch directory per test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vitset_ds_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_rgb(path: &Path, w: u32, h: u32, px: [u8; 3]) {
    RgbImage::from_pixel(w, h, Rgb(px)).save(path).unwrap();
}

fn write_grey(path: &Path, w: u32, h: u32) {
    GrayImage::from_pixel(w, h, Luma([128])).save(path).unwrap();
}

/// 8-bit indexed PNG with a two-color palette.
fn write_palette(path: &Path, w: u32, h: u32) {
    let file = std::fs::File::create(path).unwrap();
    let mut enc = png::Encoder::new(std::io::BufWriter::new(file), w, h);
    enc.set_color(png::ColorType::Indexed);
    enc.set_depth(png::BitDepth::Eight);
    enc.set_palette(vec![255, 0, 0, 0, 255, 0]);
    let mut writer = enc.write_header().unwrap();
    let indices: Vec<u8> = (0..w * h).map(|i| (i % 2) as u8).collect();
    writer.write_image_data(&indices).unwrap();
    writer.finish().unwrap();
}

/// Collects formatted log output in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// End-to-end: two 32x32 RGB images, no transform

#[test]
fn test_two_rgb_images_get_and_collate() {
    init_tracing();
    let dir = scratch("two_rgb");
    let a = dir.join("a.jpg");
    let b = dir.join("b.jpg");
    write_rgb(&a, 32, 32, [200, 10, 10]);
    write_rgb(&b, 32, 32, [10, 200, 10]);

    let ds = ImageDataset::new([&a, &b], [0, 1]);
    assert_eq!(ds.len(), 2);

    let s0 = ds.get(0).unwrap();
    let s1 = ds.get(1).unwrap();
    assert_eq!(s0.label, 0);
    assert_eq!(s1.label, 1);
    assert_eq!(s0.image.dimensions(), (32, 32));
    assert_eq!(s0.image.mode(), PixelMode::Rgb);

    let batch = collate(vec![s0, s1]).unwrap();
    assert_eq!(batch.images.dims(), &[2, 32, 32, 3]);
    assert_eq!(batch.labels.to_vec(), vec![0, 1]);
}

#[test]
fn test_greyscale_image_rejected_other_still_loads() {
    let dir = scratch("grey");
    let a = dir.join("a.png");
    let b = dir.join("b.png");
    write_rgb(&a, 32, 32, [1, 2, 3]);
    write_grey(&b, 32, 32);

    let ds = ImageDataset::new([&a, &b], [0, 1]);
    let err = ds.get(1).unwrap_err();
    match &err {
        DataError::NotRgb { path, mode } => {
            assert_eq!(path, &b);
            assert_eq!(*mode, PixelMode::L);
        }
        other => panic!("expected NotRgb, got {other}"),
    }
    assert!(err.to_string().contains(&b.display().to_string()));
    assert!(err.to_string().contains("isn't RGB mode"));

    assert_eq!(ds.get(0).unwrap().label, 0);
}

#[test]
fn test_rgba_image_rejected() {
    let dir = scratch("rgba");
    let p = dir.join("alpha.png");
    RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 4])).save(&p).unwrap();

    let ds = ImageDataset::new([&p], [0]);
    assert!(matches!(
        ds.get(0),
        Err(DataError::NotRgb {
            mode: PixelMode::Rgba,
            ..
        })
    ));
}

#[test]
fn test_palette_image_rejected() {
    let dir = scratch("palette");
    let p = dir.join("indexed.png");
    write_palette(&p, 2, 2);

    let ds = ImageDataset::new([&p], [0]);
    match ds.get(0) {
        Err(DataError::NotRgb { path, mode }) => {
            assert_eq!(path, p);
            assert_eq!(mode, PixelMode::P);
        }
        other => panic!("expected NotRgb, got {other:?}"),
    }
}

#[test]
fn test_rejection_is_returned_not_logged() {
    let dir = scratch("quiet");
    let grey = dir.join("grey.png");
    let indexed = dir.join("indexed.png");
    write_grey(&grey, 4, 4);
    write_palette(&indexed, 4, 4);

    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();

    let ds = ImageDataset::new([&grey, &indexed], [0, 1]);
    tracing::subscriber::with_default(subscriber, || {
        assert!(matches!(ds.get(0), Err(DataError::NotRgb { .. })));
        assert!(matches!(ds.get(1), Err(DataError::NotRgb { .. })));
    });

    let out = logs.contents();
    assert!(!out.contains("WARN"), "unexpected log output: {out}");
    assert!(!out.contains("ERROR"), "unexpected log output: {out}");
}

#[test]
fn test_missing_and_corrupt_files() {
    let dir = scratch("broken");
    let missing = dir.join("missing.png");
    let corrupt = dir.join("corrupt.jpg");
    std::fs::write(&corrupt, b"\xff\xd8\xff\xe0 truncated").unwrap();

    let ds = ImageDataset::new([&missing, &corrupt], [0, 1]);
    assert!(matches!(ds.get(0), Err(DataError::Io { .. })));
    assert!(matches!(ds.get(1), Err(DataError::Decode { .. })));
}

// Transform laws

#[test]
fn test_no_transform_is_plain_decode() {
    let dir = scratch("identity");
    let p = dir.join("x.png");
    write_rgb(&p, 5, 3, [9, 8, 7]);

    let ds = ImageDataset::new([&p], [4]);
    let decoded = FileDecoder.decode(&p).unwrap();
    assert_eq!(ds.get(0).unwrap().image, decoded);
}

#[test]
fn test_transform_composes_with_decode() {
    let dir = scratch("compose");
    let paths: Vec<PathBuf> = (0..3).map(|i| dir.join(format!("{i}.png"))).collect();
    for (i, p) in paths.iter().enumerate() {
        write_rgb(p, 10 + i as u32, 6, [i as u8 * 50, 0, 255]);
    }

    let pipeline = || {
        Resize::new(8, 8)
            .then(ToTensor)
            .then(Normalize::symmetric())
    };
    let ds = ImageDataset::new(&paths, [2, 1, 0]).with_transform(pipeline());

    for i in 0..paths.len() {
        let expected = pipeline()
            .apply(FileDecoder.decode(&paths[i]).unwrap())
            .unwrap();
        let sample = ds.get(i).unwrap();
        assert_eq!(sample.image, expected);
        assert_eq!(sample.label, [2, 1, 0][i]);
        assert_eq!(sample.image.dims(), &[3, 8, 8]);
    }
}

#[test]
fn test_differently_sized_images_fail_collate() {
    let dir = scratch("mismatch");
    let a = dir.join("a.png");
    let b = dir.join("b.png");
    write_rgb(&a, 32, 32, [0, 0, 0]);
    write_rgb(&b, 16, 32, [0, 0, 0]);

    let ds = ImageDataset::new([&a, &b], [0, 1]);
    let err = collate(vec![ds.get(0).unwrap(), ds.get(1).unwrap()]).unwrap_err();
    assert!(matches!(err, DataError::Tensor(_)));
}

// DataLoader over files

#[test]
fn test_loader_over_transformed_dataset() {
    init_tracing();
    let dir = scratch("loader");
    let paths: Vec<PathBuf> = (0..5).map(|i| dir.join(format!("{i}.png"))).collect();
    for (i, p) in paths.iter().enumerate() {
        write_rgb(p, 12 + i as u32, 9, [255, i as u8, 0]);
    }

    let ds = ImageDataset::new(&paths, [0, 1, 2, 3, 4])
        .with_transform(Resize::new(8, 8).then(ToTensor));
    let config = DataLoaderConfig::default()
        .batch_size(2)
        .shuffle(false)
        .num_workers(2);
    let mut loader = DataLoader::new(&ds, config);

    let batches = loader.epoch_batches().unwrap();
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].images.dims(), &[2, 3, 8, 8]);
    assert_eq!(batches[2].images.dims(), &[1, 3, 8, 8]);
    let labels: Vec<i64> = batches.iter().flat_map(|b| b.labels.to_vec()).collect();
    assert_eq!(labels, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_loader_surfaces_bad_image() {
    let dir = scratch("loader_bad");
    let good = dir.join("good.png");
    let grey = dir.join("grey.png");
    write_rgb(&good, 4, 4, [1, 1, 1]);
    write_grey(&grey, 4, 4);

    let ds = ImageDataset::new([&good, &grey, &good], [0, 1, 2]);
    let config = DataLoaderConfig::default().batch_size(1).shuffle(false);
    let mut loader = DataLoader::new(&ds, config);
    let results: Vec<_> = loader.iter_batches().collect();
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(DataError::NotRgb { .. })));
    assert!(results[2].is_ok());
}

#[test]
fn test_custom_decoder_plugs_in() {
    struct Checkerboard;

    impl ImageDecoder for Checkerboard {
        fn decode(&self, path: &Path) -> Result<Image, DataError> {
            let n = path.to_string_lossy().len() as u32;
            let buf = RgbImage::from_fn(n, n, |x, y| Rgb([((x + y) % 2 * 255) as u8; 3]));
            Ok(Image::from_dynamic(image::DynamicImage::ImageRgb8(buf)))
        }
    }

    let ds = ImageDataset::new(["abc", "abcd"], [1, 2]).with_decoder(Checkerboard);
    assert_eq!(ds.get(0).unwrap().image.dimensions(), (3, 3));
    assert_eq!(ds.get(1).unwrap().image.dimensions(), (4, 4));
}
