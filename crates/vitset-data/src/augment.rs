// Image transforms — resizing, cropping and random augmentation on `Image`
//
// All of these take an `Image` and return an `Image` of the same mode, so they
// compose freely before `ToTensor`. The random ones draw from `thread_rng`,
// which keeps them usable from several loader threads at once.
//
// Typical pipelines:
//
//   train: RandomResizedCrop(224) → RandomHorizontalFlip(0.5) → ToTensor → Normalize
//   val:   Resize::shorter(256)   → CenterCrop(224)            → ToTensor → Normalize

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage};
use rand::{thread_rng, Rng};

use crate::decode::Image;
use crate::transform::Transform;
use crate::DataError;

// Resize

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResizeTarget {
    Exact { width: u32, height: u32 },
    Shorter(u32),
}

/// Resize an image, either to an exact size or so that its shorter side has
/// a given length (aspect ratio kept).
#[derive(Debug, Clone)]
pub struct Resize {
    target: ResizeTarget,
    filter: FilterType,
}

impl Resize {
    /// Resize to exactly `width` × `height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            target: ResizeTarget::Exact { width, height },
            filter: FilterType::Triangle,
        }
    }

    /// Scale so the shorter side equals `size`.
    pub fn shorter(size: u32) -> Self {
        Self {
            target: ResizeTarget::Shorter(size),
            filter: FilterType::Triangle,
        }
    }

    /// Resampling filter (bilinear by default).
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }

    fn output_size(&self, w: u32, h: u32) -> (u32, u32) {
        match self.target {
            ResizeTarget::Exact { width, height } => (width, height),
            ResizeTarget::Shorter(size) => {
                if w <= h {
                    let nh = (h as u64 * size as u64 / w.max(1) as u64) as u32;
                    (size, nh.max(1))
                } else {
                    let nw = (w as u64 * size as u64 / h.max(1) as u64) as u32;
                    (nw.max(1), size)
                }
            }
        }
    }
}

impl Transform<Image> for Resize {
    type Output = Image;

    fn apply(&self, image: Image) -> Result<Image, DataError> {
        let (w, h) = image.dimensions();
        let (nw, nh) = self.output_size(w, h);
        if (nw, nh) == (w, h) {
            return Ok(image);
        }
        let img = image.into_dynamic().resize_exact(nw, nh, self.filter);
        Ok(Image::from_dynamic(img))
    }
}

// CenterCrop

/// Crop the central `width` × `height` region.
///
/// Images smaller than the crop are zero-padded around the centre first
/// (this converts them to 8-bit RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CenterCrop {
    pub width: u32,
    pub height: u32,
}

impl CenterCrop {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Square crop.
    pub fn square(size: u32) -> Self {
        Self::new(size, size)
    }
}

impl Transform<Image> for CenterCrop {
    type Output = Image;

    fn apply(&self, image: Image) -> Result<Image, DataError> {
        let (w, h) = image.dimensions();
        let mut img = image.into_dynamic();
        if w < self.width || h < self.height {
            let (pw, ph) = (w.max(self.width), h.max(self.height));
            let mut canvas = RgbImage::new(pw, ph);
            let (x, y) = ((pw - w) / 2, (ph - h) / 2);
            imageops::overlay(&mut canvas, &img.to_rgb8(), x as i64, y as i64);
            img = DynamicImage::ImageRgb8(canvas);
        }
        let (w, h) = img.dimensions();
        let x = (w - self.width) / 2;
        let y = (h - self.height) / 2;
        Ok(Image::from_dynamic(img.crop_imm(
            x,
            y,
            self.width,
            self.height,
        )))
    }
}

// RandomHorizontalFlip

/// Randomly flip an image horizontally with probability `p`.
#[derive(Debug, Clone)]
pub struct RandomHorizontalFlip {
    pub p: f64,
}

impl RandomHorizontalFlip {
    pub fn new(p: f64) -> Self {
        Self { p }
    }
}

impl Transform<Image> for RandomHorizontalFlip {
    type Output = Image;

    fn apply(&self, image: Image) -> Result<Image, DataError> {
        let mut rng = thread_rng();
        if rng.gen::<f64>() >= self.p {
            return Ok(image);
        }
        Ok(Image::from_dynamic(image.into_dynamic().fliph()))
    }
}

// RandomResizedCrop

/// Crop a random region of random area and aspect ratio, then resize it to
/// `width` × `height`.
///
/// The area fraction is drawn from `scale` and the aspect ratio log-uniformly
/// from `ratio`. After ten rejected draws the largest central crop within
/// `ratio` is used instead.
#[derive(Debug, Clone)]
pub struct RandomResizedCrop {
    pub width: u32,
    pub height: u32,
    pub scale: (f64, f64),
    pub ratio: (f64, f64),
    pub filter: FilterType,
}

impl RandomResizedCrop {
    const ATTEMPTS: usize = 10;

    /// Square output with the usual defaults: scale (0.08, 1.0),
    /// ratio (3/4, 4/3), bilinear filtering.
    pub fn new(size: u32) -> Self {
        Self {
            width: size,
            height: size,
            scale: (0.08, 1.0),
            ratio: (3.0 / 4.0, 4.0 / 3.0),
            filter: FilterType::Triangle,
        }
    }

    pub fn scale(mut self, lo: f64, hi: f64) -> Self {
        self.scale = (lo, hi);
        self
    }

    pub fn ratio(mut self, lo: f64, hi: f64) -> Self {
        self.ratio = (lo, hi);
        self
    }

    /// Pick the crop window `(x, y, w, h)` for an image of size `w` × `h`.
    fn window<R: Rng>(&self, rng: &mut R, w: u32, h: u32) -> (u32, u32, u32, u32) {
        let area = w as f64 * h as f64;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());

        for _ in 0..Self::ATTEMPTS {
            let target_area = area * uniform(rng, self.scale.0, self.scale.1);
            let aspect = uniform(rng, log_ratio.0, log_ratio.1).exp();
            let cw = (target_area * aspect).sqrt().round() as u32;
            let ch = (target_area / aspect).sqrt().round() as u32;
            if cw > 0 && ch > 0 && cw <= w && ch <= h {
                let x = rng.gen_range(0..=w - cw);
                let y = rng.gen_range(0..=h - ch);
                return (x, y, cw, ch);
            }
        }

        // Fallback: central crop clamped to the ratio range
        let in_ratio = w as f64 / h as f64;
        let (cw, ch) = if in_ratio < self.ratio.0 {
            (w, ((w as f64 / self.ratio.0).round() as u32).clamp(1, h))
        } else if in_ratio > self.ratio.1 {
            (((h as f64 * self.ratio.1).round() as u32).clamp(1, w), h)
        } else {
            (w, h)
        };
        ((w - cw) / 2, (h - ch) / 2, cw, ch)
    }
}

fn uniform<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if lo < hi {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

impl Transform<Image> for RandomResizedCrop {
    type Output = Image;

    fn apply(&self, image: Image) -> Result<Image, DataError> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(DataError::msg("RandomResizedCrop: empty image"));
        }
        let (x, y, cw, ch) = self.window(&mut thread_rng(), w, h);
        let img = image
            .into_dynamic()
            .crop_imm(x, y, cw, ch)
            .resize_exact(self.width, self.height, self.filter);
        Ok(Image::from_dynamic(img))
    }
}
