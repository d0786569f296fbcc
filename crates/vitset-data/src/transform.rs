// Transform — preprocessing applied to each decoded image
//
// A transform maps one input to one output and may fail. The output type is
// free, so a pipeline can start on `Image` (resize, crop, flip), switch to a
// tensor with `ToTensor`, and continue on `Tensor<f32>` (normalize).
//
// Closures become transforms through `transform_fn`:
//
//   let t = transform_fn(|img: Image| Ok(img.width()));
//
// Two transforms are chained with `a.then(b)` or `Chain::new(a, b)`.

use image::GenericImageView;
use vitset_core::Tensor;

use crate::decode::Image;
use crate::DataError;

/// A preprocessing step from `In` to `Self::Output`.
pub trait Transform<In>: Send + Sync {
    type Output;

    fn apply(&self, input: In) -> Result<Self::Output, DataError>;
}

/// Wraps a closure as a [`Transform`]. Built with [`transform_fn`].
#[derive(Clone)]
pub struct FnTransform<F>(F);

impl<F> std::fmt::Debug for FnTransform<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnTransform")
    }
}

/// Use a closure as a transform.
pub fn transform_fn<In, Out, F>(f: F) -> FnTransform<F>
where
    F: Fn(In) -> Result<Out, DataError> + Send + Sync,
{
    FnTransform(f)
}

impl<In, Out, F> Transform<In> for FnTransform<F>
where
    F: Fn(In) -> Result<Out, DataError> + Send + Sync,
{
    type Output = Out;

    fn apply(&self, input: In) -> Result<Out, DataError> {
        (self.0)(input)
    }
}

/// Returns its input unchanged. Stands in for "no transform".
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T> Transform<T> for Identity {
    type Output = T;

    fn apply(&self, input: T) -> Result<T, DataError> {
        Ok(input)
    }
}

/// Runs `first`, then feeds its output to `second`.
#[derive(Debug, Clone)]
pub struct Chain<A, B> {
    first: A,
    second: B,
}

impl<A, B> Chain<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Chain { first, second }
    }
}

impl<In, A, B> Transform<In> for Chain<A, B>
where
    A: Transform<In>,
    B: Transform<A::Output>,
{
    type Output = B::Output;

    fn apply(&self, input: In) -> Result<B::Output, DataError> {
        self.second.apply(self.first.apply(input)?)
    }
}

/// Adds `.then(next)` to every transform.
pub trait TransformExt<In>: Transform<In> + Sized {
    fn then<B>(self, next: B) -> Chain<Self, B>
    where
        B: Transform<Self::Output>,
    {
        Chain::new(self, next)
    }
}

impl<In, T: Transform<In>> TransformExt<In> for T {}

// Built-in transforms

/// Convert an RGB image to a `[3, H, W]` f32 tensor with values in `[0, 1]`.
///
/// Pixels are moved from interleaved `[H, W, C]` to planar `[C, H, W]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor;

impl Transform<Image> for ToTensor {
    type Output = Tensor<f32>;

    fn apply(&self, image: Image) -> Result<Tensor<f32>, DataError> {
        let (w, h) = image.as_dynamic().dimensions();
        let rgb = image.into_dynamic().into_rgb8();
        let raw = rgb.as_raw();
        let npix = (w * h) as usize;
        let mut data = vec![0.0f32; 3 * npix];
        for i in 0..npix {
            data[i] = raw[i * 3] as f32 / 255.0; // R
            data[npix + i] = raw[i * 3 + 1] as f32 / 255.0; // G
            data[2 * npix + i] = raw[i * 3 + 2] as f32 / 255.0; // B
        }
        Ok(Tensor::from_vec(data, (3, h as usize, w as usize))?)
    }
}

/// Per-channel standardisation of a `[C, H, W]` tensor:
/// `out[c] = (in[c] - mean[c]) / std[c]`.
#[derive(Debug, Clone)]
pub struct Normalize {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Normalize {
    pub fn new(mean: impl Into<Vec<f32>>, std: impl Into<Vec<f32>>) -> Self {
        Self {
            mean: mean.into(),
            std: std.into(),
        }
    }

    /// Maps `[0, 1]` inputs to `[-1, 1]` on each of three channels.
    pub fn symmetric() -> Self {
        Self::new([0.5; 3], [0.5; 3])
    }

    /// ImageNet channel statistics.
    pub fn imagenet() -> Self {
        Self::new([0.485, 0.456, 0.406], [0.229, 0.224, 0.225])
    }
}

impl Transform<Tensor<f32>> for Normalize {
    type Output = Tensor<f32>;

    fn apply(&self, tensor: Tensor<f32>) -> Result<Tensor<f32>, DataError> {
        let dims = tensor.dims();
        if dims.len() != 3 || dims[0] != self.mean.len() || dims[0] != self.std.len() {
            return Err(DataError::msg(format!(
                "Normalize: expected [{}, H, W] input, got {}",
                self.mean.len(),
                tensor.shape()
            )));
        }
        let plane = dims[1] * dims[2];
        let data: Vec<f32> = tensor
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let c = i / plane;
                (v - self.mean[c]) / self.std[c]
            })
            .collect();
        Ok(Tensor::from_vec(data, tensor.shape().clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn solid(w: u32, h: u32, px: [u8; 3]) -> Image {
        Image::from(DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(px))))
    }

    #[test]
    fn test_identity_passes_through() {
        let img = solid(2, 2, [9, 9, 9]);
        assert_eq!(Identity.apply(img.clone()).unwrap(), img);
    }

    #[test]
    fn test_closure_transform() {
        let t = transform_fn(|img: Image| Ok(img.width() * 10));
        assert_eq!(t.apply(solid(3, 1, [0, 0, 0])).unwrap(), 30);
    }

    #[test]
    fn test_to_tensor_planar_and_scaled() {
        let t = ToTensor.apply(solid(4, 2, [255, 0, 51])).unwrap();
        assert_eq!(t.dims(), &[3, 2, 4]);
        assert!((t.get(&[0, 1, 3]).unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(t.get(&[1, 0, 0]).unwrap(), 0.0);
        assert!((t.get(&[2, 0, 2]).unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_per_channel() {
        let input = Tensor::from_vec(vec![0.5f32, 0.5, 1.0, 1.0, 0.0, 0.0], (3, 1, 2)).unwrap();
        let out = Normalize::new([0.5, 0.0, 0.5], [0.5, 0.5, 0.25])
            .apply(input)
            .unwrap();
        assert_eq!(out.to_vec(), vec![0.0, 0.0, 2.0, 2.0, -2.0, -2.0]);
    }

    #[test]
    fn test_normalize_rejects_wrong_channels() {
        let input = Tensor::<f32>::zeros((1, 2, 2));
        assert!(matches!(
            Normalize::symmetric().apply(input),
            Err(DataError::Msg(_))
        ));
    }

    #[test]
    fn test_chain_to_tensor_then_normalize() {
        let pipeline = ToTensor.then(Normalize::symmetric());
        let out = pipeline.apply(solid(2, 2, [255, 0, 255])).unwrap();
        assert_eq!(out.dims(), &[3, 2, 2]);
        assert!((out.get(&[0, 0, 0]).unwrap() - 1.0).abs() < 1e-6);
        assert!((out.get(&[1, 1, 1]).unwrap() + 1.0).abs() < 1e-6);
    }
}
