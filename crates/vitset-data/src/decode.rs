// Image decoding — the capability the dataset uses to turn a path into pixels
//
// The dataset never touches the `image` crate directly. It asks an
// `ImageDecoder` for an `Image`, checks the image's `PixelMode`, and hands the
// image to the transform. `FileDecoder` is the real implementation; tests and
// callers with their own storage can plug in anything else.

use std::fmt;
use std::path::Path;

use image::ImageDecoder as _;
use image::{ColorType, DynamicImage, ExtendedColorType, GenericImageView, ImageReader};
use tracing::trace;
use vitset_core::Tensor;

use crate::DataError;

// PixelMode

/// Channel layout and sample depth of a decoded image.
///
/// Displays with the short names common in imaging tools (`L`, `RGB`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelMode {
    /// 1-bit black and white.
    Bilevel,
    /// 8-bit greyscale (2- and 4-bit sources included).
    L,
    /// 8-bit greyscale with alpha.
    La,
    /// 8-bit red, green, blue. The only mode the dataset accepts.
    Rgb,
    /// 8-bit RGB with alpha.
    Rgba,
    /// Indices into a color palette.
    P,
    /// 8-bit cyan, magenta, yellow, key.
    Cmyk,
    L16,
    La16,
    Rgb16,
    Rgba16,
    Rgb32F,
    Rgba32F,
    /// A color type this crate does not know about.
    Other,
}

impl PixelMode {
    /// Number of channels per pixel (0 for [`PixelMode::Other`]).
    pub fn channels(&self) -> usize {
        match self {
            PixelMode::Bilevel | PixelMode::L | PixelMode::L16 | PixelMode::P => 1,
            PixelMode::La | PixelMode::La16 => 2,
            PixelMode::Rgb | PixelMode::Rgb16 | PixelMode::Rgb32F => 3,
            PixelMode::Rgba | PixelMode::Rgba16 | PixelMode::Rgba32F | PixelMode::Cmyk => 4,
            PixelMode::Other => 0,
        }
    }
}

impl From<ColorType> for PixelMode {
    fn from(color: ColorType) -> Self {
        match color {
            ColorType::L8 => PixelMode::L,
            ColorType::La8 => PixelMode::La,
            ColorType::Rgb8 => PixelMode::Rgb,
            ColorType::Rgba8 => PixelMode::Rgba,
            ColorType::L16 => PixelMode::L16,
            ColorType::La16 => PixelMode::La16,
            ColorType::Rgb16 => PixelMode::Rgb16,
            ColorType::Rgba16 => PixelMode::Rgba16,
            ColorType::Rgb32F => PixelMode::Rgb32F,
            ColorType::Rgba32F => PixelMode::Rgba32F,
            _ => PixelMode::Other,
        }
    }
}

/// The mode of the encoded source, before the codec expands it. Palette
/// entries show up as `Unknown(bits)`.
impl From<ExtendedColorType> for PixelMode {
    fn from(color: ExtendedColorType) -> Self {
        match color {
            ExtendedColorType::L1 => PixelMode::Bilevel,
            ExtendedColorType::L2 | ExtendedColorType::L4 | ExtendedColorType::L8 => PixelMode::L,
            ExtendedColorType::La8 => PixelMode::La,
            ExtendedColorType::Rgb8 => PixelMode::Rgb,
            ExtendedColorType::Rgba8 => PixelMode::Rgba,
            ExtendedColorType::L16 => PixelMode::L16,
            ExtendedColorType::La16 => PixelMode::La16,
            ExtendedColorType::Rgb16 => PixelMode::Rgb16,
            ExtendedColorType::Rgba16 => PixelMode::Rgba16,
            ExtendedColorType::Rgb32F => PixelMode::Rgb32F,
            ExtendedColorType::Rgba32F => PixelMode::Rgba32F,
            ExtendedColorType::Cmyk8 => PixelMode::Cmyk,
            ExtendedColorType::Unknown(_) => PixelMode::P,
            _ => PixelMode::Other,
        }
    }
}

impl fmt::Display for PixelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PixelMode::Bilevel => "1",
            PixelMode::L => "L",
            PixelMode::La => "LA",
            PixelMode::Rgb => "RGB",
            PixelMode::Rgba => "RGBA",
            PixelMode::P => "P",
            PixelMode::Cmyk => "CMYK",
            PixelMode::L16 => "I;16",
            PixelMode::La16 => "LA;16",
            PixelMode::Rgb16 => "RGB;16",
            PixelMode::Rgba16 => "RGBA;16",
            PixelMode::Rgb32F => "RGB;F",
            PixelMode::Rgba32F => "RGBA;F",
            PixelMode::Other => "unknown",
        };
        write!(f, "{}", s)
    }
}

// Image

/// A decoded image together with its pixel mode.
///
/// The mode belongs to the source, not the pixel buffer: a palette PNG is
/// expanded to RGB pixels on decode but keeps [`PixelMode::P`].
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    inner: DynamicImage,
    mode: PixelMode,
}

impl Image {
    /// Wrap an in-memory image; the mode follows the buffer's color type.
    pub fn from_dynamic(inner: DynamicImage) -> Self {
        let mode = PixelMode::from(inner.color());
        Image { inner, mode }
    }

    /// Wrap decoded pixels whose source was stored in `mode`.
    pub fn with_mode(inner: DynamicImage, mode: PixelMode) -> Self {
        Image { inner, mode }
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.inner
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.inner
    }

    /// The pixel mode reported by the decoder.
    pub fn mode(&self) -> PixelMode {
        self.mode
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Raw 8-bit pixels as a `[H, W, C]` tensor.
    ///
    /// Deeper sample types are reduced to 8 bits; the channel count follows
    /// the decoded buffer.
    pub fn into_hwc_tensor(self) -> Result<Tensor<u8>, DataError> {
        let (w, h) = self.dimensions();
        let (raw, c) = match self.inner.color().channel_count() {
            1 => (self.inner.into_luma8().into_raw(), 1),
            2 => (self.inner.into_luma_alpha8().into_raw(), 2),
            3 => (self.inner.into_rgb8().into_raw(), 3),
            _ => (self.inner.into_rgba8().into_raw(), 4),
        };
        Ok(Tensor::from_vec(raw, (h as usize, w as usize, c))?)
    }
}

impl From<DynamicImage> for Image {
    fn from(inner: DynamicImage) -> Self {
        Image::from_dynamic(inner)
    }
}

// Decoders

/// Turns a path into a decoded [`Image`].
///
/// Implementations must be `Send + Sync`: the data loader decodes from
/// several threads at once.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Image, DataError>;
}

/// Decodes image files from the local filesystem with the `image` crate.
///
/// The format is guessed from the file contents, not the extension. The
/// image's mode is the codec's view of the source, taken before palette or
/// CMYK data is expanded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl ImageDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<Image, DataError> {
        let reader = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|source| DataError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let decode_error = |source: image::ImageError| DataError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let decoder = reader.into_decoder().map_err(decode_error)?;
        let mode = PixelMode::from(decoder.original_color_type());
        let img = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
        trace!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            %mode,
            "decoded image"
        );
        Ok(Image::with_mode(img, mode))
    }
}
