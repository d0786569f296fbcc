use std::fmt;

// DType — Supported element types
//
//   F32  — normalised image tensors, the default for model input
//   F64  — high-precision work
//   U8   — raw decoded pixels
//   U32  — indices
//   I64  — class labels (PyTorch convention)

/// Enum of all supported element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    U8,
    U32,
    I64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::U8 => "u8",
            DType::U32 => "u32",
            DType::I64 => "i64",
        };
        write!(f, "{}", s)
    }
}

/// Trait implemented by Rust types that can be stored in a tensor.
///
/// Provides the mapping between the concrete Rust type and the DType enum,
/// plus conversions to/from f64 for generic numeric code.
pub trait WithDType: Copy + Send + Sync + PartialEq + fmt::Debug + 'static {
    /// The corresponding DType enum variant.
    const DTYPE: DType;

    /// Convert this value to f64.
    fn to_f64(self) -> f64;

    /// Create a value of this type from f64 (saturating for integer types).
    fn from_f64(v: f64) -> Self;

    /// The zero value.
    fn zero() -> Self {
        Self::from_f64(0.0)
    }
}

macro_rules! impl_with_dtype {
    ($ty:ty, $dtype:expr) => {
        impl WithDType for $ty {
            const DTYPE: DType = $dtype;
            fn to_f64(self) -> f64 {
                self as f64
            }
            fn from_f64(v: f64) -> Self {
                v as $ty
            }
        }
    };
}

impl_with_dtype!(f32, DType::F32);
impl_with_dtype!(f64, DType::F64);
impl_with_dtype!(u8, DType::U8);
impl_with_dtype!(u32, DType::U32);
impl_with_dtype!(i64, DType::I64);
