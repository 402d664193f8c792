use crate::{
    error::{ErrorOrigin, InternalError},
    value::{DataType, Float64, Value},
};
use thiserror::Error as ThisError;

///
/// ConversionError
///
/// Failure to coerce one `Value` into a target Rust or declared type.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ConversionError {
    #[error("cannot convert NULL into {target}")]
    Null { target: String },

    #[error("cannot convert {found} value into {target}")]
    Incompatible { found: DataType, target: String },

    #[error("value {value} is out of range for {target}")]
    OutOfRange { value: String, target: String },

    #[error("cannot parse '{text}' as {target}")]
    Parse { text: String, target: String },
}

impl ConversionError {
    fn incompatible(found: &Value, target: &str) -> Self {
        Self::Incompatible {
            found: found.data_type(),
            target: target.to_string(),
        }
    }

    fn out_of_range(value: impl ToString, target: &str) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target: target.to_string(),
        }
    }

    fn parse(text: &str, target: &str) -> Self {
        Self::Parse {
            text: text.to_string(),
            target: target.to_string(),
        }
    }
}

impl From<ConversionError> for InternalError {
    fn from(err: ConversionError) -> Self {
        Self::conversion(ErrorOrigin::Mapper, err.to_string())
    }
}

///
/// FromValue
///
/// Typed extraction of one positional value.
/// NULL is only accepted by `Option<T>` and `Value` itself.
///

pub trait FromValue: Sized {
    /// Name used in conversion diagnostics.
    const TARGET: &'static str;

    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

impl FromValue for Value {
    const TARGET: &'static str = "value";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const TARGET: &'static str = T::TARGET;

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for bool {
    const TARGET: &'static str = "bool";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(*v),
            Value::Int(0) | Value::Uint(0) => Ok(false),
            Value::Int(1) | Value::Uint(1) => Ok(true),
            Value::Int(v) => Err(ConversionError::out_of_range(v, Self::TARGET)),
            Value::Uint(v) => Err(ConversionError::out_of_range(v, Self::TARGET)),
            Value::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(true),
                "false" | "f" | "0" | "no" => Ok(false),
                _ => Err(ConversionError::parse(text, Self::TARGET)),
            },
            Value::Null => Err(null(Self::TARGET)),
            other => Err(ConversionError::incompatible(other, Self::TARGET)),
        }
    }
}

impl FromValue for i64 {
    const TARGET: &'static str = "i64";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => Ok(*v),
            Value::Uint(v) => {
                Self::try_from(*v).map_err(|_| ConversionError::out_of_range(v, Self::TARGET))
            }
            Value::Bool(v) => Ok(Self::from(*v)),
            Value::Float(v) => float_to_i64(v.get()),
            Value::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ConversionError::parse(text, Self::TARGET)),
            Value::Null => Err(null(Self::TARGET)),
            other => Err(ConversionError::incompatible(other, Self::TARGET)),
        }
    }
}

impl FromValue for u64 {
    const TARGET: &'static str = "u64";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Uint(v) => Ok(*v),
            Value::Int(v) => {
                Self::try_from(*v).map_err(|_| ConversionError::out_of_range(v, Self::TARGET))
            }
            Value::Bool(v) => Ok(Self::from(*v)),
            Value::Float(v) => float_to_u64(v.get()),
            Value::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ConversionError::parse(text, Self::TARGET)),
            Value::Null => Err(null(Self::TARGET)),
            other => Err(ConversionError::incompatible(other, Self::TARGET)),
        }
    }
}

impl FromValue for f64 {
    const TARGET: &'static str = "f64";

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(v.get()),
            Value::Int(v) => Ok(*v as Self),
            Value::Uint(v) => Ok(*v as Self),
            Value::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| ConversionError::parse(text, Self::TARGET)),
            Value::Null => Err(null(Self::TARGET)),
            other => Err(ConversionError::incompatible(other, Self::TARGET)),
        }
    }
}

impl FromValue for f32 {
    const TARGET: &'static str = "f32";

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|v| v as Self)
    }
}

impl FromValue for Float64 {
    const TARGET: &'static str = "f64";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(Self::new)
    }
}

impl FromValue for String {
    const TARGET: &'static str = "string";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(text) => Ok(text.clone()),
            Value::Bool(_) | Value::Int(_) | Value::Uint(_) | Value::Float(_) => {
                Ok(value.to_string())
            }
            Value::Null => Err(null(Self::TARGET)),
            other => Err(ConversionError::incompatible(other, Self::TARGET)),
        }
    }
}

impl FromValue for Vec<u8> {
    const TARGET: &'static str = "bytes";

    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Blob(bytes) => Ok(bytes.clone()),
            Value::Text(text) => Ok(text.as_bytes().to_vec()),
            Value::Null => Err(null(Self::TARGET)),
            other => Err(ConversionError::incompatible(other, Self::TARGET)),
        }
    }
}

// Narrow integer targets go through the 64-bit conversions, then range-check.
macro_rules! narrow_from_value {
    ( $( $ty:ty => $wide:ty ),* $(,)? ) => {
        $(
            impl FromValue for $ty {
                const TARGET: &'static str = stringify!($ty);

                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    let wide = <$wide>::from_value(value).map_err(|err| retarget(err, Self::TARGET))?;
                    Self::try_from(wide)
                        .map_err(|_| ConversionError::out_of_range(wide, Self::TARGET))
                }
            }
        )*
    };
}

narrow_from_value! {
    i8 => i64,
    i16 => i64,
    i32 => i64,
    u8 => u64,
    u16 => u64,
    u32 => u64,
    usize => u64,
}

fn null(target: &str) -> ConversionError {
    ConversionError::Null {
        target: target.to_string(),
    }
}

fn retarget(err: ConversionError, target: &str) -> ConversionError {
    let target = target.to_string();
    match err {
        ConversionError::Null { .. } => ConversionError::Null { target },
        ConversionError::Incompatible { found, .. } => {
            ConversionError::Incompatible { found, target }
        }
        ConversionError::OutOfRange { value, .. } => ConversionError::OutOfRange { value, target },
        ConversionError::Parse { text, .. } => ConversionError::Parse { text, target },
    }
}

// Only integral floats inside the i64 range convert losslessly.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn float_to_i64(value: f64) -> Result<i64, ConversionError> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0; // 2^63

    if !value.is_finite() || value.fract() != 0.0 || !(-LIMIT..LIMIT).contains(&value) {
        return Err(ConversionError::out_of_range(value, i64::TARGET));
    }

    Ok(value as i64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn float_to_u64(value: f64) -> Result<u64, ConversionError> {
    const LIMIT: f64 = 18_446_744_073_709_551_616.0; // 2^64

    if !value.is_finite() || value.fract() != 0.0 || !(0.0..LIMIT).contains(&value) {
        return Err(ConversionError::out_of_range(value, u64::TARGET));
    }

    Ok(value as u64)
}
