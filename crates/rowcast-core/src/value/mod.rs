mod coerce;

#[cfg(test)]
mod tests;

use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    hash::{Hash, Hasher},
};

// re-exports
pub use coerce::{ConversionError, FromValue};

///
/// Float64
///
/// Finite-or-not float wrapper with total equality and hashing so that float
/// columns can participate in map and group keys.
/// `-0.0` equals `0.0`; every NaN equals every other NaN.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Float64(f64);

impl Float64 {
    #[must_use]
    pub const fn new(value: f64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }

    fn canonical_bits(self) -> u64 {
        if self.0 == 0.0 {
            0
        } else if self.0.is_nan() {
            f64::NAN.to_bits()
        } else {
            self.0.to_bits()
        }
    }
}

impl PartialEq for Float64 {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_bits() == other.canonical_bits()
    }
}

impl Eq for Float64 {}

impl Hash for Float64 {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_bits().hash(state);
    }
}

impl fmt::Display for Float64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for Float64 {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

///
/// DataType
///
/// Declared type of a schema field.
/// `Any` accepts every value without coercion.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum DataType {
    #[default]
    #[display("any")]
    Any,
    #[display("bool")]
    Bool,
    #[display("int")]
    Int,
    #[display("uint")]
    Uint,
    #[display("float")]
    Float,
    #[display("text")]
    Text,
    #[display("blob")]
    Blob,
    #[display("list")]
    List,
    #[display("null")]
    Null,
}

///
/// Value
///
/// One positional cell of a row.
/// Null → SQL NULL; List → ordered many-cardinality value.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(Float64),
    Text(String),
    Blob(Vec<u8>),
    List(Vec<Self>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Runtime type of this value; `Null` reports `DataType::Null`.
    #[must_use]
    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool(_) => DataType::Bool,
            Self::Int(_) => DataType::Int,
            Self::Uint(_) => DataType::Uint,
            Self::Float(_) => DataType::Float,
            Self::Text(_) => DataType::Text,
            Self::Blob(_) => DataType::Blob,
            Self::List(_) => DataType::List,
        }
    }

    /// Borrow the text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Coerce this value onto a declared field type.
    ///
    /// NULL survives every coercion; `Any` is the identity.
    pub fn coerce_to(&self, target: DataType) -> Result<Self, ConversionError> {
        if self.is_null() {
            return Ok(Self::Null);
        }

        match target {
            DataType::Any => Ok(self.clone()),
            DataType::Bool => bool::from_value(self).map(Self::Bool),
            DataType::Int => i64::from_value(self).map(Self::Int),
            DataType::Uint => u64::from_value(self).map(Self::Uint),
            DataType::Float => f64::from_value(self).map(|v| Self::Float(Float64::new(v))),
            DataType::Text => String::from_value(self).map(Self::Text),
            DataType::Blob => Vec::<u8>::from_value(self).map(Self::Blob),
            DataType::List | DataType::Null => match (self, target) {
                (Self::List(_), DataType::List) => Ok(self.clone()),
                _ => Err(ConversionError::Incompatible {
                    found: self.data_type(),
                    target: target.to_string(),
                }),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
            Self::Blob(bytes) => {
                write!(f, "0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

// Local helper to expand `From<T> for Value` impls.
macro_rules! value_from {
    ( $( $ty:ty => |$v:ident| $expr:expr ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $expr
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Self::Bool(v),
    i8 => |v| Self::Int(i64::from(v)),
    i16 => |v| Self::Int(i64::from(v)),
    i32 => |v| Self::Int(i64::from(v)),
    i64 => |v| Self::Int(v),
    u8 => |v| Self::Uint(u64::from(v)),
    u16 => |v| Self::Uint(u64::from(v)),
    u32 => |v| Self::Uint(u64::from(v)),
    u64 => |v| Self::Uint(v),
    f32 => |v| Self::Float(Float64::new(f64::from(v))),
    f64 => |v| Self::Float(Float64::new(v)),
    Float64 => |v| Self::Float(v),
    String => |v| Self::Text(v),
    &str => |v| Self::Text(v.to_string()),
    Vec<u8> => |v| Self::Blob(v),
    Vec<Self> => |v| Self::List(v),
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
