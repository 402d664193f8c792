//! User-supplied value converters.
//!
//! A converter first coerces the raw value into its declared input type and
//! then applies the user function. Both steps report through `InternalError`.

use crate::{
    error::InternalError,
    value::{FromValue, Value},
};
use std::{fmt, marker::PhantomData};

///
/// Converter
///

pub trait Converter {
    type To;

    fn convert(&self, value: &Value) -> Result<Self::To, InternalError>;
}

impl<C: Converter + ?Sized> Converter for &C {
    type To = C::To;

    fn convert(&self, value: &Value) -> Result<Self::To, InternalError> {
        (**self).convert(value)
    }
}

///
/// FnConverter
/// Infallible `T -> U` function applied after coercion into `T`.
///

pub struct FnConverter<T, U, F> {
    function: F,
    _marker: PhantomData<fn(T) -> U>,
}

impl<T, U, F> Converter for FnConverter<T, U, F>
where
    T: FromValue,
    F: Fn(T) -> U,
{
    type To = U;

    fn convert(&self, value: &Value) -> Result<U, InternalError> {
        let input = T::from_value(value)?;

        Ok((self.function)(input))
    }
}

impl<T, U, F> fmt::Debug for FnConverter<T, U, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnConverter")
    }
}

///
/// TryFnConverter
/// Fallible `T -> Result<U, InternalError>` function applied after coercion.
///

pub struct TryFnConverter<T, U, F> {
    function: F,
    _marker: PhantomData<fn(T) -> U>,
}

impl<T, U, F> Converter for TryFnConverter<T, U, F>
where
    T: FromValue,
    F: Fn(T) -> Result<U, InternalError>,
{
    type To = U;

    fn convert(&self, value: &Value) -> Result<U, InternalError> {
        let input = T::from_value(value)?;

        (self.function)(input)
    }
}

impl<T, U, F> fmt::Debug for TryFnConverter<T, U, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TryFnConverter")
    }
}

/// Build a converter from an infallible function over a coerced input.
pub const fn converter<T, U, F>(function: F) -> FnConverter<T, U, F>
where
    T: FromValue,
    F: Fn(T) -> U,
{
    FnConverter {
        function,
        _marker: PhantomData,
    }
}

/// Build a converter from a fallible function over a coerced input.
pub const fn try_converter<T, U, F>(function: F) -> TryFnConverter<T, U, F>
where
    T: FromValue,
    F: Fn(T) -> Result<U, InternalError>,
{
    TryFnConverter {
        function,
        _marker: PhantomData,
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorClass, ErrorOrigin};

    #[test]
    fn converter_coerces_before_applying() {
        let cents = converter(|dollars: f64| (dollars * 100.0).round() as i64);

        assert_eq!(cents.convert(&Value::Int(3)), Ok(300));
        assert_eq!(cents.convert(&Value::Text("1.25".into())), Ok(125));
    }

    #[test]
    fn converter_propagates_coercion_failure() {
        let upper = converter(|text: String| text.to_uppercase());
        let err = upper.convert(&Value::Null).expect_err("null is not text");

        assert_eq!(err.class, ErrorClass::Conversion);
    }

    #[test]
    fn try_converter_surfaces_user_error() {
        let positive = try_converter(|n: i64| {
            if n > 0 {
                Ok(n)
            } else {
                Err(InternalError::conversion(ErrorOrigin::Mapper, "must be positive"))
            }
        });

        assert_eq!(positive.convert(&Value::Int(4)), Ok(4));
        assert_eq!(
            positive
                .convert(&Value::Int(-4))
                .expect_err("negative")
                .message,
            "must be positive"
        );
    }
}
