//! Arity-bound row mapping.
//!
//! Tuples of 1 to 22 elements convert from the first N positional values of a
//! row, and functions of 1 to 22 parameters are called with those values.
//! Arity and parameter types come from the tuple or closure signature, so a
//! mismatch is a compile error rather than a runtime check. Extra columns are
//! ignored; a row narrower than the arity is a conversion error.

use crate::{
    error::{ErrorOrigin, InternalError},
    row::Row,
    value::FromValue,
};
use std::{fmt, marker::PhantomData};

/// Largest tuple / parameter arity with a generated mapping.
pub const MAX_ARITY: usize = 22;

///
/// FromRow
///
/// Whole-row conversion into a user type.
///

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self, InternalError>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> Result<Self, InternalError> {
        Ok(row.clone())
    }
}

///
/// RowMapper
///
/// Row → `T` mapping used by `fetch_mapped`, `mapped(..)` and the stream
/// adapters. Closures over `&Row` implement it directly.
///

pub trait RowMapper<T> {
    fn map_row(&self, row: &Row) -> Result<T, InternalError>;
}

impl<F, T> RowMapper<T> for F
where
    F: Fn(&Row) -> Result<T, InternalError>,
{
    fn map_row(&self, row: &Row) -> Result<T, InternalError> {
        self(row)
    }
}

///
/// MapArgs
///
/// A function whose parameter list can be bound positionally from a row.
/// `Args` is the parameter tuple; it only exists to keep the per-arity
/// impls apart.
///

pub trait MapArgs<Args> {
    type Output;

    fn call_row(&self, row: &Row) -> Result<Self::Output, InternalError>;
}

///
/// Mapping
///
/// A positional function adapted into a `RowMapper`.
///

pub struct Mapping<F, Args> {
    function: F,
    _marker: PhantomData<fn(Args)>,
}

impl<F: Clone, Args> Clone for Mapping<F, Args> {
    fn clone(&self) -> Self {
        Self {
            function: self.function.clone(),
            _marker: PhantomData,
        }
    }
}

impl<F, Args> fmt::Debug for Mapping<F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mapping")
    }
}

impl<F, Args> RowMapper<F::Output> for Mapping<F, Args>
where
    F: MapArgs<Args>,
{
    fn map_row(&self, row: &Row) -> Result<F::Output, InternalError> {
        self.function.call_row(row)
    }
}

/// Adapt `Fn(T1, .., Tn) -> U` into a row mapper binding positions `0..n`.
pub const fn mapping<F, Args>(function: F) -> Mapping<F, Args>
where
    F: MapArgs<Args>,
{
    Mapping {
        function,
        _marker: PhantomData,
    }
}

fn check_arity(row: &Row, arity: usize) -> Result<(), InternalError> {
    if row.len() < arity {
        return Err(InternalError::conversion(
            ErrorOrigin::Mapper,
            format!(
                "mapping of arity {arity} applied to a row with {} fields",
                row.len()
            ),
        ));
    }

    Ok(())
}

fn positional<T: FromValue>(row: &Row, position: usize) -> Result<T, InternalError> {
    let value = row
        .value(position)
        .ok_or_else(|| InternalError::unknown_field(position))?;

    T::from_value(value).map_err(|err| {
        InternalError::conversion(ErrorOrigin::Mapper, format!("position {position}: {err}"))
    })
}

// One `FromRow` tuple impl and one `MapArgs` function impl per arity.
macro_rules! impl_arity {
    ( $( $arity:literal => ( $( $pos:tt $ty:ident $arg:ident ),+ ) );+ $(;)? ) => {
        $(
            impl<$( $ty: FromValue ),+> FromRow for ( $( $ty, )+ ) {
                fn from_row(row: &Row) -> Result<Self, InternalError> {
                    check_arity(row, $arity)?;

                    Ok(( $( positional::<$ty>(row, $pos)?, )+ ))
                }
            }

            impl<Func, Out, $( $ty: FromValue ),+> MapArgs<( $( $ty, )+ )> for Func
            where
                Func: Fn( $( $ty ),+ ) -> Out,
            {
                type Output = Out;

                fn call_row(&self, row: &Row) -> Result<Out, InternalError> {
                    let ( $( $arg, )+ ) = <( $( $ty, )+ ) as FromRow>::from_row(row)?;

                    Ok(self( $( $arg ),+ ))
                }
            }
        )+
    };
}

impl_arity! {
    1 => (0 T1 a1);
    2 => (0 T1 a1, 1 T2 a2);
    3 => (0 T1 a1, 1 T2 a2, 2 T3 a3);
    4 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4);
    5 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5);
    6 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6);
    7 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7);
    8 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8);
    9 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9);
    10 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10);
    11 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11);
    12 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12);
    13 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13);
    14 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14);
    15 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15);
    16 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16);
    17 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16,
        16 T17 a17);
    18 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16,
        16 T17 a17, 17 T18 a18);
    19 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16,
        16 T17 a17, 17 T18 a18, 18 T19 a19);
    20 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16,
        16 T17 a17, 17 T18 a18, 18 T19 a19, 19 T20 a20);
    21 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16,
        16 T17 a17, 17 T18 a18, 18 T19 a19, 19 T20 a20, 20 T21 a21);
    22 => (0 T1 a1, 1 T2 a2, 2 T3 a3, 3 T4 a4, 4 T5 a5, 5 T6 a6, 6 T7 a7, 7 T8 a8, 8 T9 a9,
        9 T10 a10, 10 T11 a11, 11 T12 a12, 12 T13 a13, 13 T14 a14, 14 T15 a15, 15 T16 a16,
        16 T17 a17, 17 T18 a18, 18 T19 a19, 19 T20 a20, 20 T21 a21, 21 T22 a22);
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorClass, schema::Schema, value::Value};
    use std::sync::Arc;

    fn row_of(values: Vec<Value>) -> Row {
        let names = (0..values.len()).map(|i| format!("c{i}")).collect::<Vec<_>>();
        let names = names.iter().map(String::as_str).collect::<Vec<_>>();

        Row::new(Arc::new(Schema::of(&names)), values).expect("row")
    }

    #[derive(Debug, PartialEq)]
    struct Book {
        id: i64,
        title: String,
    }

    #[test]
    fn arity_two_ignores_extra_columns() {
        let row = row_of(vec![
            Value::Int(1),
            Value::Text("Dune".into()),
            Value::Int(1965),
        ]);

        let book = row
            .map(&mapping(|id: i64, title: String| Book { id, title }))
            .expect("mapped");

        assert_eq!(
            book,
            Book {
                id: 1,
                title: "Dune".into()
            }
        );
    }

    #[test]
    fn narrow_row_is_a_conversion_error() {
        let row = row_of(vec![Value::Int(1)]);
        let err = row
            .to_type::<(i64, String)>()
            .expect_err("row narrower than arity");

        assert_eq!(err.class, ErrorClass::Conversion);
        assert_eq!(err.origin, ErrorOrigin::Mapper);
    }

    #[test]
    fn parameter_types_drive_coercion() {
        let row = row_of(vec![Value::Text("42".into()), Value::Int(1)]);

        assert_eq!(row.to_type::<(u8, bool)>(), Ok((42, true)));

        let err = row
            .to_type::<(bool,)>()
            .expect_err("\"42\" is not a boolean");
        assert!(err.message.starts_with("position 0:"));
    }

    #[test]
    fn max_arity_tuple_binds_every_position() {
        let values = (0..MAX_ARITY as i64).map(Value::Int).collect::<Vec<_>>();
        let row = row_of(values);

        let sum = row
            .map(&mapping(
                |a1: i64, a2: i64, a3: i64, a4: i64, a5: i64, a6: i64, a7: i64, a8: i64,
                 a9: i64, a10: i64, a11: i64, a12: i64, a13: i64, a14: i64, a15: i64,
                 a16: i64, a17: i64, a18: i64, a19: i64, a20: i64, a21: i64, a22: i64| {
                    a1 + a2 + a3 + a4 + a5 + a6 + a7 + a8 + a9 + a10 + a11 + a12 + a13
                        + a14 + a15 + a16 + a17 + a18 + a19 + a20 + a21 + a22
                },
            ))
            .expect("22 positions");

        assert_eq!(sum, (0..22).sum::<i64>());
    }

    #[test]
    fn closures_over_rows_are_mappers() {
        let row = row_of(vec![Value::Int(5)]);
        let double = |row: &Row| row.get_as::<i64, _>(&0usize).map(|n| n * 2);

        assert_eq!(row.map(&double), Ok(10));
    }
}
