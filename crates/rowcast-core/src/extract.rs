//! Key and value extraction for the indexing engine and projected fetches.
//!
//! An extractor is bound once against a schema and then applied to every row.
//! Field selectors extract raw values, arrays and vectors of selectors extract
//! composite keys, and the constructor functions below cover record
//! projection, type coercion, converters and user mapping functions.

use crate::{
    convert::Converter,
    error::InternalError,
    mapper::{FromRow, RowMapper},
    row::Row,
    schema::{Column, Name, Schema, Selector},
    value::{FromValue, Value},
};
use std::{fmt, marker::PhantomData, sync::Arc};

///
/// Extract
///

pub trait Extract {
    type Output;
    type Bound: Bound<Output = Self::Output>;

    /// Resolve field references against the schema of the rows to come.
    fn bind(self, schema: &Schema) -> Result<Self::Bound, InternalError>;
}

///
/// Bound
///
/// An extractor whose field references are already resolved to positions.
///

pub trait Bound {
    type Output;

    fn extract(&self, row: &Row) -> Result<Self::Output, InternalError>;
}

fn value_at(row: &Row, position: usize) -> Result<&Value, InternalError> {
    row.value(position)
        .ok_or_else(|| InternalError::unknown_field(position))
}

///
/// At
/// Raw value at one resolved position.
///

#[derive(Clone, Copy, Debug)]
pub struct At(usize);

impl Bound for At {
    type Output = Value;

    fn extract(&self, row: &Row) -> Result<Value, InternalError> {
        value_at(row, self.0).cloned()
    }
}

// Plain selectors extract the raw value.
macro_rules! raw_selector_extract {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl Extract for $ty {
                type Output = Value;
                type Bound = At;

                fn bind(self, schema: &Schema) -> Result<At, InternalError> {
                    self.resolve(schema).map(At)
                }
            }
        )*
    };
}

raw_selector_extract!(usize, &str, String, &String, Name, &Name);

///
/// AtAs
/// Value at one resolved position, coerced into `T`.
///

pub struct AtAs<T> {
    position: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AtAs<T> {
    const fn new(position: usize) -> Self {
        Self {
            position,
            _marker: PhantomData,
        }
    }
}

impl<T: FromValue> Bound for AtAs<T> {
    type Output = T;

    fn extract(&self, row: &Row) -> Result<T, InternalError> {
        Ok(T::from_value(value_at(row, self.position)?)?)
    }
}

impl<T: FromValue> Extract for Column<T> {
    type Output = T;
    type Bound = AtAs<T>;

    fn bind(self, schema: &Schema) -> Result<AtAs<T>, InternalError> {
        self.resolve(schema).map(AtAs::new)
    }
}

impl<T: FromValue> Extract for &Column<T> {
    type Output = T;
    type Bound = AtAs<T>;

    fn bind(self, schema: &Schema) -> Result<AtAs<T>, InternalError> {
        self.resolve(schema).map(AtAs::new)
    }
}

///
/// AtMany
/// Composite key: the values at several positions, in selector order.
///

#[derive(Clone, Debug)]
pub struct AtMany(Vec<usize>);

impl Bound for AtMany {
    type Output = Vec<Value>;

    fn extract(&self, row: &Row) -> Result<Vec<Value>, InternalError> {
        self.0
            .iter()
            .map(|&position| value_at(row, position).cloned())
            .collect()
    }
}

fn resolve_all<'a, S: Selector + 'a>(
    selectors: impl IntoIterator<Item = &'a S>,
    schema: &Schema,
) -> Result<Vec<usize>, InternalError> {
    selectors
        .into_iter()
        .map(|selector| selector.resolve(schema))
        .collect()
}

impl<S: Selector, const N: usize> Extract for [S; N] {
    type Output = Vec<Value>;
    type Bound = AtMany;

    fn bind(self, schema: &Schema) -> Result<AtMany, InternalError> {
        resolve_all(&self, schema).map(AtMany)
    }
}

impl<S: Selector> Extract for Vec<S> {
    type Output = Vec<Value>;
    type Bound = AtMany;

    fn bind(self, schema: &Schema) -> Result<AtMany, InternalError> {
        resolve_all(&self, schema).map(AtMany)
    }
}

impl<S: Selector> Extract for &[S] {
    type Output = Vec<Value>;
    type Bound = AtMany;

    fn bind(self, schema: &Schema) -> Result<AtMany, InternalError> {
        resolve_all(self, schema).map(AtMany)
    }
}

///
/// FieldAs
/// Target-type coercion of one field.
///

pub struct FieldAs<S, T> {
    selector: S,
    _marker: PhantomData<fn() -> T>,
}

impl<S: Selector, T: FromValue> Extract for FieldAs<S, T> {
    type Output = T;
    type Bound = AtAs<T>;

    fn bind(self, schema: &Schema) -> Result<AtAs<T>, InternalError> {
        self.selector.resolve(schema).map(AtAs::new)
    }
}

/// Extract one field coerced into `T`.
pub const fn field_as<T: FromValue, S: Selector>(selector: S) -> FieldAs<S, T> {
    FieldAs {
        selector,
        _marker: PhantomData,
    }
}

///
/// FieldWith
/// One field passed through a user converter.
///

pub struct FieldWith<S, C> {
    selector: S,
    converter: C,
}

///
/// AtWith
///

pub struct AtWith<C> {
    position: usize,
    converter: C,
}

impl<C: Converter> Bound for AtWith<C> {
    type Output = C::To;

    fn extract(&self, row: &Row) -> Result<C::To, InternalError> {
        self.converter.convert(value_at(row, self.position)?)
    }
}

impl<S: Selector, C: Converter> Extract for FieldWith<S, C> {
    type Output = C::To;
    type Bound = AtWith<C>;

    fn bind(self, schema: &Schema) -> Result<AtWith<C>, InternalError> {
        let position = self.selector.resolve(schema)?;

        Ok(AtWith {
            position,
            converter: self.converter,
        })
    }
}

/// Extract one field through a converter.
pub const fn field_with<S: Selector, C: Converter>(selector: S, converter: C) -> FieldWith<S, C> {
    FieldWith {
        selector,
        converter,
    }
}

///
/// Project
/// Record projection: a narrower row made of the selected fields.
///

pub struct Project<S> {
    selectors: Vec<S>,
}

///
/// Projection
///

#[derive(Clone, Debug)]
pub struct Projection {
    schema: Arc<Schema>,
    positions: Vec<usize>,
}

impl Bound for Projection {
    type Output = Row;

    fn extract(&self, row: &Row) -> Result<Row, InternalError> {
        if let Some(&position) = self.positions.iter().find(|&&p| p >= row.len()) {
            return Err(InternalError::unknown_field(position));
        }

        Ok(row.project_onto(&self.schema, &self.positions))
    }
}

impl<S: Selector> Extract for Project<S> {
    type Output = Row;
    type Bound = Projection;

    fn bind(self, schema: &Schema) -> Result<Projection, InternalError> {
        let positions = resolve_all(&self.selectors, schema)?;
        let projected = schema.project(&positions)?;

        Ok(Projection {
            schema: Arc::new(projected),
            positions,
        })
    }
}

/// Project each row onto the selected fields.
pub fn project<S: Selector>(selectors: impl IntoIterator<Item = S>) -> Project<S> {
    Project {
        selectors: selectors.into_iter().collect(),
    }
}

///
/// WholeRow
/// The row itself; the default value extractor.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct WholeRow;

impl Bound for WholeRow {
    type Output = Row;

    fn extract(&self, row: &Row) -> Result<Row, InternalError> {
        Ok(row.clone())
    }
}

impl Extract for WholeRow {
    type Output = Row;
    type Bound = Self;

    fn bind(self, _schema: &Schema) -> Result<Self, InternalError> {
        Ok(self)
    }
}

#[must_use]
pub const fn row() -> WholeRow {
    WholeRow
}

///
/// IntoType
/// Whole-row conversion into a `FromRow` type.
///

pub struct IntoType<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for IntoType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IntoType")
    }
}

impl<T: FromRow> Bound for IntoType<T> {
    type Output = T;

    fn extract(&self, row: &Row) -> Result<T, InternalError> {
        T::from_row(row)
    }
}

impl<T: FromRow> Extract for IntoType<T> {
    type Output = T;
    type Bound = Self;

    fn bind(self, _schema: &Schema) -> Result<Self, InternalError> {
        Ok(self)
    }
}

#[must_use]
pub const fn into_type<T: FromRow>() -> IntoType<T> {
    IntoType {
        _marker: PhantomData,
    }
}

///
/// Mapped
/// Whole-row user mapping function.
///

pub struct Mapped<M, T> {
    mapper: M,
    _marker: PhantomData<fn() -> T>,
}

impl<M: RowMapper<T>, T> Bound for Mapped<M, T> {
    type Output = T;

    fn extract(&self, row: &Row) -> Result<T, InternalError> {
        self.mapper.map_row(row)
    }
}

impl<M: RowMapper<T>, T> Extract for Mapped<M, T> {
    type Output = T;
    type Bound = Self;

    fn bind(self, _schema: &Schema) -> Result<Self, InternalError> {
        Ok(self)
    }
}

pub const fn mapped<T, M: RowMapper<T>>(mapper: M) -> Mapped<M, T> {
    Mapped {
        mapper,
        _marker: PhantomData,
    }
}

///
/// TESTS
///
