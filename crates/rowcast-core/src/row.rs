use crate::{
    convert::Converter,
    error::InternalError,
    extract::{Bound, Extract},
    mapper::{FromRow, RowMapper},
    schema::{Schema, Selector},
    value::{FromValue, Value},
};
use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

///
/// Row
///
/// Immutable ordered tuple of values sharing its schema with every other row
/// produced by the same cursor. Equality and hashing look at values only.
///

#[derive(Clone, Debug)]
pub struct Row {
    schema: Arc<Schema>,
    values: Arc<[Value]>,
}

impl Row {
    /// Build a row, rejecting a value count that disagrees with the schema.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self, InternalError> {
        if values.len() != schema.len() {
            return Err(InternalError::cursor_invariant(format!(
                "row has {} values but schema declares {} fields",
                values.len(),
                schema.len()
            )));
        }

        Ok(Self {
            schema,
            values: values.into(),
        })
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Positional access without schema resolution.
    #[must_use]
    pub fn value(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    //
    // Field access
    //

    pub fn get<S: Selector + ?Sized>(&self, selector: &S) -> Result<&Value, InternalError> {
        let position = selector.resolve(&self.schema)?;

        self.values
            .get(position)
            .ok_or_else(|| InternalError::unknown_field(position))
    }

    pub fn get_as<T, S>(&self, selector: &S) -> Result<T, InternalError>
    where
        T: FromValue,
        S: Selector + ?Sized,
    {
        Ok(T::from_value(self.get(selector)?)?)
    }

    pub fn get_with<C, S>(&self, selector: &S, converter: &C) -> Result<C::To, InternalError>
    where
        C: Converter,
        S: Selector + ?Sized,
    {
        converter.convert(self.get(selector)?)
    }

    //
    // Whole-row conversion
    //

    /// Bind an extractor against this row's schema and apply it.
    pub fn extract<E: Extract>(&self, extract: E) -> Result<E::Output, InternalError> {
        extract.bind(&self.schema)?.extract(self)
    }

    /// Positional conversion into a tuple or other `FromRow` type.
    pub fn to_type<T: FromRow>(&self) -> Result<T, InternalError> {
        T::from_row(self)
    }

    pub fn map<T, M: RowMapper<T> + ?Sized>(&self, mapper: &M) -> Result<T, InternalError> {
        mapper.map_row(self)
    }

    /// Field name → value; the first occurrence of a duplicated name wins.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, Value> {
        let mut map = HashMap::with_capacity(self.values.len());
        for (field, value) in self.schema.fields().iter().zip(self.values.iter()) {
            map.entry(field.name().to_string())
                .or_insert_with(|| value.clone());
        }

        map
    }

    #[must_use]
    pub fn to_array(&self) -> Vec<Value> {
        self.values.to_vec()
    }

    /// Copy the given positions onto an already projected schema.
    pub(crate) fn project_onto(&self, schema: &Arc<Schema>, positions: &[usize]) -> Self {
        let values = positions
            .iter()
            .map(|&position| self.values.get(position).cloned().unwrap_or(Value::Null))
            .collect::<Vec<_>>();

        Self {
            schema: Arc::clone(schema),
            values: values.into(),
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

impl Eq for Row {}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.values.hash(state);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::converter,
        error::ErrorClass,
        schema::{Column, Field, Name},
        value::DataType,
    };

    fn book_row() -> Row {
        let schema = Arc::new(Schema::new(vec![
            Field::qualified("book", "id", DataType::Int),
            Field::qualified("book", "title", DataType::Text),
            Field::qualified("author", "id", DataType::Int),
        ]));

        Row::new(
            schema,
            vec![Value::Int(1), Value::Text("Dune".into()), Value::Int(7)],
        )
        .expect("row shape matches schema")
    }

    #[test]
    fn new_rejects_shape_mismatch() {
        let schema = Arc::new(Schema::of(&["a", "b"]));
        let err = Row::new(schema, vec![Value::Int(1)]).expect_err("missing value");

        assert_eq!(err.class, ErrorClass::InvariantViolation);
    }

    #[test]
    fn get_resolves_position_name_and_qualified_name() {
        let row = book_row();

        assert_eq!(row.get(&1usize), Ok(&Value::Text("Dune".into())));
        assert_eq!(row.get("ID"), Ok(&Value::Int(1)));
        assert_eq!(row.get(&Name::parse("author.id")), Ok(&Value::Int(7)));
        assert!(row.get("missing").is_err());
    }

    #[test]
    fn get_as_and_get_with_coerce() {
        let row = book_row();

        assert_eq!(row.get_as::<u32, _>("id"), Ok(1));
        assert_eq!(row.get_as::<String, _>(&Column::<String>::new("title")), Ok("Dune".into()));
        assert_eq!(
            row.get_with("title", &converter(|s: String| s.len())),
            Ok(4)
        );
    }

    #[test]
    fn to_map_keeps_first_duplicate_name() {
        let map = book_row().to_map();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn equality_ignores_schema() {
        let row = book_row();
        let other = Row::new(
            Arc::new(Schema::of(&["x", "y", "z"])),
            row.to_array(),
        )
        .expect("same arity");

        assert_eq!(row, other);
    }
}
