use crate::{error::InternalError, value::DataType};
use serde::{Deserialize, Serialize};
use std::{fmt, marker::PhantomData};

///
/// Name
///
/// Optionally qualified field name (`table.column`).
/// All comparisons are ASCII case-insensitive.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Name {
    qualifier: Option<String>,
    name: String,
}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }

    /// Split on the last `.`; a leading or trailing dot is kept in the name.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once('.') {
            Some((qualifier, name)) if !qualifier.is_empty() && !name.is_empty() => {
                Self::qualified(qualifier, name)
            }
            _ => Self::new(text),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// An unqualified name matches a field under any qualifier.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) {
            return false;
        }

        match (&self.qualifier, &other.qualifier) {
            (None, _) => true,
            (Some(mine), Some(theirs)) => mine.eq_ignore_ascii_case(theirs),
            (Some(_), None) => false,
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "{qualifier}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

///
/// Field
/// One schema entry: name plus declared type.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Field {
    name: Name,
    data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: Name::new(name),
            data_type,
        }
    }

    pub fn qualified(
        qualifier: impl Into<String>,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            name: Name::qualified(qualifier, name),
            data_type,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.name()
    }

    #[must_use]
    pub const fn qualified_name(&self) -> &Name {
        &self.name
    }

    #[must_use]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }
}

///
/// Schema
///
/// Ordered field list shared by every row of one cursor or row set.
/// Duplicate names are allowed; name lookup returns the first match.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    #[must_use]
    pub const fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Untyped schema from bare field names.
    #[must_use]
    pub fn of(names: &[&str]) -> Self {
        Self::new(
            names
                .iter()
                .map(|name| Field::new(*name, DataType::Any))
                .collect(),
        )
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, position: usize) -> Option<&Field> {
        self.fields.get(position)
    }

    /// First position whose unqualified name matches, case-insensitively.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name().eq_ignore_ascii_case(name))
    }

    /// First position matching a possibly qualified name.
    #[must_use]
    pub fn index_of_name(&self, name: &Name) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| name.matches(field.qualified_name()))
    }

    /// Sub-schema made of the given positions, in the given order.
    pub fn project(&self, positions: &[usize]) -> Result<Self, InternalError> {
        positions
            .iter()
            .map(|&position| {
                self.fields
                    .get(position)
                    .cloned()
                    .ok_or_else(|| InternalError::unknown_field(position))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(Field::name).collect()
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

///
/// Selector
///
/// Resolves one field reference (position, name, qualified name or typed
/// column) to a position inside a schema.
///

pub trait Selector {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError>;
}

impl<S: Selector + ?Sized> Selector for &S {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError> {
        (**self).resolve(schema)
    }
}

impl Selector for usize {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError> {
        if *self < schema.len() {
            Ok(*self)
        } else {
            Err(InternalError::unknown_field(format!(
                "position {self} (row has {} fields)",
                schema.len()
            )))
        }
    }
}

impl Selector for str {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError> {
        schema
            .index_of(self)
            .ok_or_else(|| InternalError::unknown_field(self))
    }
}

impl Selector for String {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError> {
        self.as_str().resolve(schema)
    }
}

impl Selector for Name {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError> {
        schema
            .index_of_name(self)
            .ok_or_else(|| InternalError::unknown_field(self))
    }
}

///
/// Column
///
/// Typed field reference: resolves like a `Name` and extracts as `T`.
///

pub struct Column<T> {
    name: Name,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Column<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Name::new(name),
            _marker: PhantomData,
        }
    }

    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: Name::qualified(qualifier, name),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &Name {
        &self.name
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Column").field(&self.name).finish()
    }
}

impl<T> Selector for Column<T> {
    fn resolve(&self, schema: &Schema) -> Result<usize, InternalError> {
        self.name.resolve(schema)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::qualified("author", "id", DataType::Int),
            Field::qualified("book", "id", DataType::Int),
            Field::qualified("book", "Title", DataType::Text),
        ])
    }

    #[test]
    fn name_lookup_is_case_insensitive_and_first_match() {
        let schema = schema();

        assert_eq!("ID".resolve(&schema), Ok(0));
        assert_eq!("title".resolve(&schema), Ok(2));
    }

    #[test]
    fn qualified_lookup_picks_the_matching_qualifier() {
        let schema = schema();

        assert_eq!(Name::parse("BOOK.id").resolve(&schema), Ok(1));
        assert_eq!(Name::new("id").resolve(&schema), Ok(0));
        assert!(Name::parse("publisher.id").resolve(&schema).is_err());
    }

    #[test]
    fn position_lookup_is_bounds_checked() {
        let schema = schema();

        assert_eq!(2usize.resolve(&schema), Ok(2));
        let err = 3usize.resolve(&schema).expect_err("out of range");
        assert_eq!(err.class, crate::error::ErrorClass::UnknownField);
    }

    #[test]
    fn name_parse_ignores_degenerate_dots() {
        assert_eq!(Name::parse("a.b").qualifier(), Some("a"));
        assert_eq!(Name::parse(".b").qualifier(), None);
        assert_eq!(Name::parse("b.").name(), "b.");
        assert_eq!(Name::parse("s.t.c").qualifier(), Some("s.t"));
    }

    #[test]
    fn project_keeps_requested_order() {
        let projected = schema().project(&[2, 0]).expect("projection");

        assert_eq!(projected.names(), vec!["Title", "id"]);
        assert!(schema().project(&[9]).is_err());
    }

    #[test]
    fn typed_column_resolves_by_name() {
        let column = Column::<i64>::qualified("book", "id");

        assert_eq!(column.resolve(&schema()), Ok(1));
    }
}
