//! A hand-written `ResultQuery` driven through the facade.

use rowcast::{
    DataType, ErrorKind, RowSource,
    core::{error::InternalError, schema::Field},
    prelude::*,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

///
/// Listing
/// Pipe-separated lines, parsed on read.
///

#[derive(Clone)]
struct Listing {
    lines: Arc<Vec<&'static str>>,
    closes: Arc<AtomicUsize>,
}

impl Listing {
    fn new(lines: Vec<&'static str>) -> Self {
        Self {
            lines: Arc::new(lines),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct ListingSource {
    schema: Arc<Schema>,
    lines: Arc<Vec<&'static str>>,
    next: usize,
    closes: Arc<AtomicUsize>,
}

impl ResultQuery for Listing {
    fn open(&self) -> std::result::Result<Box<dyn RowSource>, InternalError> {
        let schema = Schema::new(vec![
            Field::qualified("book", "id", DataType::Int),
            Field::qualified("book", "title", DataType::Text),
            Field::qualified("author", "name", DataType::Text),
        ]);

        Ok(Box::new(ListingSource {
            schema: Arc::new(schema),
            lines: Arc::clone(&self.lines),
            next: 0,
            closes: Arc::clone(&self.closes),
        }))
    }
}

impl RowSource for ListingSource {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn next_values(&mut self) -> std::result::Result<Option<Vec<Value>>, InternalError> {
        let Some(line) = self.lines.get(self.next) else {
            return Ok(None);
        };
        self.next += 1;

        Ok(Some(
            line.split('|').map(|cell| Value::Text(cell.to_string())).collect(),
        ))
    }

    fn close(&mut self) -> std::result::Result<(), InternalError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn listing() -> Listing {
    Listing::new(vec![
        "1|Dune|Herbert",
        "2|Emma|Austen",
        "3|Persuasion|Austen",
    ])
}

#[derive(Debug, PartialEq)]
struct Book {
    id: u32,
    title: String,
}

fn titles_by_author(query: &Listing) -> Result<Vec<String>> {
    let groups = query.fetch_groups(
        Name::qualified("author", "name"),
        field_as::<String, _>("title"),
    )?;
    let mut austen = groups
        .get(&Value::Text("Austen".into()))
        .cloned()
        .unwrap_or_default();
    austen.sort();

    Ok(austen)
}

#[test]
fn qualified_names_and_coercion_work_through_the_facade() -> Result<()> {
    let query = listing();

    let book = query.fetch_single_as(mapped(mapping(|id: u32, title: String| Book { id, title })));
    assert_eq!(
        book.map_err(Error::from).map_err(|err| err.kind),
        Err(ErrorKind::TooManyRows)
    );

    let first = query
        .fetch_one_as(mapped(mapping(|id: u32, title: String| Book { id, title })))?
        .expect("first row");
    assert_eq!(
        first,
        Book {
            id: 1,
            title: "Dune".into()
        }
    );

    assert_eq!(titles_by_author(&query)?, vec!["Emma", "Persuasion"]);
    assert_eq!(query.closes.load(Ordering::SeqCst), 3);

    Ok(())
}

#[test]
fn unknown_fields_surface_as_unknown_field() {
    let err = Error::from(listing().fetch_values("isbn").expect_err("no such field"));

    assert_eq!(err.kind, ErrorKind::UnknownField);
}

#[test]
fn typed_columns_index_the_result() -> Result<()> {
    let id = Column::<u32>::qualified("book", "id");
    let by_id = listing().fetch_map(&id, "title")?;

    assert_eq!(by_id.get(&3), Some(&Value::Text("Persuasion".into())));

    Ok(())
}
