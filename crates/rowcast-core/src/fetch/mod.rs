//! Synchronous fetch surface over any `ResultQuery`.
//!
//! `FetchExt` is blanket-implemented, so every query gets the whole strategy
//! family. Each method opens its own cursor; nothing is re-executed from a
//! previous call.

mod response;
pub(crate) mod strategy;


pub use response::ResponseError;

use crate::{
    cursor::Cursor,
    deliver::{
        future::{self, FetchHandle, WorkerPool, default_pool},
        reactive::{self, Subscriber},
        stream::{self, LazyRows, RowStream},
    },
    error::InternalError,
    extract::Extract,
    mapper::{FromRow, RowMapper},
    obs::FetchKind,
    result_set::RowSet,
    row::Row,
    source::ResultQuery,
    value::Value,
};
use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
};

///
/// FetchExt
///
/// Terminal fetch strategies, indexing mirrors and delivery adapters.
///
/// Zero/one/many contracts:
/// - `fetch_one` and `fetch_any` never fail on row count
/// - `fetch_single` fails with `TooFewRows` or `TooManyRows`
/// - projected `_as` / `_into` variants give `None` for an absent row
///

pub trait FetchExt: ResultQuery {
    //
    // Rows
    //

    /// Drain every row into a `RowSet`.
    fn fetch(&self) -> Result<RowSet, InternalError> {
        strategy::all(self)
    }

    fn fetch_all(&self) -> Result<RowSet, InternalError> {
        strategy::all(self)
    }

    /// Execute and hand the auto-closing cursor to the caller.
    fn fetch_lazy(&self) -> Result<Cursor, InternalError> {
        Cursor::open(self)
    }

    /// Execute and hand over a cursor that stays open at end of data.
    fn fetch_lazy_non_auto_closing(&self) -> Result<Cursor, InternalError> {
        Cursor::open_non_auto_closing(self)
    }

    /// One `RowSet` per result set of the statement.
    fn fetch_many(&self) -> Result<Vec<RowSet>, InternalError> {
        strategy::many(self)
    }

    //
    // One
    //

    /// First row, or `None` for an empty result.
    fn fetch_one(&self) -> Result<Option<Row>, InternalError> {
        strategy::one(self)
    }

    fn fetch_one_as<E: Extract>(&self, extract: E) -> Result<Option<E::Output>, InternalError> {
        strategy::one(self)?.map(|row| row.extract(extract)).transpose()
    }

    fn fetch_one_into<T: FromRow>(&self) -> Result<Option<T>, InternalError> {
        strategy::one(self)?.map(|row| T::from_row(&row)).transpose()
    }

    //
    // Single
    //

    /// Exactly one row.
    fn fetch_single(&self) -> Result<Row, InternalError> {
        strategy::single(self)
    }

    fn fetch_single_as<E: Extract>(&self, extract: E) -> Result<E::Output, InternalError> {
        strategy::single(self)?.extract(extract)
    }

    fn fetch_single_into<T: FromRow>(&self) -> Result<T, InternalError> {
        T::from_row(&strategy::single(self)?)
    }

    //
    // Any
    //

    /// First row without draining; the cursor is closed right after.
    fn fetch_any(&self) -> Result<Option<Row>, InternalError> {
        strategy::any(self)
    }

    fn fetch_any_as<E: Extract>(&self, extract: E) -> Result<Option<E::Output>, InternalError> {
        strategy::any(self)?.map(|row| row.extract(extract)).transpose()
    }

    fn fetch_any_into<T: FromRow>(&self) -> Result<Option<T>, InternalError> {
        strategy::any(self)?.map(|row| T::from_row(&row)).transpose()
    }

    //
    // Optional
    //

    /// `fetch_one`, for callers that read the result as present or absent.
    fn fetch_optional(&self) -> Result<Option<Row>, InternalError> {
        self.fetch_one()
    }

    fn fetch_optional_as<E: Extract>(
        &self,
        extract: E,
    ) -> Result<Option<E::Output>, InternalError> {
        self.fetch_one_as(extract)
    }

    fn fetch_optional_into<T: FromRow>(&self) -> Result<Option<T>, InternalError> {
        self.fetch_one_into()
    }

    //
    // Lists
    //

    fn fetch_values<E: Extract>(&self, extract: E) -> Result<Vec<E::Output>, InternalError> {
        strategy::all(self)?.values(extract)
    }

    fn fetch_set<E>(&self, extract: E) -> Result<HashSet<E::Output>, InternalError>
    where
        E: Extract,
        E::Output: Eq + Hash,
    {
        strategy::all(self)?.to_set(extract)
    }

    fn fetch_into<T: FromRow>(&self) -> Result<Vec<T>, InternalError> {
        strategy::all(self)?.to_types()
    }

    fn fetch_mapped<T, M: RowMapper<T>>(&self, mapper: M) -> Result<Vec<T>, InternalError> {
        strategy::all(self)?.map_rows(&mapper)
    }

    fn fetch_arrays(&self) -> Result<Vec<Vec<Value>>, InternalError> {
        Ok(strategy::all(self)?.to_arrays())
    }

    fn fetch_maps(&self) -> Result<Vec<HashMap<String, Value>>, InternalError> {
        Ok(strategy::all(self)?.to_maps())
    }

    /// Collect rows straight into `C` from a scoped cursor.
    fn collect_rows<C: FromIterator<Row>>(&self) -> Result<C, InternalError> {
        strategy::collect(self)
    }

    /// Visit each row without materializing; returns the number visited.
    fn fetch_each<F>(&self, handler: F) -> Result<usize, InternalError>
    where
        F: FnMut(Row) -> Result<(), InternalError>,
    {
        strategy::each(self, handler)
    }

    //
    // Maps and groups
    //

    fn fetch_map<K, V>(
        &self,
        key: K,
        value: V,
    ) -> Result<HashMap<K::Output, V::Output>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
        V: Extract,
    {
        strategy::indexed(
            self,
            FetchKind::Map,
            |rows| rows.to_map(key, value),
            HashMap::len,
        )
    }

    fn fetch_map_by<K>(&self, key: K) -> Result<HashMap<K::Output, Row>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
    {
        strategy::indexed(
            self,
            FetchKind::Map,
            |rows| rows.to_map_by(key),
            HashMap::len,
        )
    }

    fn fetch_groups<K, V>(
        &self,
        key: K,
        value: V,
    ) -> Result<HashMap<K::Output, Vec<V::Output>>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
        V: Extract,
    {
        strategy::indexed(
            self,
            FetchKind::Group,
            |rows| rows.to_groups(key, value),
            HashMap::len,
        )
    }

    fn fetch_groups_by<K>(&self, key: K) -> Result<HashMap<K::Output, RowSet>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
    {
        strategy::indexed(
            self,
            FetchKind::Group,
            |rows| rows.to_groups_by(key),
            HashMap::len,
        )
    }

    //
    // Pull streams
    //

    /// Iterator that executes the query on its first `next`.
    fn fetch_stream(&self) -> LazyRows<'_, Self> {
        LazyRows::new(self)
    }

    fn fetch_stream_into<T: FromRow>(&self) -> impl Iterator<Item = Result<T, InternalError>> {
        self.fetch_stream()
            .map(|row| row.and_then(|row| T::from_row(&row)))
    }

    /// Async stream fed by a producer on `pool`, buffered per
    /// `FetchConfig::stream_buffer`.
    fn row_stream<P>(&self, pool: &P) -> RowStream
    where
        Self: Clone + Send + 'static,
        P: WorkerPool + ?Sized,
    {
        stream::row_stream(self.clone(), pool, self.config().stream_buffer)
    }

    //
    // Futures
    //

    /// `fetch` on the default pool.
    fn fetch_async(&self) -> FetchHandle<RowSet>
    where
        Self: Clone + Send + 'static,
    {
        match default_pool(self.config()) {
            Ok(pool) => self.fetch_async_on(&pool),
            Err(err) => FetchHandle::failed(err),
        }
    }

    fn fetch_async_on<P>(&self, pool: &P) -> FetchHandle<RowSet>
    where
        Self: Clone + Send + 'static,
        P: WorkerPool + ?Sized,
    {
        self.fetch_async_with(pool, strategy::all::<Self>)
    }

    /// Run any fetch `f` against a clone of this query on `pool`.
    fn fetch_async_with<P, T, F>(&self, pool: &P, f: F) -> FetchHandle<T>
    where
        Self: Clone + Send + 'static,
        P: WorkerPool + ?Sized,
        T: Send + 'static,
        F: FnOnce(&Self) -> Result<T, InternalError> + Send + 'static,
    {
        let query = self.clone();

        future::spawn(pool, move || f(&query))
    }

    //
    // Push
    //

    fn subscribe<S: Subscriber<Row>>(&self, subscriber: S)
    where
        Self: Clone + Send + 'static,
    {
        reactive::subscribe(self.clone(), subscriber);
    }

    fn subscribe_on<P, S>(&self, pool: &P, subscriber: S)
    where
        Self: Clone + Send + 'static,
        P: WorkerPool + ?Sized,
        S: Subscriber<Row>,
    {
        reactive::subscribe_on(self.clone(), pool, subscriber);
    }
}

impl<Q: ResultQuery + ?Sized> FetchExt for Q {}
