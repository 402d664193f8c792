//! Materialized results and the indexing engine built on them.
//!
//! Map construction is last-write-wins per key. Group construction appends
//! in row order. Both bind their extractors once and visit every row once.

#[cfg(test)]
mod tests;

use crate::{
    error::InternalError,
    extract::{Bound, Extract, WholeRow},
    mapper::{FromRow, RowMapper},
    row::Row,
    schema::Schema,
    value::Value,
};
use derive_more::{Deref, IntoIterator};
use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::Arc,
};

///
/// RowSet
///
/// Owned, ordered rows plus the schema they were read under. Row order is
/// the order the producing cursor yielded them.
///

#[derive(Clone, Debug, Deref, Eq, IntoIterator, PartialEq)]
pub struct RowSet {
    schema: Arc<Schema>,
    #[deref]
    #[into_iterator(owned, ref)]
    rows: Vec<Row>,
}

impl RowSet {
    #[must_use]
    pub const fn new(schema: Arc<Schema>, rows: Vec<Row>) -> Self {
        Self { schema, rows }
    }

    #[must_use]
    pub const fn empty(schema: Arc<Schema>) -> Self {
        Self::new(schema, Vec::new())
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    //
    // Maps
    //

    /// Key → value map; a later row with the same key overwrites.
    pub fn to_map<K, V>(
        &self,
        key: K,
        value: V,
    ) -> Result<HashMap<K::Output, V::Output>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
        V: Extract,
    {
        let key = key.bind(&self.schema)?;
        let value = value.bind(&self.schema)?;

        let mut map = HashMap::with_capacity(self.rows.len());
        for row in &self.rows {
            map.insert(key.extract(row)?, value.extract(row)?);
        }

        Ok(map)
    }

    /// Key → whole row map.
    pub fn to_map_by<K>(&self, key: K) -> Result<HashMap<K::Output, Row>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
    {
        self.to_map(key, WholeRow)
    }

    //
    // Groups
    //

    /// Key → values of every row sharing the key, in row order.
    pub fn to_groups<K, V>(
        &self,
        key: K,
        value: V,
    ) -> Result<HashMap<K::Output, Vec<V::Output>>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
        V: Extract,
    {
        let key = key.bind(&self.schema)?;
        let value = value.bind(&self.schema)?;

        let mut groups: HashMap<K::Output, Vec<V::Output>> = HashMap::new();
        for row in &self.rows {
            groups
                .entry(key.extract(row)?)
                .or_default()
                .push(value.extract(row)?);
        }

        Ok(groups)
    }

    /// Key → row set of every row sharing the key, in row order.
    pub fn to_groups_by<K>(&self, key: K) -> Result<HashMap<K::Output, Self>, InternalError>
    where
        K: Extract,
        K::Output: Eq + Hash,
    {
        let groups = self.to_groups(key, WholeRow)?;

        Ok(groups
            .into_iter()
            .map(|(key, rows)| (key, Self::new(Arc::clone(&self.schema), rows)))
            .collect())
    }

    //
    // Lists and sets
    //

    /// One extracted value per row, in row order.
    pub fn values<E: Extract>(&self, extract: E) -> Result<Vec<E::Output>, InternalError> {
        let bound = extract.bind(&self.schema)?;

        self.rows.iter().map(|row| bound.extract(row)).collect()
    }

    /// Distinct extracted values.
    pub fn to_set<E>(&self, extract: E) -> Result<HashSet<E::Output>, InternalError>
    where
        E: Extract,
        E::Output: Eq + Hash,
    {
        let bound = extract.bind(&self.schema)?;

        self.rows.iter().map(|row| bound.extract(row)).collect()
    }

    pub fn to_types<T: FromRow>(&self) -> Result<Vec<T>, InternalError> {
        self.rows.iter().map(T::from_row).collect()
    }

    pub fn map_rows<T, M: RowMapper<T> + ?Sized>(&self, mapper: &M) -> Result<Vec<T>, InternalError> {
        self.rows.iter().map(|row| mapper.map_row(row)).collect()
    }

    #[must_use]
    pub fn to_arrays(&self) -> Vec<Vec<Value>> {
        self.rows.iter().map(Row::to_array).collect()
    }

    #[must_use]
    pub fn to_maps(&self) -> Vec<HashMap<String, Value>> {
        self.rows.iter().map(Row::to_map).collect()
    }
}
