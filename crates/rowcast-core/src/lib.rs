//! Core engine for rowcast: cursors, terminal fetch strategies, the indexing
//! engine, arity-bound mapping, and delivery adapters, plus the ergonomics
//! exported via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod convert;
pub mod cursor;
pub mod deliver;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod mapper;
pub mod obs;
pub mod result_set;
pub mod row;
pub mod schema;
pub mod source;
pub mod value;

///
/// CONSTANTS
///

pub use mapper::MAX_ARITY;

///
/// Prelude
///
/// Vocabulary for writing fetches: the traits, the row and result types, and
/// the extractor constructors. Errors and delivery internals are not
/// re-exported here.
///

pub mod prelude {
    pub use crate::{
        convert::{converter, try_converter},
        extract::{field_as, field_with, into_type, mapped, project, row},
        fetch::FetchExt as _,
        mapper::{FromRow, RowMapper, mapping},
        result_set::RowSet,
        row::Row,
        schema::{Column, Name, Schema},
        source::ResultQuery,
        value::{FromValue, Value},
    };
}
