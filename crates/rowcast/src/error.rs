use derive_more::Display;
use rowcast_core::{
    config::ConfigError,
    error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError},
    fetch::ResponseError,
    value::ConversionError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// `true` for row-count violations raised by `fetch_single`.
    #[must_use]
    pub const fn is_cardinality(&self) -> bool {
        matches!(self.kind, ErrorKind::TooFewRows | ErrorKind::TooManyRows)
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(err.class.into(), err.origin.into(), err.message)
    }
}

impl From<ResponseError> for Error {
    fn from(err: ResponseError) -> Self {
        InternalError::from(err).into()
    }
}

impl From<ConversionError> for Error {
    fn from(err: ConversionError) -> Self {
        InternalError::from(err).into()
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        InternalError::from(err).into()
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ErrorKind {
    /// The data source failed; never retried here.
    DataAccess,

    /// `fetch_single` found no row.
    TooFewRows,

    /// `fetch_single` found more than one row.
    TooManyRows,

    /// The query does not provide the requested capability.
    UnsupportedOperation,

    /// A value could not be coerced to the requested type.
    Conversion,

    /// A selector does not resolve against the row schema.
    UnknownField,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::DataAccess => Self::DataAccess,
            ErrorClass::TooFewRows => Self::TooFewRows,
            ErrorClass::TooManyRows => Self::TooManyRows,
            ErrorClass::Unsupported => Self::UnsupportedOperation,
            ErrorClass::Conversion => Self::Conversion,
            ErrorClass::UnknownField => Self::UnknownField,
            ErrorClass::InvariantViolation | ErrorClass::Internal => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Source,
    Cursor,
    Fetch,
    Index,
    Mapper,
    Delivery,
    Config,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Source => Self::Source,
            CoreErrorOrigin::Cursor => Self::Cursor,
            CoreErrorOrigin::Fetch => Self::Fetch,
            CoreErrorOrigin::Index => Self::Index,
            CoreErrorOrigin::Mapper => Self::Mapper,
            CoreErrorOrigin::Delivery => Self::Delivery,
            CoreErrorOrigin::Config => Self::Config,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_violations_surface_as_internal() {
        let err = Error::from(InternalError::new(
            ErrorClass::InvariantViolation,
            CoreErrorOrigin::Delivery,
            "subscription request must be greater than zero",
        ));

        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.origin, ErrorOrigin::Delivery);
    }

    #[test]
    fn response_errors_keep_their_kind() {
        let err = Error::from(ResponseError::TooManyRows);

        assert_eq!(err.kind, ErrorKind::TooManyRows);
        assert_eq!(err.origin, ErrorOrigin::Fetch);
        assert!(err.is_cardinality());
    }

    #[test]
    fn unsupported_maps_to_unsupported_operation() {
        let err = Error::from(InternalError::unsupported(
            CoreErrorOrigin::Source,
            "query does not produce multiple result sets",
        ));

        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
        assert!(!err.is_cardinality());
    }

    #[test]
    fn config_errors_come_from_config() {
        let err = Error::from(ConfigError::Invalid("worker_threads must be greater than zero"));

        assert_eq!(err.kind, ErrorKind::Internal);
        assert_eq!(err.origin, ErrorOrigin::Config);
    }

    #[test]
    fn error_round_trips_through_json() {
        let err = Error::new(ErrorKind::DataAccess, ErrorOrigin::Source, "connection reset");
        let json = serde_json::to_string(&err).expect("serialize");

        assert_eq!(serde_json::from_str::<Error>(&json).expect("deserialize"), err);
        assert_eq!(err.to_string(), "connection reset");
    }
}
