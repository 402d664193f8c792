use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Public callers should go through the facade `Error` instead.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct a data-access failure raised at the source boundary.
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::DataAccess, ErrorOrigin::Source, message)
    }

    /// Construct an "operation not supported by this result shape" error.
    pub fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, origin, message)
    }

    /// Construct a value/row conversion error.
    pub fn conversion(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Conversion, origin, message)
    }

    /// Construct a field-resolution failure against a row schema.
    pub fn unknown_field(field: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorClass::UnknownField,
            ErrorOrigin::Index,
            format!("field not contained in row schema: {field}"),
        )
    }

    /// Construct a cursor-origin invariant violation.
    pub(crate) fn cursor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Cursor,
            message.into(),
        )
    }

    /// Construct an index-origin invariant violation.
    pub(crate) fn index_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Index,
            message.into(),
        )
    }

    /// Construct a delivery-origin internal error.
    pub(crate) fn delivery_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Delivery, message.into())
    }

    #[must_use]
    pub const fn is_data_access(&self) -> bool {
        matches!(self.class, ErrorClass::DataAccess)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    DataAccess,
    TooFewRows,
    TooManyRows,
    Unsupported,
    Conversion,
    UnknownField,
    InvariantViolation,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::DataAccess => "data_access",
            Self::TooFewRows => "too_few_rows",
            Self::TooManyRows => "too_many_rows",
            Self::Unsupported => "unsupported",
            Self::Conversion => "conversion",
            Self::UnknownField => "unknown_field",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Which layer raised the error.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    Source,
    Cursor,
    Fetch,
    Index,
    Mapper,
    Delivery,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Source => "source",
            Self::Cursor => "cursor",
            Self::Fetch => "fetch",
            Self::Index => "index",
            Self::Mapper => "mapper",
            Self::Delivery => "delivery",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = InternalError::data_access("connection reset");

        assert_eq!(
            err.display_with_class(),
            "source:data_access: connection reset"
        );
        assert!(err.is_data_access());
    }

    #[test]
    fn unsupported_keeps_caller_origin() {
        let err = InternalError::unsupported(ErrorOrigin::Fetch, "no further result sets");

        assert_eq!(err.class, ErrorClass::Unsupported);
        assert_eq!(err.origin, ErrorOrigin::Fetch);
        assert_eq!(err.to_string(), "no further result sets");
    }
}
