use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use thiserror::Error as ThisError;

///
/// ResponseError
/// Row-count violations raised by `fetch_single`.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, ThisError)]
pub enum ResponseError {
    #[error("expected exactly one row, found 0")]
    TooFewRows,

    #[error("expected exactly one row, found more than one")]
    TooManyRows,
}

impl ResponseError {
    pub(crate) const fn class(self) -> ErrorClass {
        match self {
            Self::TooFewRows => ErrorClass::TooFewRows,
            Self::TooManyRows => ErrorClass::TooManyRows,
        }
    }
}

impl From<ResponseError> for InternalError {
    fn from(err: ResponseError) -> Self {
        Self::new(err.class(), ErrorOrigin::Fetch, err.to_string())
    }
}
