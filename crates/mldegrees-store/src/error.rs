// SPDX-License-Identifier: Apache-2.0

use mldegrees_model::ParseError;
use std::fmt::{Display, Formatter};

/// Classified persistence failure. The variants carry the distinction the
/// HTTP surface needs: caller problems (`Invalid`), permission problems
/// (`Forbidden`), state-machine problems (`Conflict`), missing rows
/// (`NotFound`), transient store pressure (`Busy`), everything else
/// (`Backend`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    NotFound(&'static str),
    Forbidden(&'static str),
    Conflict(&'static str),
    Invalid(String),
    Busy(String),
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "{what} not found"),
            Self::Forbidden(msg) => f.write_str(msg),
            Self::Conflict(msg) => f.write_str(msg),
            Self::Invalid(msg) => f.write_str(msg),
            Self::Busy(msg) => write!(f, "store busy: {msg}"),
            Self::Backend(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _)
                if matches!(
                    inner.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                Self::Busy(err.to_string())
            }
            rusqlite::Error::SqliteFailure(inner, _)
                if inner.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Conflict("row conflicts with an existing record")
            }
            _ => Self::Backend(err.to_string()),
        }
    }
}

impl From<ParseError> for StoreError {
    fn from(err: ParseError) -> Self {
        Self::Invalid(err.to_string())
    }
}

const _: fn() = || {
    fn assert_traits<T: Send + Sync + Clone + std::fmt::Debug>() {}
    assert_traits::<StoreError>();
};
