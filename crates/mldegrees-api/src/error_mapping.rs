// SPDX-License-Identifier: Apache-2.0

use crate::errors::{ApiError, ApiErrorCode};

/// HTTP status for an error envelope. Unmapped codes fall back to 500.
#[must_use]
pub fn map_error(error: &ApiError) -> u16 {
    match error.code {
        ApiErrorCode::Unauthorized => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::ValidationFailed => 400,
        ApiErrorCode::Conflict => 409,
        ApiErrorCode::NotFound => 404,
        ApiErrorCode::ServiceUnavailable => 503,
        _ => 500,
    }
}
