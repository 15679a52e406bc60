// SPDX-License-Identifier: Apache-2.0

use mldegrees_store::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Stable machine-readable failure classes. Clients branch on `code`; the
/// `message` is for humans and may change wording between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ApiErrorCode {
    Unauthorized,
    Forbidden,
    ValidationFailed,
    Conflict,
    NotFound,
    ServiceUnavailable,
    Internal,
}

/// The one error body this API ever sends. Constructors stamp the
/// placeholder request id; the handler layer replaces it with the real one
/// via [`ApiError::with_request_id`] before the response leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
    pub request_id: String,
}

impl ApiError {
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            request_id: "req-unknown".to_string(),
        }
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(ApiErrorCode::Unauthorized, "Unauthorized", json!({}))
    }

    #[must_use]
    pub fn admin_required() -> Self {
        Self::new(
            ApiErrorCode::Forbidden,
            "Forbidden: Admin access required",
            json!({}),
        )
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message, json!({}))
    }

    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self::new(
            ApiErrorCode::ValidationFailed,
            format!("invalid query parameter: {name}"),
            json!({"parameter": name, "value": value}),
        )
    }

    #[must_use]
    pub fn invalid_body(reason: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationFailed, reason, json!({}))
    }

    #[must_use]
    pub fn not_found(what: &str) -> Self {
        Self::new(
            ApiErrorCode::NotFound,
            format!("{what} not found"),
            json!({"resource": what}),
        )
    }

    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Conflict, message, json!({}))
    }

    #[must_use]
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ServiceUnavailable, message, json!({}))
    }

    #[must_use]
    pub fn internal() -> Self {
        Self::new(ApiErrorCode::Internal, "internal error", json!({}))
    }
}

/// Store failures carry their classification; the wire keeps it. Backend
/// details never cross the boundary, only the class does.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::not_found(what),
            StoreError::Forbidden(msg) => Self::forbidden(msg),
            StoreError::Conflict(msg) => Self::conflict(msg),
            StoreError::Invalid(msg) => Self::invalid_body(msg),
            StoreError::Busy(_) => Self::service_unavailable("store busy, retry shortly"),
            _ => Self::internal(),
        }
    }
}

const _: fn() = || {
    fn assert_traits<T: Serialize + for<'de> Deserialize<'de> + Send + Sync>() {}
    assert_traits::<ApiError>();
    assert_traits::<ApiErrorCode>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(ApiErrorCode::ValidationFailed).expect("serialize"),
            serde_json::json!("validation_failed")
        );
        assert_eq!(
            serde_json::to_value(ApiErrorCode::ServiceUnavailable).expect("serialize"),
            serde_json::json!("service_unavailable")
        );
    }

    #[test]
    fn request_id_is_stamped_last() {
        let err = ApiError::not_found("program").with_request_id("req-00000000000000aa");
        assert_eq!(err.request_id, "req-00000000000000aa");
        assert_eq!(err.message, "program not found");
        let wire = serde_json::to_value(&err).expect("serialize");
        assert_eq!(wire["code"], "not_found");
        assert_eq!(wire["details"]["resource"], "program");
    }

    #[test]
    fn store_classification_survives_conversion() {
        let err = ApiError::from(StoreError::Conflict("proposal already reviewed"));
        assert_eq!(err.code, ApiErrorCode::Conflict);
        assert_eq!(err.message, "proposal already reviewed");

        let err = ApiError::from(StoreError::Backend("sqlite exploded".to_string()));
        assert_eq!(err.code, ApiErrorCode::Internal);
        assert!(!err.message.contains("sqlite"), "backend text must not leak");

        let err = ApiError::from(StoreError::Busy("locked".to_string()));
        assert_eq!(err.code, ApiErrorCode::ServiceUnavailable);
    }
}
