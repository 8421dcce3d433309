use axum::{
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::storage::{Record, StorageError};

/// Marker rendered for a lookup that matched nothing.
pub const EMPTY_RESULT: &str = "Empty result";
/// Marker rendered in place of any internal failure.
pub const BAD_REQUEST: &str = "Bad request";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("cannot decode request body: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("request context is missing {0}")]
    MisconfiguredRequestContext(&'static str),
    #[error("{} identifier(s) failed to update", .0.len())]
    PartialUpdate(Vec<i64>),
    #[error("method {0} is not allowed here")]
    MethodNotAllowed(Method),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    pub fn decode(msg: impl ToString) -> Self {
        ApiError::Decode(msg.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::Decode(_)
            | ApiError::Storage(_)
            | ApiError::PartialUpdate(_) => StatusCode::BAD_REQUEST,
            ApiError::MisconfiguredRequestContext(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Validation(_) | ApiError::Decode(_) | ApiError::MethodNotAllowed(_) => {
                log::warn!("rejected request: {}", self);
            }
            ApiError::Storage(err) => log::error!("storage failure: {}", err),
            ApiError::MisconfiguredRequestContext(_) => log::error!("programmer error: {}", self),
            ApiError::PartialUpdate(ids) => log::warn!("update failed for {:?}", ids),
        }

        // Only the failed identifiers are ever echoed back.
        match self {
            ApiError::PartialUpdate(ids) => (status, Json(ids)).into_response(),
            _ => status.into_response(),
        }
    }
}

/// External form of a lookup result's error field.
pub fn record_marker(record: &Record) -> &'static str {
    match &record.error {
        Some(err) => {
            log::warn!("lookup failed: {}", err);
            BAD_REQUEST
        }
        None if record.is_not_found() => EMPTY_RESULT,
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Cause;
    use http_body_util::BodyExt;

    #[test]
    fn error_beats_sentinel() {
        assert_eq!(record_marker(&Record::failed("disk I/O error")), BAD_REQUEST);
        assert_eq!(record_marker(&Record::not_found()), EMPTY_RESULT);
        assert_eq!(record_marker(&Record::new(1, "dog")), "");
    }

    #[tokio::test]
    async fn storage_errors_do_not_leak_detail() {
        let err = ApiError::from(StorageError::Execution {
            index: 0,
            sql: "DELETE FROM document_type WHERE id IN (?)".into(),
            source: Cause::Cancelled,
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn partial_update_lists_failed_ids() {
        let response = ApiError::PartialUpdate(vec![2, 7]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let ids: Vec<i64> = serde_json::from_slice(&body).unwrap();
        assert_eq!(ids, vec![2, 7]);
    }

    #[test]
    fn status_table() {
        assert_eq!(
            ApiError::MisconfiguredRequestContext("request id").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::MethodNotAllowed(Method::OPTIONS).status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(ApiError::validation("x").status_code(), StatusCode::BAD_REQUEST);
    }
}
