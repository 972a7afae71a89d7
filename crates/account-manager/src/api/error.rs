//! Translation of service errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::InvalidRequest(_)
            | Error::InvalidTransition { .. }
            | Error::InvalidCidr(_)
            | Error::InsufficientAddressSpace { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::ApiSecurityLocked { .. } => StatusCode::FORBIDDEN,
            Error::LockConflict { .. } => StatusCode::CONFLICT,
            Error::AlreadyClaimed(_)
            | Error::NoFreeSubnets
            | Error::Storage(_)
            | Error::Metadata(_)
            | Error::Provisioner(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
