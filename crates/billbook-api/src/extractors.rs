//! # Extraction Helpers
//!
//! Handlers take `Result<Extractor<T>, Rejection>` and pass it through one
//! of these helpers so malformed input produces the same JSON error body
//! as every other failure, instead of axum's plain-text rejection.
//!
//! ```ignore
//! async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
//!     let req = extract_json(body)?;
//!     // use req...
//! }
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::Json;

use crate::error::AppError;

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract query parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract path parameters, mapping parse errors to [`AppError::BadRequest`].
pub fn extract_path<T>(result: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    result
        .map(|Path(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}
