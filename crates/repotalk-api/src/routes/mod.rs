pub mod crawl;
pub mod preflight;
pub mod query;

use crate::error::{ApiError, ApiResult};
use serde::de::DeserializeOwned;

/// Decode a JSON body regardless of `Content-Type`
pub(crate) fn decode_json<T: DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected request body");
        ApiError::bad_request("Invalid JSON payload")
    })
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
