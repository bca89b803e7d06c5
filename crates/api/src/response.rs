//! Shared response envelope types for API handlers.
//!
//! Every success body is `{ "data": ... }`. Listings add a `metadata`
//! object with the paging figures.

use forum_core::filters::Metadata;
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// ```ignore
/// Ok(Json(DataResponse { data: forum }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// `{ "data": [...], "metadata": {...} }` envelope for listings.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub metadata: Metadata,
}

/// `{ "data": { "message": ... } }` body for operations with nothing else to
/// return.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: &'static str,
}

impl DataResponse<MessageBody> {
    pub fn message(message: &'static str) -> Self {
        DataResponse {
            data: MessageBody { message },
        }
    }
}
