// Generic controllers: one implementation serving every entity type.
//
// ResourceApi<E>       list / get-one / create / update / delete
// AssignmentApi<P, C>  assign / assign-with-payload / unassign / list
//
// Each operation returns a Route carrying its handler and its documentation.

pub mod assignment;
pub mod pagination;
pub mod query;
pub mod resource;
pub mod response;

pub use assignment::AssignmentApi;
pub use pagination::Pagination;
pub use query::{ListQuery, PreloadQuery};
pub use resource::ResourceApi;
pub use response::{Item, Items};

use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::database::EntityMeta;
use crate::error::ApiError;

pub const INVALID_BODY: &str = "Invalid request body.";

/// Decode a JSON request body; any failure is a 400
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Rejected request body: {}", e);
        ApiError::bad_request(INVALID_BODY)
    })
}

/// Parse an identifier taken from the path
pub(crate) fn parse_id(raw: &str, meta: &EntityMeta) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::bad_request(format!(
            "'{}' is not a valid {} id.",
            raw,
            meta.name.to_lowercase()
        ))
    })
}
