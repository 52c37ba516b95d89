use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use super::ResourceApi;
use crate::api::parse_id;
use crate::database::{Entity, Query, Store};
use crate::error::ApiError;
use crate::openapi::components::responses;
use crate::openapi::model::{Operation, RefOr};
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<E: Entity>(api: &ResourceApi<E>, middleware: Vec<Middleware>) -> Route {
    let meta = E::meta();

    Route::new(Method::Delete, api.item_path(), delete::<E>, api.store.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("Delete {}", meta.name),
            description: format!(
                "This endpoint deletes an existing {} by their id.",
                meta.name.to_lowercase()
            ),
            tags: vec![meta.plural.to_string()],
            parameters: vec![RefOr::parameter("Id")],
            request_body: None,
            responses: responses(
                &format!("{} deleted successfully.", meta.name),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// DELETE {base}/{id}
async fn delete<E: Entity>(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let meta = E::meta();
    let id = parse_id(&id, meta)?;

    store
        .find_one(meta, &Query::by_id(id))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(meta.name))?;

    store.delete(meta, id).await?;
    info!("Deleted {} {}", meta.name.to_lowercase(), id);

    Ok(StatusCode::OK)
}
