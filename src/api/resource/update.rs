use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::ResourceApi;
use crate::api::{parse_body, parse_id, Item};
use crate::database::{Entity, Query, Store};
use crate::error::ApiError;
use crate::openapi::components::{responses, update_payload_name};
use crate::openapi::model::{Operation, RefOr};
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<E: Entity>(api: &ResourceApi<E>, middleware: Vec<Middleware>) -> Route {
    let meta = E::meta();

    Route::new(Method::Put, api.item_path(), update::<E>, api.store.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("Update {}", meta.name),
            description: format!(
                "This endpoint updates an existing {} by their id.",
                meta.name.to_lowercase()
            ),
            tags: vec![meta.plural.to_string()],
            parameters: vec![RefOr::parameter("Id")],
            request_body: Some(RefOr::request_body(&update_payload_name(meta))),
            responses: responses(
                &format!("{} updated successfully.", meta.name),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// PUT {base}/{id}
///
/// Partial update from an arbitrary field map. The response echoes the map
/// as sent, not the stored record.
async fn update<E: Entity>(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Item<Value>>, ApiError> {
    let meta = E::meta();
    let id = parse_id(&id, meta)?;
    let fields: Map<String, Value> = parse_body(&body)?;

    store
        .find_one(meta, &Query::by_id(id))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(meta.name))?;

    store.update(meta, id, meta.storage_fields(&fields)?).await?;

    Ok(Json(Item::new(Value::Object(fields))))
}
