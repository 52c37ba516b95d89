use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::ResourceApi;
use crate::api::{parse_id, Item, PreloadQuery};
use crate::database::{Entity, Query, Store};
use crate::error::ApiError;
use crate::openapi::components::responses;
use crate::openapi::model::{Operation, RefOr};
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<E: Entity>(api: &ResourceApi<E>, middleware: Vec<Middleware>) -> Route {
    let meta = E::meta();

    Route::new(Method::Get, api.item_path(), get_one::<E>, api.store.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("Get {}", meta.name),
            description: format!(
                "This endpoint retrieves an existing {} by their id.",
                meta.name.to_lowercase()
            ),
            tags: vec![meta.plural.to_string()],
            parameters: vec![RefOr::parameter("Id"), RefOr::parameter("Preload")],
            request_body: None,
            responses: responses(
                &format!("{} retrieved successfully.", meta.name),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// GET {base}/{id}
async fn get_one<E: Entity>(
    State(store): State<Arc<dyn Store>>,
    Path(id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Item<Value>>, ApiError> {
    let meta = E::meta();
    let id = parse_id(&id, meta)?;
    let params = PreloadQuery::parse(raw.as_deref());

    let query = Query::by_id(id).with_preloads(meta.preloads(&params.preload)?);
    let record = store
        .find_one(meta, &query)
        .await?
        .ok_or_else(|| ApiError::entity_not_found(meta.name))?;

    Ok(Json(Item::new(Value::Object(meta.wire_record(record)))))
}
