use axum::{body::Bytes, extract::State, Json};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::ResourceApi;
use crate::api::{parse_body, Item};
use crate::database::{Entity, Store};
use crate::error::ApiError;
use crate::openapi::components::{create_payload_name, responses};
use crate::openapi::model::{Operation, RefOr};
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<E: Entity>(api: &ResourceApi<E>, middleware: Vec<Middleware>) -> Route {
    let meta = E::meta();

    Route::new(Method::Post, api.base.clone(), create::<E>, api.store.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("Create {}", meta.name),
            description: format!("This endpoint creates a new {}.", meta.name.to_lowercase()),
            tags: vec![meta.plural.to_string()],
            parameters: Vec::new(),
            request_body: Some(RefOr::request_body(&create_payload_name(meta))),
            responses: responses(
                &format!("{} created successfully.", meta.name),
                &[400, 401, 403, 500],
            ),
        })
}

/// POST {base}
///
/// Any identifier in the body is replaced with a fresh one before the
/// record is stored.
async fn create<E: Entity>(
    State(store): State<Arc<dyn Store>>,
    body: Bytes,
) -> Result<Json<Item<Value>>, ApiError> {
    let meta = E::meta();

    let mut entity: E = parse_body(&body)?;
    entity.set_id(Uuid::new_v4());

    let record = store.create(meta, entity.to_record()?).await?;
    info!("Created {} {}", meta.name.to_lowercase(), entity.id());

    Ok(Json(Item::new(Value::Object(meta.wire_record(record)))))
}
