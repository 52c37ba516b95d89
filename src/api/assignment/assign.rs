use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{AssignmentApi, Association};
use crate::api::{parse_body, parse_id, Item};
use crate::database::{Entity, Query};
use crate::error::ApiError;
use crate::openapi::components::responses;
use crate::openapi::model::{json_content, Operation, RefOr, RequestBody};
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<P: Entity, C: Entity>(
    api: &AssignmentApi<P, C>,
    request_body: Option<&str>,
    middleware: Vec<Middleware>,
) -> Route {
    let parent = P::meta();
    let child = C::meta();

    let path = format!(
        "{}/assign-{}/{{{}}}",
        api.base,
        child.slug,
        parent.path_param()
    );

    let (summary, description, body) = match request_body {
        Some(name) => (
            format!("Assign {} With Payload", child.name),
            format!(
                "This endpoint assigns a {} to a {} with the {} payload.",
                child.name.to_lowercase(),
                parent.name.to_lowercase(),
                child.name.to_lowercase()
            ),
            RefOr::request_body(name),
        ),
        None => (
            format!("Assign {}", child.name),
            format!(
                "This endpoint assigns a {} to a {}.",
                child.name.to_lowercase(),
                parent.name.to_lowercase()
            ),
            RefOr::Item(RequestBody {
                description: format!("The {} to assign.", child.name.to_lowercase()),
                required: true,
                content: json_content(RefOr::schema(child.name)),
            }),
        ),
    };

    Route::new(Method::Post, path, assign::<P, C>, api.association.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary,
            description,
            tags: vec![parent.plural.to_string()],
            parameters: vec![AssignmentApi::<P, C>::id_parameter::<P>()],
            request_body: Some(body),
            responses: responses(
                &format!("{} assigned to {} successfully.", child.name, parent.name),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// POST {base}/assign-{child}/{parentId}
///
/// The body is a full child record. It is inserted, or updated when its id
/// already exists, and linked to the parent in one transaction.
async fn assign<P: Entity, C: Entity>(
    State(association): State<Association>,
    Path(parent_id): Path<String>,
    body: Bytes,
) -> Result<Json<Item<Value>>, ApiError> {
    let parent = P::meta();
    let child = C::meta();
    let parent_id = parse_id(&parent_id, parent)?;

    association
        .store
        .find_one(parent, &Query::by_id(parent_id))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(parent.name))?;

    let mut entity: C = parse_body(&body)?;
    if entity.id().is_nil() {
        entity.set_id(Uuid::new_v4());
    }

    let stored = association
        .store
        .association_append(parent, parent_id, association.relation, entity.to_record()?)
        .await?;

    info!(
        "Assigned {} {} to {} {}",
        child.name.to_lowercase(),
        entity.id(),
        parent.name.to_lowercase(),
        parent_id
    );

    Ok(Json(Item::new(Value::Object(child.wire_record(stored)))))
}
