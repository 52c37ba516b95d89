use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use tracing::{debug, info};

use super::{AssignmentApi, Association};
use crate::api::parse_id;
use crate::database::{Entity, Filter, Query};
use crate::error::ApiError;
use crate::openapi::components::responses;
use crate::openapi::model::Operation;
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<P: Entity, C: Entity>(api: &AssignmentApi<P, C>, middleware: Vec<Middleware>) -> Route {
    let parent = P::meta();
    let child = C::meta();

    let path = format!(
        "{}/unassign-{}/{{{}}}/{{{}}}",
        api.base,
        child.slug,
        parent.path_param(),
        child.path_param()
    );

    Route::new(Method::Post, path, unassign::<P, C>, api.association.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("Unassign {}", child.name),
            description: format!(
                "This endpoint unassigns a {} from a {}",
                child.name.to_lowercase(),
                parent.name.to_lowercase()
            ),
            tags: vec![parent.plural.to_string()],
            parameters: vec![
                AssignmentApi::<P, C>::id_parameter::<P>(),
                AssignmentApi::<P, C>::id_parameter::<C>(),
            ],
            request_body: None,
            responses: responses(
                &format!("{} unassigned from {} successfully.", child.name, parent.name),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// POST {base}/unassign-{child}/{parentId}/{childId}
///
/// Removes the edge only. A child that exists but is not linked is a 400.
async fn unassign<P: Entity, C: Entity>(
    State(association): State<Association>,
    Path((parent_id, child_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let parent = P::meta();
    let child = C::meta();
    let parent_id = parse_id(&parent_id, parent)?;
    let child_id = parse_id(&child_id, child)?;
    let store = &association.store;

    store
        .find_one(parent, &Query::by_id(parent_id))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(parent.name))?;

    store
        .find_one(child, &Query::by_id(child_id))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(child.name))?;

    let linked = store
        .association_count(parent, parent_id, association.relation, &Filter::by_id(child_id))
        .await?;

    if linked == 0 {
        debug!(
            "{} {} is not linked to {} {}",
            child.name, child_id, parent.name, parent_id
        );
        return Err(ApiError::bad_request(format!(
            "The {} is not assigned to the {}.",
            child.name.to_lowercase(),
            parent.name.to_lowercase()
        )));
    }

    store
        .association_delete(parent, parent_id, association.relation, child_id)
        .await?;

    info!(
        "Unassigned {} {} from {} {}",
        child.name.to_lowercase(),
        child_id,
        parent.name.to_lowercase(),
        parent_id
    );

    Ok(StatusCode::OK)
}
