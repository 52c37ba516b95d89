use axum::{
    extract::{Path, RawQuery, State},
    Json,
};
use serde_json::Value;

use super::{AssignmentApi, Association};
use crate::api::{parse_id, Items, ListQuery, Pagination};
use crate::database::{Entity, Filter, Query};
use crate::error::ApiError;
use crate::openapi::components::{list_parameters, responses};
use crate::openapi::model::Operation;
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<P: Entity, C: Entity>(api: &AssignmentApi<P, C>, middleware: Vec<Middleware>) -> Route {
    let parent = P::meta();
    let child = C::meta();

    let path = format!(
        "{}/{{{}}}/list-{}",
        api.base,
        parent.path_param(),
        child.plural_slug
    );

    let mut parameters = vec![AssignmentApi::<P, C>::id_parameter::<P>()];
    parameters.extend(list_parameters());

    Route::new(Method::Get, path, list::<P, C>, api.association.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("List {}", child.plural),
            description: format!(
                "This endpoint retrieves a list of {} assigned to a {}",
                child.plural.to_lowercase(),
                parent.name.to_lowercase()
            ),
            tags: vec![parent.plural.to_string()],
            parameters,
            request_body: None,
            responses: responses(
                &format!("{} {} retrieved successfully.", parent.name, child.plural),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// GET {base}/{parentId}/list-{children}
///
/// Search and paging apply to the parent's related rows only; `count` is the
/// filtered membership size.
async fn list<P: Entity, C: Entity>(
    State(association): State<Association>,
    Path(parent_id): Path<String>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Items<Value>>, ApiError> {
    let parent = P::meta();
    let child = C::meta();
    let parent_id = parse_id(&parent_id, parent)?;
    let params = ListQuery::parse(raw.as_deref())?;
    let preloads = child.preloads(&params.preload)?;
    let store = &association.store;

    store
        .find_one(parent, &Query::by_id(parent_id))
        .await?
        .ok_or_else(|| ApiError::entity_not_found(parent.name))?;

    let filter = Filter {
        id: None,
        search: params.search(child),
    };

    let count = store
        .association_count(parent, parent_id, association.relation, &filter)
        .await?;
    let pagination = Pagination::new(count, params.page, params.page_size);

    let query = Query {
        filter,
        page: (!params.disable_pagination).then(|| pagination.window()),
        preloads,
    };

    let items = store
        .association_find(parent, parent_id, association.relation, &query)
        .await?
        .into_iter()
        .map(|record| Value::Object(child.wire_record(record)))
        .collect();

    Ok(Json(Items { items, pagination }))
}
