use axum::{
    extract::{RawQuery, State},
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use super::ResourceApi;
use crate::api::{Items, ListQuery, Pagination};
use crate::database::{Entity, Filter, Query, Store};
use crate::error::ApiError;
use crate::openapi::components::{list_parameters, responses};
use crate::openapi::model::Operation;
use crate::routing::{Method, Middleware, Route};

pub(super) fn route<E: Entity>(api: &ResourceApi<E>, middleware: Vec<Middleware>) -> Route {
    let meta = E::meta();

    Route::new(Method::Get, api.base.clone(), list::<E>, api.store.clone())
        .with_middleware(middleware)
        .with_doc(Operation {
            summary: format!("Get {}", meta.plural),
            description: format!("This endpoint retrieves all {}.", meta.plural.to_lowercase()),
            tags: vec![meta.plural.to_string()],
            parameters: list_parameters(),
            request_body: None,
            responses: responses(
                &format!("{} retrieved successfully.", meta.plural),
                &[400, 401, 403, 404, 500],
            ),
        })
}

/// GET {base}
async fn list<E: Entity>(
    State(store): State<Arc<dyn Store>>,
    RawQuery(raw): RawQuery,
) -> Result<Json<Items<Value>>, ApiError> {
    let meta = E::meta();
    let params = ListQuery::parse(raw.as_deref())?;
    let preloads = meta.preloads(&params.preload)?;

    let filter = Filter {
        id: None,
        search: params.search(meta),
    };

    let count = store.count(meta, &filter).await?;
    let pagination = Pagination::new(count, params.page, params.page_size);

    let query = Query {
        filter,
        page: (!params.disable_pagination).then(|| pagination.window()),
        preloads,
    };

    let items = store
        .find_many(meta, &query)
        .await?
        .into_iter()
        .map(|record| Value::Object(meta.wire_record(record)))
        .collect();

    Ok(Json(Items { items, pagination }))
}
