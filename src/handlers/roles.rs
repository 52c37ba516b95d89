use crate::api::ResourceApi;
use crate::app::AppContext;
use crate::database::models::Role;
use crate::routing::RouteSet;

pub fn routes(ctx: &AppContext) -> RouteSet {
    ResourceApi::<Role>::new(ctx.store.clone(), "/roles").routes("roles", ctx.guard())
}
