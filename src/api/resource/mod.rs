use std::marker::PhantomData;
use std::sync::Arc;

use crate::database::{Entity, Store};
use crate::routing::{Middleware, Route, RouteSet};

mod create;
mod delete;
mod get_one;
mod list;
mod update;

/// CRUD routes for one entity type under `base` (e.g. `/roles`)
pub struct ResourceApi<E: Entity> {
    store: Arc<dyn Store>,
    base: String,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for ResourceApi<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            base: self.base.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> ResourceApi<E> {
    pub fn new(store: Arc<dyn Store>, base: impl Into<String>) -> Self {
        Self {
            store,
            base: base.into(),
            _entity: PhantomData,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn item_path(&self) -> String {
        format!("{}/{{id}}", self.base)
    }

    /// All five routes, each guarded by `guard(<permission>)`, where the
    /// permission is `<prefix>.list|view|create|update|delete`
    pub fn routes<F>(&self, prefix: &str, guard: F) -> RouteSet
    where
        F: Fn(String) -> Vec<Middleware>,
    {
        let permission = |action: &str| guard(format!("{}.{}", prefix, action));

        [
            self.list(permission("list")),
            self.get_one(permission("view")),
            self.create(permission("create")),
            self.update(permission("update")),
            self.delete(permission("delete")),
        ]
        .into_iter()
        .collect::<RouteSet>()
    }

    pub fn list(&self, middleware: Vec<Middleware>) -> Route {
        list::route::<E>(self, middleware)
    }

    pub fn get_one(&self, middleware: Vec<Middleware>) -> Route {
        get_one::route::<E>(self, middleware)
    }

    pub fn create(&self, middleware: Vec<Middleware>) -> Route {
        create::route::<E>(self, middleware)
    }

    pub fn update(&self, middleware: Vec<Middleware>) -> Route {
        update::route::<E>(self, middleware)
    }

    pub fn delete(&self, middleware: Vec<Middleware>) -> Route {
        delete::route::<E>(self, middleware)
    }
}
