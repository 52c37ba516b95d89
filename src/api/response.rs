use serde::Serialize;

use super::pagination::Pagination;

/// `{ "item": ... }`
#[derive(Debug, Serialize)]
pub struct Item<T> {
    pub item: T,
}

impl<T> Item<T> {
    pub fn new(item: T) -> Self {
        Self { item }
    }
}

/// `{ "items": [...], "pagination": {...} }`
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
