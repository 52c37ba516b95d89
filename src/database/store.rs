use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::entity::{EntityMeta, Preload, Relation};
use super::record::Record;

/// Errors from a persistence backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    /// Rejected before reaching storage (malformed column name and the like)
    #[error("{0}")]
    InvalidQuery(String),

    #[error("{0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Unexpected record format: {0}")]
    Decode(String),
}

/// Case-insensitive substring search over a set of storage columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub term: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub id: Option<Uuid>,
    pub search: Option<Search>,
}

impl Filter {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            search: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Filter,
    pub page: Option<Page>,
    pub preloads: Vec<Preload>,
}

impl Query {
    pub fn by_id(id: Uuid) -> Self {
        Self {
            filter: Filter::by_id(id),
            ..Self::default()
        }
    }

    pub fn with_preloads(mut self, preloads: Vec<Preload>) -> Self {
        self.preloads = preloads;
        self
    }
}

/// Generic persistence operations over storage-cased records.
///
/// Result lists are ordered by creation time, then identifier.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_one(&self, meta: &'static EntityMeta, query: &Query) -> Result<Option<Record>, StoreError>;

    async fn find_many(&self, meta: &'static EntityMeta, query: &Query) -> Result<Vec<Record>, StoreError>;

    async fn count(&self, meta: &'static EntityMeta, filter: &Filter) -> Result<i64, StoreError>;

    /// Insert a record, stamping `created_at` and `updated_at`
    async fn create(&self, meta: &'static EntityMeta, record: Record) -> Result<Record, StoreError>;

    /// Apply a partial field map and refresh `updated_at`
    async fn update(&self, meta: &'static EntityMeta, id: Uuid, fields: Record) -> Result<(), StoreError>;

    async fn delete(&self, meta: &'static EntityMeta, id: Uuid) -> Result<(), StoreError>;

    /// Upsert the child and insert the relation edge in one transaction
    async fn association_append(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        child: Record,
    ) -> Result<Record, StoreError>;

    async fn association_find(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        query: &Query,
    ) -> Result<Vec<Record>, StoreError>;

    async fn association_count(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        filter: &Filter,
    ) -> Result<i64, StoreError>;

    /// Remove the relation edge only; the child record is kept
    async fn association_delete(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        child_id: Uuid,
    ) -> Result<(), StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Join-table columns of a many-to-many relation
pub(crate) fn many_to_many(
    parent: &EntityMeta,
    relation: &Relation,
) -> Result<(&'static str, &'static str, &'static str), StoreError> {
    match relation.kind {
        super::entity::RelationKind::ManyToMany {
            join_table,
            parent_column,
            child_column,
        } => Ok((join_table, parent_column, child_column)),
        super::entity::RelationKind::BelongsTo { .. } => Err(StoreError::Query(format!(
            "relation {} on {} is not a many-to-many association",
            relation.name, parent.name
        ))),
    }
}
