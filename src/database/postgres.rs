use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::entity::{EntityMeta, Preload, Relation, RelationKind};
use super::query_builder::{self as sql, bind_param, SelectBuilder, SqlResult};
use super::record::{record_id, stamp_created, Record};
use super::store::{many_to_many, Filter, Page, Query, Store, StoreError};

/// PostgreSQL-backed store. Rows travel as JSON objects in storage casing.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_rows(&self, sql: &SqlResult) -> Result<Vec<PgRow>, StoreError> {
        debug!("SQL: {}", sql.query);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn fetch_records(&self, sql: &SqlResult) -> Result<Vec<Record>, StoreError> {
        self.fetch_rows(sql).await?.iter().map(row_record).collect()
    }

    async fn fetch_count(&self, sql: &SqlResult) -> Result<i64, StoreError> {
        debug!("SQL: {}", sql.query);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("count")?)
    }

    async fn execute(&self, sql: &SqlResult) -> Result<u64, StoreError> {
        debug!("SQL: {}", sql.query);
        let mut q = sqlx::query(&sql.query);
        for p in sql.params.iter() {
            q = bind_param(q, p);
        }
        Ok(q.execute(&self.pool).await?.rows_affected())
    }

    /// Load each preload level with one query and attach it under the relation key
    fn attach<'a>(
        &'a self,
        records: &'a mut [Record],
        preloads: &'a [Preload],
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            if records.is_empty() {
                return Ok(());
            }

            for preload in preloads {
                let relation = preload.relation;
                let target = relation.target_meta();

                match relation.kind {
                    RelationKind::ManyToMany {
                        join_table,
                        parent_column,
                        child_column,
                    } => {
                        let parent_ids: Vec<Uuid> = records.iter().filter_map(record_id).collect();
                        let query = sql::children_sql(target, join_table, parent_column, child_column, parent_ids);

                        let mut parents = Vec::new();
                        let mut children = Vec::new();
                        for row in self.fetch_rows(&query).await? {
                            parents.push(row.try_get::<Uuid, _>("parent_id")?);
                            children.push(row_record(&row)?);
                        }
                        self.attach(&mut children, &preload.nested).await?;

                        let mut grouped: HashMap<Uuid, Vec<Value>> = HashMap::new();
                        for (parent, child) in parents.into_iter().zip(children) {
                            grouped.entry(parent).or_default().push(Value::Object(child));
                        }

                        for record in records.iter_mut() {
                            let items = record_id(record)
                                .and_then(|id| grouped.get(&id).cloned())
                                .unwrap_or_default();
                            record.insert(relation.key.to_string(), Value::Array(items));
                        }
                    }
                    RelationKind::BelongsTo { foreign_key } => {
                        let ids: Vec<Uuid> = records
                            .iter()
                            .filter_map(|r| r.get(foreign_key)?.as_str()?.parse().ok())
                            .collect();

                        let mut targets = self.fetch_records(&sql::rows_by_ids_sql(target, ids)).await?;
                        self.attach(&mut targets, &preload.nested).await?;

                        let by_id: HashMap<Uuid, Record> = targets
                            .into_iter()
                            .filter_map(|t| record_id(&t).map(|id| (id, t)))
                            .collect();

                        for record in records.iter_mut() {
                            let value = record
                                .get(foreign_key)
                                .and_then(Value::as_str)
                                .and_then(|s| s.parse::<Uuid>().ok())
                                .and_then(|id| by_id.get(&id).cloned())
                                .map(Value::Object)
                                .unwrap_or(Value::Null);
                            record.insert(relation.key.to_string(), value);
                        }
                    }
                }
            }

            Ok(())
        }
        .boxed()
    }
}

fn row_record(row: &PgRow) -> Result<Record, StoreError> {
    match row.try_get::<Value, _>("row")? {
        Value::Object(record) => Ok(record),
        other => Err(StoreError::Decode(other.to_string())),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_one(&self, meta: &'static EntityMeta, query: &Query) -> Result<Option<Record>, StoreError> {
        let select = SelectBuilder::new(meta)
            .filter(&query.filter)?
            .page(Some(Page { limit: 1, offset: 0 }));

        let mut records = self.fetch_records(&select.to_select_sql()).await?;
        records.truncate(1);
        self.attach(&mut records, &query.preloads).await?;
        Ok(records.pop())
    }

    async fn find_many(&self, meta: &'static EntityMeta, query: &Query) -> Result<Vec<Record>, StoreError> {
        let select = SelectBuilder::new(meta).filter(&query.filter)?.page(query.page);

        let mut records = self.fetch_records(&select.to_select_sql()).await?;
        self.attach(&mut records, &query.preloads).await?;
        Ok(records)
    }

    async fn count(&self, meta: &'static EntityMeta, filter: &Filter) -> Result<i64, StoreError> {
        let select = SelectBuilder::new(meta).filter(filter)?;
        self.fetch_count(&select.to_count_sql()).await
    }

    async fn create(&self, meta: &'static EntityMeta, mut record: Record) -> Result<Record, StoreError> {
        stamp_created(&mut record, chrono::Utc::now());

        self.fetch_records(&sql::insert_sql(meta, record))
            .await?
            .pop()
            .ok_or_else(|| StoreError::Query(format!("insert into {} returned no row", meta.table)))
    }

    async fn update(&self, meta: &'static EntityMeta, id: Uuid, fields: Record) -> Result<(), StoreError> {
        let affected = self.execute(&sql::update_sql(meta, id, fields)?).await?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("{} {} not found", meta.name, id)));
        }
        Ok(())
    }

    async fn delete(&self, meta: &'static EntityMeta, id: Uuid) -> Result<(), StoreError> {
        self.execute(&sql::delete_sql(meta, id)).await?;
        Ok(())
    }

    async fn association_append(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        mut child: Record,
    ) -> Result<Record, StoreError> {
        let (join_table, parent_column, child_column) = many_to_many(parent, relation)?;
        let target = relation.target_meta();
        let child_id = record_id(&child)
            .ok_or_else(|| StoreError::Query(format!("{} record has no identifier", target.name)))?;
        stamp_created(&mut child, chrono::Utc::now());

        let upsert = sql::upsert_sql(target, child);
        let link = sql::link_sql(join_table, parent_column, child_column, parent_id, child_id);

        let mut tx = self.pool.begin().await?;

        debug!("SQL: {}", upsert.query);
        let mut q = sqlx::query(&upsert.query);
        for p in upsert.params.iter() {
            q = bind_param(q, p);
        }
        let row = q.fetch_one(&mut *tx).await?;
        let stored = row_record(&row)?;

        debug!("SQL: {}", link.query);
        let mut q = sqlx::query(&link.query);
        for p in link.params.iter() {
            q = bind_param(q, p);
        }
        q.execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(stored)
    }

    async fn association_find(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        query: &Query,
    ) -> Result<Vec<Record>, StoreError> {
        let (join_table, parent_column, child_column) = many_to_many(parent, relation)?;
        let select = SelectBuilder::new(relation.target_meta())
            .through(join_table, parent_column, child_column, parent_id)
            .filter(&query.filter)?
            .page(query.page);

        let mut records = self.fetch_records(&select.to_select_sql()).await?;
        self.attach(&mut records, &query.preloads).await?;
        Ok(records)
    }

    async fn association_count(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        filter: &Filter,
    ) -> Result<i64, StoreError> {
        let (join_table, parent_column, child_column) = many_to_many(parent, relation)?;
        let select = SelectBuilder::new(relation.target_meta())
            .through(join_table, parent_column, child_column, parent_id)
            .filter(filter)?;
        self.fetch_count(&select.to_count_sql()).await
    }

    async fn association_delete(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        child_id: Uuid,
    ) -> Result<(), StoreError> {
        let (join_table, parent_column, child_column) = many_to_many(parent, relation)?;
        self.execute(&sql::unlink_sql(join_table, parent_column, child_column, parent_id, child_id))
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
