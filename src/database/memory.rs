use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::entity::{EntityMeta, Field, FieldKind, Preload, Relation, RelationKind};
use super::record::{record_id, search_text, stamp_created, stamp_updated, Record};
use super::store::{many_to_many, Filter, Query, Store, StoreError};

/// One join-table row: column -> identifier
type Edge = BTreeMap<&'static str, Uuid>;

#[derive(Default)]
struct Tables {
    rows: HashMap<&'static str, Vec<Record>>,
    edges: HashMap<&'static str, Vec<Edge>>,
    /// Every entity type written so far, for foreign-key checks on delete
    metas: HashMap<&'static str, &'static EntityMeta>,
}

/// In-process store with the same observable semantics as the PostgreSQL one
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tables {
    fn table(&self, meta: &EntityMeta) -> &[Record] {
        self.rows.get(meta.table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn register(&mut self, meta: &'static EntityMeta) {
        self.metas.entry(meta.table).or_insert(meta);
    }

    /// First belongs-to reference to `meta`'s row `id`, as (referencing table, foreign key)
    fn referenced_by(&self, meta: &'static EntityMeta, id: Uuid) -> Option<(&'static str, &'static str)> {
        let id = id.to_string();
        self.metas.values().find_map(|other| {
            other.relations.iter().find_map(|relation| match relation.kind {
                RelationKind::BelongsTo { foreign_key } if std::ptr::eq(relation.target_meta(), meta) => self
                    .table(other)
                    .iter()
                    .any(|r| r.get(foreign_key).and_then(Value::as_str) == Some(id.as_str()))
                    .then_some((other.table, foreign_key)),
                _ => None,
            })
        })
    }

    fn find_index(&self, meta: &EntityMeta, id: Uuid) -> Option<usize> {
        self.table(meta).iter().position(|r| record_id(r) == Some(id))
    }

    fn linked_ids(&self, join_table: &str, parent_column: &str, child_column: &str, parent_id: Uuid) -> Vec<Uuid> {
        self.edges
            .get(join_table)
            .map(|edges| {
                edges
                    .iter()
                    .filter(|e| e.get(parent_column) == Some(&parent_id))
                    .filter_map(|e| e.get(child_column).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rows of `meta` matching `filter`, optionally limited to `scope` ids, in storage order
    fn select(&self, meta: &EntityMeta, filter: &Filter, scope: Option<&[Uuid]>) -> Result<Vec<Record>, StoreError> {
        let mut out = Vec::new();
        for record in self.table(meta) {
            if let Some(scope) = scope {
                match record_id(record) {
                    Some(id) if scope.contains(&id) => {}
                    _ => continue,
                }
            }
            if matches(meta, record, filter)? {
                out.push(record.clone());
            }
        }
        Ok(out)
    }

    fn attach(&self, records: &mut [Record], preloads: &[Preload]) {
        for preload in preloads {
            let relation = preload.relation;
            let target = relation.target_meta();

            for record in records.iter_mut() {
                let value = match relation.kind {
                    RelationKind::ManyToMany {
                        join_table,
                        parent_column,
                        child_column,
                    } => {
                        let ids = record_id(record)
                            .map(|id| self.linked_ids(join_table, parent_column, child_column, id))
                            .unwrap_or_default();
                        let mut children: Vec<Record> = self
                            .table(target)
                            .iter()
                            .filter(|r| record_id(r).map(|id| ids.contains(&id)).unwrap_or(false))
                            .cloned()
                            .collect();
                        self.attach(&mut children, &preload.nested);
                        Value::Array(children.into_iter().map(Value::Object).collect())
                    }
                    RelationKind::BelongsTo { foreign_key } => {
                        let id = record
                            .get(foreign_key)
                            .and_then(Value::as_str)
                            .and_then(|s| s.parse::<Uuid>().ok());
                        let found = id.and_then(|id| {
                            self.table(target)
                                .iter()
                                .find(|r| record_id(r) == Some(id))
                                .cloned()
                        });
                        match found {
                            Some(target_record) => {
                                let mut single = [target_record];
                                self.attach(&mut single, &preload.nested);
                                let [target_record] = single;
                                Value::Object(target_record)
                            }
                            None => Value::Null,
                        }
                    }
                };
                record.insert(relation.key.to_string(), value);
            }
        }
    }
}

fn unknown_column(meta: &EntityMeta, column: &str) -> StoreError {
    StoreError::Query(format!(
        "column \"{}\" of relation \"{}\" does not exist",
        column, meta.table
    ))
}

fn matches(meta: &EntityMeta, record: &Record, filter: &Filter) -> Result<bool, StoreError> {
    if let Some(id) = filter.id {
        if record_id(record) != Some(id) {
            return Ok(false);
        }
    }

    let Some(search) = &filter.search else {
        return Ok(true);
    };

    if search.columns.is_empty() {
        return Ok(true);
    }

    let needle = search.term.to_lowercase();
    let mut hit = false;
    for column in &search.columns {
        if meta.field_by_column(column).is_none() {
            return Err(unknown_column(meta, column));
        }
        let text = record.get(column.as_str()).map(search_text).unwrap_or_default();
        hit |= text.to_lowercase().contains(&needle);
    }
    Ok(hit)
}

fn paginate(records: Vec<Record>, query: &Query) -> Vec<Record> {
    match query.page {
        Some(page) => records
            .into_iter()
            .skip(page.offset.max(0) as usize)
            .take(page.limit.max(0) as usize)
            .collect(),
        None => records,
    }
}

/// Keep only declared columns; the database would reject anything else
fn check_columns(meta: &EntityMeta, record: &Record) -> Result<(), StoreError> {
    match record.keys().find(|k| meta.field_by_column(k).is_none()) {
        Some(column) => Err(unknown_column(meta, column)),
        None => Ok(()),
    }
}

fn invalid_value(meta: &EntityMeta, field: &Field, value: &Value) -> StoreError {
    StoreError::Query(format!(
        "invalid input value for column \"{}\" of relation \"{}\": {}",
        field.column, meta.table, value
    ))
}

fn value_fits(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::Uuid => value.as_str().is_some_and(|s| s.parse::<Uuid>().is_ok()),
        FieldKind::Text => value.is_string(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Timestamp => value
            .as_str()
            .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok()),
        FieldKind::TextArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
    }
}

/// Type and NOT NULL checks for the values present in `record`
fn check_values(meta: &EntityMeta, record: &Record) -> Result<(), StoreError> {
    for (column, value) in record {
        let field = meta.field_by_column(column).ok_or_else(|| unknown_column(meta, column))?;
        if value.is_null() {
            if !field.nullable {
                return Err(not_null(meta, field));
            }
        } else if !value_fits(field.kind, value) {
            return Err(invalid_value(meta, field, value));
        }
    }
    Ok(())
}

fn not_null(meta: &EntityMeta, field: &Field) -> StoreError {
    StoreError::Query(format!(
        "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
        field.column, meta.table
    ))
}

/// Full-row checks for a new row: values, plus every NOT NULL column without a default present
fn check_row(meta: &EntityMeta, record: &Record) -> Result<(), StoreError> {
    check_values(meta, record)?;
    match meta
        .fields
        .iter()
        .find(|f| f.required && !f.nullable && !record.contains_key(f.column))
    {
        Some(field) => Err(not_null(meta, field)),
        None => Ok(()),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_one(&self, meta: &'static EntityMeta, query: &Query) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.read().await;
        let mut found = tables.select(meta, &query.filter, None)?;
        found.truncate(1);
        tables.attach(&mut found, &query.preloads);
        Ok(found.pop())
    }

    async fn find_many(&self, meta: &'static EntityMeta, query: &Query) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().await;
        let mut found = paginate(tables.select(meta, &query.filter, None)?, query);
        tables.attach(&mut found, &query.preloads);
        Ok(found)
    }

    async fn count(&self, meta: &'static EntityMeta, filter: &Filter) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.select(meta, filter, None)?.len() as i64)
    }

    async fn create(&self, meta: &'static EntityMeta, mut record: Record) -> Result<Record, StoreError> {
        check_columns(meta, &record)?;
        let id = record_id(&record)
            .ok_or_else(|| StoreError::Query(format!("null value in column \"id\" of relation \"{}\"", meta.table)))?;

        let mut tables = self.tables.write().await;
        if tables.find_index(meta, id).is_some() {
            return Err(StoreError::Query(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                meta.table
            )));
        }

        stamp_created(&mut record, chrono::Utc::now());
        check_row(meta, &record)?;
        tables.register(meta);
        tables.rows.entry(meta.table).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(&self, meta: &'static EntityMeta, id: Uuid, fields: Record) -> Result<(), StoreError> {
        check_columns(meta, &fields)?;

        let mut tables = self.tables.write().await;
        let index = tables
            .find_index(meta, id)
            .ok_or_else(|| StoreError::NotFound(format!("{} {} not found", meta.name, id)))?;

        check_values(meta, &fields)?;

        let rows = tables.rows.entry(meta.table).or_default();
        let row = &mut rows[index];
        for (column, value) in fields {
            row.insert(column, value);
        }
        stamp_updated(row, chrono::Utc::now());
        Ok(())
    }

    async fn delete(&self, meta: &'static EntityMeta, id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;

        if let Some((table, foreign_key)) = tables.referenced_by(meta, id) {
            return Err(StoreError::Query(format!(
                "update or delete on table \"{}\" violates foreign key constraint \"{}_{}_fkey\" on table \"{}\"",
                meta.table, table, foreign_key, table
            )));
        }

        if let Some(rows) = tables.rows.get_mut(meta.table) {
            rows.retain(|r| record_id(r) != Some(id));
        }

        // join rows cascade from either side
        for edges in tables.edges.values_mut() {
            edges.retain(|e| !e.values().any(|v| *v == id));
        }
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
        check_columns(target, &child)?;
        let child_id = record_id(&child)
            .ok_or_else(|| StoreError::Query(format!("{} record has no identifier", target.name)))?;

        let now = chrono::Utc::now();
        let mut tables = self.tables.write().await;

        let stored = match tables.find_index(target, child_id) {
            Some(index) => {
                let mut row = tables.table(target)[index].clone();
                for field in target.fields.iter().filter(|f| f.writable) {
                    if let Some(value) = child.remove(field.column) {
                        row.insert(field.column.to_string(), value);
                    }
                }
                stamp_updated(&mut row, now);
                check_row(target, &row)?;
                tables.rows.entry(target.table).or_default()[index] = row.clone();
                row
            }
            None => {
                stamp_created(&mut child, now);
                check_row(target, &child)?;
                tables.register(target);
                tables.rows.entry(target.table).or_default().push(child.clone());
                child
            }
        };

        let edges = tables.edges.entry(join_table).or_default();
        let exists = edges
            .iter()
            .any(|e| e.get(parent_column) == Some(&parent_id) && e.get(child_column) == Some(&child_id));
        if !exists {
            edges.push(Edge::from([(parent_column, parent_id), (child_column, child_id)]));
        }

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
        let tables = self.tables.read().await;
        let ids = tables.linked_ids(join_table, parent_column, child_column, parent_id);

        let found = tables.select(relation.target_meta(), &query.filter, Some(&ids))?;
        let mut found = paginate(found, query);
        tables.attach(&mut found, &query.preloads);
        Ok(found)
    }

    async fn association_count(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        filter: &Filter,
    ) -> Result<i64, StoreError> {
        let (join_table, parent_column, child_column) = many_to_many(parent, relation)?;
        let tables = self.tables.read().await;
        let ids = tables.linked_ids(join_table, parent_column, child_column, parent_id);
        Ok(tables.select(relation.target_meta(), filter, Some(&ids))?.len() as i64)
    }

    async fn association_delete(
        &self,
        parent: &'static EntityMeta,
        parent_id: Uuid,
        relation: &'static Relation,
        child_id: Uuid,
    ) -> Result<(), StoreError> {
        let (join_table, parent_column, child_column) = many_to_many(parent, relation)?;
        let mut tables = self.tables.write().await;
        if let Some(edges) = tables.edges.get_mut(join_table) {
            edges.retain(|e| !(e.get(parent_column) == Some(&parent_id) && e.get(child_column) == Some(&child_id)));
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
