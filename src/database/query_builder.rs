use serde_json::Value;
use sqlx::postgres::PgArguments;
use uuid::Uuid;

use super::entity::EntityMeta;
use super::record::Record;
use super::store::{Filter, Page, StoreError};

/// Bound parameter for a generated statement
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Uuid(Uuid),
    Uuids(Vec<Uuid>),
    Text(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Param>,
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column names reaching SQL must look like identifiers
pub fn validate_column(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::InvalidQuery(format!("Invalid column name: {}", name)))
    }
}

/// SELECT over one table, optionally scoped through a join table
pub struct SelectBuilder {
    table: &'static str,
    joins: Vec<String>,
    conditions: Vec<String>,
    params: Vec<Param>,
    page: Option<Page>,
}

impl SelectBuilder {
    pub fn new(meta: &EntityMeta) -> Self {
        Self {
            table: meta.table,
            joins: Vec::new(),
            conditions: Vec::new(),
            params: Vec::new(),
            page: None,
        }
    }

    fn push(&mut self, param: Param) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    /// Restrict to rows linked to `parent_id` through a join table
    pub fn through(mut self, join_table: &str, parent_column: &str, child_column: &str, parent_id: Uuid) -> Self {
        self.joins.push(format!(
            "JOIN {} j ON j.{} = t.\"id\"",
            quote_identifier(join_table),
            quote_identifier(child_column)
        ));
        let placeholder = self.push(Param::Uuid(parent_id));
        self.conditions
            .push(format!("j.{} = {}", quote_identifier(parent_column), placeholder));
        self
    }

    pub fn filter(mut self, filter: &Filter) -> Result<Self, StoreError> {
        if let Some(id) = filter.id {
            let placeholder = self.push(Param::Uuid(id));
            self.conditions.push(format!("t.\"id\" = {}", placeholder));
        }

        if let Some(search) = &filter.search {
            for column in &search.columns {
                validate_column(column)?;
            }

            if !search.columns.is_empty() {
                let placeholder = self.push(Param::Text(format!("%{}%", search.term)));
                let clauses: Vec<String> = search
                    .columns
                    .iter()
                    .map(|c| format!("t.{}::text ILIKE {}", quote_identifier(c), placeholder))
                    .collect();
                self.conditions.push(format!("({})", clauses.join(" OR ")));
            }
        }

        Ok(self)
    }

    pub fn page(mut self, page: Option<Page>) -> Self {
        self.page = page;
        self
    }

    fn from_clause(&self) -> String {
        let mut sql = format!("FROM {} t", quote_identifier(self.table));
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        if !self.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions.join(" AND "));
        }
        sql
    }

    pub fn to_select_sql(&self) -> SqlResult {
        let mut query = format!(
            "SELECT row_to_json(t) AS row {} ORDER BY t.\"created_at\", t.\"id\"",
            self.from_clause()
        );
        if let Some(page) = self.page {
            query.push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.offset));
        }
        SqlResult {
            query,
            params: self.params.clone(),
        }
    }

    pub fn to_count_sql(&self) -> SqlResult {
        SqlResult {
            query: format!("SELECT COUNT(*) AS count {}", self.from_clause()),
            params: self.params.clone(),
        }
    }
}

fn writable_columns(meta: &EntityMeta) -> Vec<&'static str> {
    meta.fields
        .iter()
        .filter(|f| f.writable)
        .map(|f| f.column)
        .collect()
}

pub fn insert_sql(meta: &EntityMeta, record: Record) -> SqlResult {
    let table = quote_identifier(meta.table);
    SqlResult {
        query: format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, $1) RETURNING row_to_json(t) AS row"
        ),
        params: vec![Param::Json(Value::Object(record))],
    }
}

/// Insert, or refresh the writable columns of an existing row with the same id
pub fn upsert_sql(meta: &EntityMeta, record: Record) -> SqlResult {
    let table = quote_identifier(meta.table);
    let mut assignments: Vec<String> = writable_columns(meta)
        .into_iter()
        .map(|c| format!("{col} = EXCLUDED.{col}", col = quote_identifier(c)))
        .collect();
    assignments.push("\"updated_at\" = now()".to_string());

    SqlResult {
        query: format!(
            "INSERT INTO {table} AS t SELECT * FROM jsonb_populate_record(NULL::{table}, $1) \
             ON CONFLICT (\"id\") DO UPDATE SET {} RETURNING row_to_json(t) AS row",
            assignments.join(", ")
        ),
        params: vec![Param::Json(Value::Object(record))],
    }
}

/// Partial update; column names come from the caller and are not checked against the table
pub fn update_sql(meta: &EntityMeta, id: Uuid, fields: Record) -> Result<SqlResult, StoreError> {
    let table = quote_identifier(meta.table);
    let mut assignments = Vec::with_capacity(fields.len() + 1);

    for column in fields.keys() {
        validate_column(column)?;
        let quoted = quote_identifier(column);
        assignments.push(format!("{quoted} = r.{quoted}"));
    }
    assignments.push("\"updated_at\" = now()".to_string());

    Ok(SqlResult {
        query: format!(
            "UPDATE {table} AS t SET {} FROM jsonb_populate_record(NULL::{table}, $2) AS r WHERE t.\"id\" = $1",
            assignments.join(", ")
        ),
        params: vec![Param::Uuid(id), Param::Json(Value::Object(fields))],
    })
}

pub fn delete_sql(meta: &EntityMeta, id: Uuid) -> SqlResult {
    SqlResult {
        query: format!("DELETE FROM {} WHERE \"id\" = $1", quote_identifier(meta.table)),
        params: vec![Param::Uuid(id)],
    }
}

pub fn link_sql(join_table: &str, parent_column: &str, child_column: &str, parent_id: Uuid, child_id: Uuid) -> SqlResult {
    SqlResult {
        query: format!(
            "INSERT INTO {} ({}, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            quote_identifier(join_table),
            quote_identifier(parent_column),
            quote_identifier(child_column)
        ),
        params: vec![Param::Uuid(parent_id), Param::Uuid(child_id)],
    }
}

pub fn unlink_sql(join_table: &str, parent_column: &str, child_column: &str, parent_id: Uuid, child_id: Uuid) -> SqlResult {
    SqlResult {
        query: format!(
            "DELETE FROM {} WHERE {} = $1 AND {} = $2",
            quote_identifier(join_table),
            quote_identifier(parent_column),
            quote_identifier(child_column)
        ),
        params: vec![Param::Uuid(parent_id), Param::Uuid(child_id)],
    }
}

/// Children of many parents in one round trip, tagged with their parent id
pub fn children_sql(
    target: &EntityMeta,
    join_table: &str,
    parent_column: &str,
    child_column: &str,
    parent_ids: Vec<Uuid>,
) -> SqlResult {
    SqlResult {
        query: format!(
            "SELECT j.{parent} AS parent_id, row_to_json(t) AS row FROM {table} t \
             JOIN {join} j ON j.{child} = t.\"id\" WHERE j.{parent} = ANY($1) \
             ORDER BY t.\"created_at\", t.\"id\"",
            parent = quote_identifier(parent_column),
            child = quote_identifier(child_column),
            table = quote_identifier(target.table),
            join = quote_identifier(join_table),
        ),
        params: vec![Param::Uuids(parent_ids)],
    }
}

pub fn rows_by_ids_sql(target: &EntityMeta, ids: Vec<Uuid>) -> SqlResult {
    SqlResult {
        query: format!(
            "SELECT row_to_json(t) AS row FROM {} t WHERE t.\"id\" = ANY($1)",
            quote_identifier(target.table)
        ),
        params: vec![Param::Uuids(ids)],
    }
}

pub fn bind_param<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    param: &Param,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match param {
        Param::Uuid(id) => q.bind(*id),
        Param::Uuids(ids) => q.bind(ids.clone()),
        Param::Text(s) => q.bind(s.clone()),
        Param::Json(v) => q.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entity::Entity;
    use crate::database::models::{Role, User};
    use crate::database::store::Search;
    use serde_json::json;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn search_is_or_combined_over_one_parameter() {
        let filter = Filter {
            id: None,
            search: Some(Search {
                term: "adm".into(),
                columns: vec!["name".into(), "description".into()],
            }),
        };

        let sql = SelectBuilder::new(Role::meta())
            .filter(&filter)
            .unwrap()
            .page(Some(Page { limit: 10, offset: 20 }))
            .to_select_sql();

        assert_eq!(
            sql.query,
            "SELECT row_to_json(t) AS row FROM \"roles\" t WHERE (t.\"name\"::text ILIKE $1 OR t.\"description\"::text ILIKE $1) \
             ORDER BY t.\"created_at\", t.\"id\" LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params, vec![Param::Text("%adm%".into())]);
    }

    #[test]
    fn association_count_scopes_through_join_table() {
        let parent = Uuid::new_v4();
        let sql = SelectBuilder::new(Role::meta())
            .through("users_roles", "user_id", "role_id", parent)
            .to_count_sql();

        assert_eq!(
            sql.query,
            "SELECT COUNT(*) AS count FROM \"roles\" t JOIN \"users_roles\" j ON j.\"role_id\" = t.\"id\" WHERE j.\"user_id\" = $1"
        );
        assert_eq!(sql.params, vec![Param::Uuid(parent)]);
    }

    #[test]
    fn malformed_search_column_is_rejected() {
        let filter = Filter {
            id: None,
            search: Some(Search {
                term: "x".into(),
                columns: vec!["name; DROP TABLE users".into()],
            }),
        };
        let result = SelectBuilder::new(User::meta()).filter(&filter);
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
    }

    #[test]
    fn update_sets_each_field_from_populated_record() {
        let id = Uuid::new_v4();
        let fields = json!({ "name": "Ops" }).as_object().unwrap().clone();
        let sql = update_sql(Role::meta(), id, fields).unwrap();

        assert_eq!(
            sql.query,
            "UPDATE \"roles\" AS t SET \"name\" = r.\"name\", \"updated_at\" = now() \
             FROM jsonb_populate_record(NULL::\"roles\", $2) AS r WHERE t.\"id\" = $1"
        );
    }

    #[test]
    fn upsert_refreshes_writable_columns_only() {
        let sql = upsert_sql(Role::meta(), Record::new());
        assert!(sql.query.contains("\"name\" = EXCLUDED.\"name\""));
        assert!(sql.query.contains("\"permissions\" = EXCLUDED.\"permissions\""));
        assert!(!sql.query.contains("\"created_at\" = EXCLUDED"));
    }
}
