use url::form_urlencoded;

use crate::database::{EntityMeta, Search};
use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Query parameters accepted by list operations.
///
/// Array parameters may repeat (`preload=a&preload=b`), use the bracket form
/// (`preload[]=a`), or carry a comma-separated list (`preload=a,b`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub disable_pagination: bool,
    pub page: i64,
    pub page_size: i64,
    pub preload: Vec<String>,
    pub search_term: Option<String>,
    pub search_column: Vec<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            disable_pagination: false,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            preload: Vec::new(),
            search_term: None,
            search_column: Vec::new(),
        }
    }
}

impl ListQuery {
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let mut query = Self::default();
        let Some(raw) = raw else {
            return Ok(query);
        };

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let key = key.trim_end_matches("[]");
            match key {
                "disablePagination" => query.disable_pagination = parse_bool(key, &value)?,
                "page" => query.page = parse_positive(key, &value)?,
                "pageSize" => query.page_size = parse_positive(key, &value)?,
                "preload" => push_list(&mut query.preload, &value),
                "searchTerm" => query.search_term = Some(value.into_owned()),
                "searchColumn" => push_list(&mut query.search_column, &value),
                _ => {}
            }
        }

        Ok(query)
    }

    /// Substring search when both a term and columns were given; wire names map to storage columns
    pub fn search(&self, meta: &EntityMeta) -> Option<Search> {
        let term = self.search_term.as_deref().filter(|t| !t.is_empty())?;
        if self.search_column.is_empty() {
            return None;
        }

        Some(Search {
            term: term.to_string(),
            columns: self.search_column.iter().map(|c| meta.column_name(c)).collect(),
        })
    }
}

/// Query parameters accepted by get-one operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadQuery {
    pub preload: Vec<String>,
}

impl PreloadQuery {
    pub fn parse(raw: Option<&str>) -> Self {
        let mut query = Self::default();
        if let Some(raw) = raw {
            for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
                if key.trim_end_matches("[]") == "preload" {
                    push_list(&mut query.preload, &value);
                }
            }
        }
        query
    }
}

fn push_list(target: &mut Vec<String>, value: &str) {
    target.extend(
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ApiError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ApiError::bad_request(format!(
            "Invalid value '{}' for query parameter '{}'",
            value, key
        ))),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<i64, ApiError> {
    let n: i64 = value.trim().parse().map_err(|_| {
        ApiError::bad_request(format!("Invalid value '{}' for query parameter '{}'", value, key))
    })?;

    // Non-positive values fall back to the defaults, as the page envelope expects
    Ok(if n < 1 {
        if key == "page" {
            1
        } else {
            DEFAULT_PAGE_SIZE
        }
    } else {
        n
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::User;
    use crate::database::Entity;

    #[test]
    fn defaults_without_query_string() {
        assert_eq!(ListQuery::parse(None).unwrap(), ListQuery::default());
        assert_eq!(ListQuery::parse(Some("")).unwrap().page_size, 10);
    }

    #[test]
    fn arrays_accept_repeats_brackets_and_commas() {
        let q = ListQuery::parse(Some("preload=roles&preload[]=organizations&searchColumn=name,username")).unwrap();
        assert_eq!(q.preload, vec!["roles", "organizations"]);
        assert_eq!(q.search_column, vec!["name", "username"]);
    }

    #[test]
    fn numbers_and_flags_are_parsed() {
        let q = ListQuery::parse(Some("page=3&pageSize=25&disablePagination=true")).unwrap();
        assert_eq!(q.page, 3);
        assert_eq!(q.page_size, 25);
        assert!(q.disable_pagination);

        let q = ListQuery::parse(Some("page=0&pageSize=-4")).unwrap();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 10);
    }

    #[test]
    fn malformed_numbers_are_bad_requests() {
        let err = ListQuery::parse(Some("page=two")).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(ListQuery::parse(Some("disablePagination=maybe")).is_err());
    }

    #[test]
    fn search_needs_term_and_columns_and_maps_wire_names() {
        let q = ListQuery::parse(Some("searchTerm=jan&searchColumn=mfaEnabled&searchColumn=name")).unwrap();
        let search = q.search(User::meta()).unwrap();
        assert_eq!(search.term, "jan");
        assert_eq!(search.columns, vec!["mfa_enabled", "name"]);

        let q = ListQuery::parse(Some("searchTerm=jan")).unwrap();
        assert!(q.search(User::meta()).is_none());

        let q = ListQuery::parse(Some("searchTerm=&searchColumn=name")).unwrap();
        assert!(q.search(User::meta()).is_none());
    }

    #[test]
    fn get_one_reads_only_preloads() {
        let q = PreloadQuery::parse(Some("preload=roles.users&page=2"));
        assert_eq!(q.preload, vec!["roles.users"]);
    }
}
