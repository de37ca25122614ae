//! List query parsing: pagination window, filter and sort from query-string parameters.

mod filter;
mod pagination;
mod sort;

pub use filter::{Filter, FilterClause};
pub use pagination::Pagination;
pub use sort::{Sort, SortOrder};

use crate::config::ResolvedResource;
use crate::error::AppError;
use std::collections::HashMap;

/// Everything the list route hands to a backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub pagination: Pagination,
    pub filter: Filter,
    pub sort: Option<Sort>,
}

impl ListQuery {
    /// Read `skip`, `limit`, `filter` and `sort`; other parameters are ignored.
    pub fn from_params(resource: &ResolvedResource, params: &HashMap<String, String>) -> Result<Self, AppError> {
        let pagination = Pagination::parse(
            params.get("skip").map(String::as_str),
            params.get("limit").map(String::as_str),
            resource.max_limit,
        )?;
        let filter = match params.get("filter").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => Filter::parse(resource, raw)?,
            None => Filter::default(),
        };
        let sort = match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => Some(Sort::parse(resource, raw)?),
            None => None,
        };
        Ok(ListQuery {
            pagination,
            filter,
            sort,
        })
    }

    /// The query delete-all reports with: no filter, no sort, whole table.
    pub fn unbounded() -> Self {
        ListQuery {
            pagination: Pagination::unbounded(),
            filter: Filter::default(),
            sort: None,
        }
    }
}
