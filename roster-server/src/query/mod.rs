//! Filtered, sorted, paginated person queries
//!
//! The loosely-typed query string is turned into [`PersonQuery`] at the
//! boundary. Only the whitelisted filter keys and sort columns exist on that
//! type, so nothing else can reach SQL construction.

mod builder;
pub mod pagination;

pub use builder::{fetch_all, fetch_page, PersonPage};
pub use pagination::PageRequest;

use roster_common::db::models::parse_int_prefix;
use roster_common::{Error, Result};
use serde::Deserialize;

/// Raw query-string parameters as sent by the dashboard
///
/// Unknown keys are dropped by deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub location: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Whitelisted filters, AND-combined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFilter {
    /// Case-insensitive substring of the name
    pub name: Option<String>,
    /// Exact age
    pub age: Option<i64>,
    /// Exact gender
    pub gender: Option<String>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
}

/// Sortable columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    Name,
    Age,
    Location,
    #[default]
    CreatedAt,
}

impl SortBy {
    /// Unknown or missing values sort by creation time
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("name") => SortBy::Name,
            Some("age") => SortBy::Age,
            Some("location") => SortBy::Location,
            _ => SortBy::CreatedAt,
        }
    }

    /// Column expression interpolated into ORDER BY
    pub fn column(self) -> &'static str {
        match self {
            SortBy::Name => "p.name",
            SortBy::Age => "d.age",
            SortBy::Location => "d.location",
            SortBy::CreatedAt => "p.created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Only the exact string `DESC` sorts descending
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("DESC") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sort {
    pub by: SortBy,
    pub order: SortOrder,
}

/// Closed query type handed to the SQL builder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonQuery {
    pub filter: PersonFilter,
    pub sort: Sort,
    pub page: PageRequest,
}

impl PersonQuery {
    /// Convert raw parameters; a non-numeric age filter is rejected
    pub fn from_params(params: &QueryParams, max_page_size: i64) -> Result<Self> {
        let age = match non_empty(&params.age) {
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                Error::Validation(format!("age filter must be an integer (got {:?})", raw))
            })?),
            None => None,
        };

        Ok(Self {
            filter: PersonFilter {
                name: non_empty(&params.name),
                age,
                gender: non_empty(&params.gender),
                location: non_empty(&params.location),
            },
            sort: Sort {
                by: SortBy::parse(params.sort_by.as_deref()),
                order: SortOrder::parse(params.sort_order.as_deref()),
            },
            page: PageRequest::from_raw(
                params.page.as_deref().and_then(parse_int_prefix),
                params.limit.as_deref().and_then(parse_int_prefix),
                max_page_size,
            ),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
