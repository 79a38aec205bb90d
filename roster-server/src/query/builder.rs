//! SQL assembly for [`PersonQuery`]
//!
//! Filter values are always bound; only the column expressions from
//! [`SortBy::column`](super::SortBy::column) are interpolated. Substring
//! filters match against the lowercased `*_folded` columns.

use super::{PersonFilter, PersonQuery, Sort, SortOrder};
use roster_common::db::models::{fold_case, ExportRow, PersonRecord};
use roster_common::Result;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

const FROM_JOINED: &str = " FROM persons p JOIN person_details d ON p.id = d.user_id WHERE 1=1";

/// One page of joined records plus the unpaginated match count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPage {
    pub users: Vec<PersonRecord>,
    pub total_count: i64,
}

/// Count matches, then fetch the requested page
pub async fn fetch_page(pool: &SqlitePool, query: &PersonQuery) -> Result<PersonPage> {
    let mut count: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*)");
    count.push(FROM_JOINED);
    push_filters(&mut count, &query.filter);
    let total_count: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut select: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT p.id, p.name, p.email, p.contact_number, p.created_at, d.age, d.gender, d.location",
    );
    select.push(FROM_JOINED);
    push_filters(&mut select, &query.filter);
    push_order(&mut select, query.sort);
    select
        .push(" LIMIT ")
        .push_bind(query.page.limit)
        .push(" OFFSET ")
        .push_bind(query.page.offset());

    let rows = select.build().fetch_all(pool).await?;
    let users = rows
        .iter()
        .map(PersonRecord::from_row)
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "Page {} (limit {}): {} of {} matches",
        query.page.page,
        query.page.limit,
        users.len(),
        total_count
    );

    Ok(PersonPage { users, total_count })
}

/// Every match in sort order, projected for export; pagination is ignored
pub async fn fetch_all(pool: &SqlitePool, query: &PersonQuery) -> Result<Vec<ExportRow>> {
    let mut select: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT p.name, p.email, p.contact_number, d.age, d.gender, d.location",
    );
    select.push(FROM_JOINED);
    push_filters(&mut select, &query.filter);
    push_order(&mut select, query.sort);

    let rows = select.build().fetch_all(pool).await?;
    rows.iter().map(ExportRow::from_row).collect()
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PersonFilter) {
    if let Some(name) = &filter.name {
        qb.push(" AND p.name_folded LIKE ")
            .push_bind(contains_pattern(&fold_case(name)))
            .push(" ESCAPE '\\'");
    }
    if let Some(age) = filter.age {
        qb.push(" AND d.age = ").push_bind(age);
    }
    if let Some(gender) = &filter.gender {
        qb.push(" AND d.gender = ").push_bind(gender.clone());
    }
    if let Some(location) = &filter.location {
        qb.push(" AND d.location_folded LIKE ")
            .push_bind(contains_pattern(&fold_case(location)))
            .push(" ESCAPE '\\'");
    }
}

/// Blank values sort after every value ascending and before them descending
fn push_order(qb: &mut QueryBuilder<'_, Sqlite>, sort: Sort) {
    let direction = sort.order.keyword();
    let nulls = match sort.order {
        SortOrder::Asc => "NULLS LAST",
        SortOrder::Desc => "NULLS FIRST",
    };
    qb.push(format!(
        " ORDER BY {} {} {}, p.id {}",
        sort.by.column(),
        direction,
        nulls,
        direction
    ));
}

/// `%term%` with LIKE wildcards in the term matched literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
