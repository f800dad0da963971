//! Declarative filter / sort / page descriptions shared by every list endpoint.
//!
//! A [`ListQuery`] is built from closed per-entity column enums and compiled
//! once into a [`CompiledQuery`]. The compiled form renders the same predicate
//! into a paged `SELECT` and an unpaged `COUNT`, and can also evaluate that
//! predicate against in-memory records.
//!
//! Predicate shape: every non-search filter is AND-ed; search filters are
//! OR-ed together and the group is AND-ed with the rest when non-empty.

mod params;

pub use params::ListParams;

use chrono::{DateTime, Utc};
use service_core::error::AppError;
use sqlx::{Postgres, QueryBuilder};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("unknown filter operator '{0}'")]
    UnknownOperator(String),

    #[error("invalid value '{value}' for column {column}")]
    InvalidValue { column: &'static str, value: String },

    #[error("search is only supported on text columns, not {0}")]
    SearchOnNonText(&'static str),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

/// Storage type of a column, used to parse and compare filter values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Uuid,
    Bool,
    Int,
    Timestamp,
}

/// A filterable/sortable column of one entity.
///
/// Implemented by closed enums so that only known column names ever reach SQL.
pub trait Column: Copy + fmt::Debug + Send + Sync + 'static {
    /// SQL expression for the column, qualified when the entity is a join.
    fn as_sql(self) -> &'static str;

    fn kind(self) -> ColumnKind;
}

/// Record that can be evaluated against a compiled predicate.
pub trait Filterable<C: Column> {
    /// Current value of `column`; `None` behaves like SQL `NULL`.
    fn field(&self, column: C) -> Option<FilterValue>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Uuid(Uuid),
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Parse raw request input according to the column's kind.
    pub fn parse(kind: ColumnKind, raw: &str) -> Option<Self> {
        match kind {
            ColumnKind::Text => Some(Self::Text(raw.to_string())),
            ColumnKind::Uuid => Uuid::parse_str(raw.trim()).ok().map(Self::Uuid),
            ColumnKind::Bool => raw.trim().parse().ok().map(Self::Bool),
            ColumnKind::Int => raw.trim().parse().ok().map(Self::Int),
            ColumnKind::Timestamp => DateTime::parse_from_rfc3339(raw.trim())
                .ok()
                .map(|ts| Self::Timestamp(ts.with_timezone(&Utc))),
        }
    }

    fn kind(&self) -> ColumnKind {
        match self {
            Self::Text(_) => ColumnKind::Text,
            Self::Uuid(_) => ColumnKind::Uuid,
            Self::Bool(_) => ColumnKind::Bool,
            Self::Int(_) => ColumnKind::Int,
            Self::Timestamp(_) => ColumnKind::Timestamp,
        }
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    fn push_bind(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        match self {
            Self::Text(v) => builder.push_bind(v.clone()),
            Self::Uuid(v) => builder.push_bind(*v),
            Self::Bool(v) => builder.push_bind(*v),
            Self::Int(v) => builder.push_bind(*v),
            Self::Timestamp(v) => builder.push_bind(*v),
        };
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Case-insensitive "contains".
    Search,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => " = ",
            FilterOp::Neq => " <> ",
            FilterOp::Gt => " > ",
            FilterOp::Gte => " >= ",
            FilterOp::Lt => " < ",
            FilterOp::Lte => " <= ",
            FilterOp::Search => " ILIKE ",
        }
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" => Ok(FilterOp::Eq),
            "neq" | "ne" => Ok(FilterOp::Neq),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "search" => Ok(FilterOp::Search),
            other => Err(QueryError::UnknownOperator(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter<C> {
    pub column: C,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl<C: Column> Filter<C> {
    pub fn new(column: C, op: FilterOp, value: impl Into<FilterValue>) -> Result<Self, QueryError> {
        let value = value.into();
        if op == FilterOp::Search && column.kind() != ColumnKind::Text {
            return Err(QueryError::SearchOnNonText(column.as_sql()));
        }
        if value.kind() != column.kind() {
            return Err(QueryError::InvalidValue {
                column: column.as_sql(),
                value: format!("{:?}", value),
            });
        }
        Ok(Self { column, op, value })
    }

    /// Build a filter from raw request input (`op` as in `eq`, `search`, ...).
    pub fn parse(column: C, op: &str, raw: &str) -> Result<Self, QueryError> {
        let op = op.parse::<FilterOp>()?;
        let value =
            FilterValue::parse(column.kind(), raw).ok_or_else(|| QueryError::InvalidValue {
                column: column.as_sql(),
                value: raw.to_string(),
            })?;
        Self::new(column, op, value)
    }

    pub fn eq(column: C, value: impl Into<FilterValue>) -> Result<Self, QueryError> {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn search(column: C, term: &str) -> Result<Self, QueryError> {
        Self::new(column, FilterOp::Search, term)
    }

    fn matches<R: Filterable<C>>(&self, record: &R) -> bool {
        let Some(actual) = record.field(self.column) else {
            return false;
        };

        if self.op == FilterOp::Search {
            return match (&actual, &self.value) {
                (FilterValue::Text(haystack), FilterValue::Text(needle)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            };
        }

        match actual.compare(&self.value) {
            Some(ordering) => match self.op {
                FilterOp::Eq => ordering == Ordering::Equal,
                FilterOp::Neq => ordering != Ordering::Equal,
                FilterOp::Gt => ordering == Ordering::Greater,
                FilterOp::Gte => ordering != Ordering::Less,
                FilterOp::Lt => ordering == Ordering::Less,
                FilterOp::Lte => ordering != Ordering::Greater,
                FilterOp::Search => false,
            },
            None => false,
        }
    }

    fn push_sql(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        builder.push(self.column.as_sql());
        builder.push(self.op.sql());
        match (&self.op, &self.value) {
            (FilterOp::Search, FilterValue::Text(term)) => {
                builder.push_bind(like_pattern(term));
                builder.push(" ESCAPE '\\'");
            }
            (_, value) => value.push_bind(builder),
        }
    }
}

/// `%term%` with LIKE metacharacters in `term` escaped.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<C> {
    pub column: C,
    pub direction: Direction,
}

/// Filters, ordering and pagination for one list request.
#[derive(Debug, Clone)]
pub struct ListQuery<C> {
    filters: Vec<Filter<C>>,
    order_by: Vec<OrderBy<C>>,
    page: i64,
    limit: i64,
}

impl<C: Column> Default for ListQuery<C> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            order_by: Vec::new(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl<C: Column> ListQuery<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter<C>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter<C>>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn order_by(mut self, column: C, direction: Direction) -> Self {
        self.order_by.push(OrderBy { column, direction });
        self
    }

    /// Non-positive values fall back to the defaults at compile time.
    pub fn paginate(mut self, page: i64, limit: i64) -> Self {
        self.page = page;
        self.limit = limit;
        self
    }

    pub fn compile(self) -> CompiledQuery<C> {
        let limit = if self.limit <= 0 { DEFAULT_LIMIT } else { self.limit };
        let page = if self.page <= 0 { DEFAULT_PAGE } else { self.page };

        let (searches, conditions): (Vec<_>, Vec<_>) = self
            .filters
            .into_iter()
            .partition(|f| f.op == FilterOp::Search);

        CompiledQuery {
            conditions,
            searches,
            order_by: self.order_by,
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

/// A normalised list query, ready to render or evaluate.
#[derive(Debug, Clone)]
pub struct CompiledQuery<C> {
    conditions: Vec<Filter<C>>,
    searches: Vec<Filter<C>>,
    order_by: Vec<OrderBy<C>>,
    limit: i64,
    offset: i64,
}

impl<C: Column> CompiledQuery<C> {
    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn has_predicate(&self) -> bool {
        !self.conditions.is_empty() || !self.searches.is_empty()
    }

    /// Append ` WHERE ...` (nothing when there are no filters).
    pub fn push_where(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        if !self.has_predicate() {
            return;
        }

        builder.push(" WHERE ");
        let mut first = true;
        for condition in &self.conditions {
            if !first {
                builder.push(" AND ");
            }
            condition.push_sql(builder);
            first = false;
        }

        if !self.searches.is_empty() {
            if !first {
                builder.push(" AND ");
            }
            builder.push("(");
            for (i, search) in self.searches.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                search.push_sql(builder);
            }
            builder.push(")");
        }
    }

    pub fn push_order(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        for (i, order) in self.order_by.iter().enumerate() {
            builder.push(if i == 0 { " ORDER BY " } else { ", " });
            builder.push(order.column.as_sql());
            builder.push(match order.direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
        }
    }

    pub fn push_page(&self, builder: &mut QueryBuilder<'static, Postgres>) {
        builder.push(" LIMIT ");
        builder.push_bind(self.limit);
        builder.push(" OFFSET ");
        builder.push_bind(self.offset);
    }

    /// `head` (e.g. `SELECT ... FROM users`) followed by the predicate,
    /// ordering and page window.
    pub fn select(&self, head: &str) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(head);
        self.push_where(&mut builder);
        self.push_order(&mut builder);
        self.push_page(&mut builder);
        builder
    }

    /// Total-count query over `from` using the identical predicate.
    pub fn count(&self, from: &str) -> QueryBuilder<'static, Postgres> {
        let mut builder = QueryBuilder::new(format!("SELECT COUNT(1) FROM {}", from));
        self.push_where(&mut builder);
        builder
    }

    pub fn matches<R: Filterable<C>>(&self, record: &R) -> bool {
        self.conditions.iter().all(|f| f.matches(record))
            && (self.searches.is_empty() || self.searches.iter().any(|f| f.matches(record)))
    }

    /// Filter, order and page `records` the way the SQL rendering would.
    /// Returns the page and the total match count.
    pub fn apply<R: Filterable<C>>(&self, records: impl IntoIterator<Item = R>) -> (Vec<R>, i64) {
        let mut matched: Vec<R> = records.into_iter().filter(|r| self.matches(r)).collect();
        let count = matched.len() as i64;

        matched.sort_by(|a, b| self.compare_records(a, b));

        let page = matched
            .into_iter()
            .skip(self.offset.max(0) as usize)
            .take(self.limit.max(0) as usize)
            .collect();
        (page, count)
    }

    fn compare_records<R: Filterable<C>>(&self, a: &R, b: &R) -> Ordering {
        for order in &self.order_by {
            // NULLs sort as the largest value, matching Postgres defaults.
            let ordering = match (a.field(order.column), b.field(order.column)) {
                (Some(x), Some(y)) => x.compare(&y).unwrap_or(Ordering::Equal),
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (None, None) => Ordering::Equal,
            };
            let ordering = match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestColumn {
        Id,
        Status,
        Name,
        CreatedAt,
    }

    impl Column for TestColumn {
        fn as_sql(self) -> &'static str {
            match self {
                TestColumn::Id => "id",
                TestColumn::Status => "status",
                TestColumn::Name => "name",
                TestColumn::CreatedAt => "created_at",
            }
        }

        fn kind(self) -> ColumnKind {
            match self {
                TestColumn::Id => ColumnKind::Int,
                TestColumn::Status | TestColumn::Name => ColumnKind::Text,
                TestColumn::CreatedAt => ColumnKind::Timestamp,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: i64,
        status: &'static str,
        name: Option<&'static str>,
        created_at: DateTime<Utc>,
    }

    impl Filterable<TestColumn> for Row {
        fn field(&self, column: TestColumn) -> Option<FilterValue> {
            match column {
                TestColumn::Id => Some(self.id.into()),
                TestColumn::Status => Some(self.status.into()),
                TestColumn::Name => self.name.map(Into::into),
                TestColumn::CreatedAt => Some(self.created_at.into()),
            }
        }
    }

    fn row(id: i64, status: &'static str, name: &'static str) -> Row {
        Row {
            id,
            status,
            name: Some(name),
            created_at: Utc::now() + Duration::seconds(id),
        }
    }

    #[test]
    fn test_defaults_apply_to_non_positive_page_and_limit() {
        let compiled = ListQuery::<TestColumn>::new().paginate(0, -3).compile();
        assert_eq!(compiled.limit(), DEFAULT_LIMIT);
        assert_eq!(compiled.offset(), 0);

        let compiled = ListQuery::<TestColumn>::new().paginate(3, 25).compile();
        assert_eq!(compiled.limit(), 25);
        assert_eq!(compiled.offset(), 50);
    }

    #[test]
    fn test_select_renders_and_group_then_or_group() {
        let compiled = ListQuery::new()
            .filter(Filter::eq(TestColumn::Status, "active").unwrap())
            .filter(Filter::search(TestColumn::Name, "jo").unwrap())
            .filter(Filter::parse(TestColumn::Id, "gt", "7").unwrap())
            .filter(Filter::search(TestColumn::Status, "act").unwrap())
            .order_by(TestColumn::CreatedAt, Direction::Desc)
            .order_by(TestColumn::Id, Direction::Asc)
            .compile();

        let select = compiled.select("SELECT * FROM people");
        assert_eq!(
            select.sql(),
            "SELECT * FROM people WHERE status = $1 AND id > $2 AND \
             (name ILIKE $3 ESCAPE '\\' OR status ILIKE $4 ESCAPE '\\') \
             ORDER BY created_at DESC, id ASC LIMIT $5 OFFSET $6"
        );

        let count = compiled.count("people");
        assert_eq!(
            count.sql(),
            "SELECT COUNT(1) FROM people WHERE status = $1 AND id > $2 AND \
             (name ILIKE $3 ESCAPE '\\' OR status ILIKE $4 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_no_filters_renders_no_where_clause() {
        let compiled = ListQuery::<TestColumn>::new().compile();
        assert!(!compiled.has_predicate());
        assert_eq!(
            compiled.select("SELECT * FROM people").sql(),
            "SELECT * FROM people LIMIT $1 OFFSET $2"
        );
        assert_eq!(compiled.count("people").sql(), "SELECT COUNT(1) FROM people");
    }

    #[test]
    fn test_search_only_predicate_has_no_leading_and() {
        let compiled = ListQuery::new()
            .filter(Filter::search(TestColumn::Name, "x").unwrap())
            .compile();
        assert_eq!(
            compiled.count("people").sql(),
            "SELECT COUNT(1) FROM people WHERE (name ILIKE $1 ESCAPE '\\')"
        );
    }

    #[test]
    fn test_like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("jo"), "%jo%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn test_search_rejected_on_non_text_column() {
        assert_eq!(
            Filter::new(TestColumn::Id, FilterOp::Search, 5i64),
            Err(QueryError::SearchOnNonText("id"))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            Filter::parse(TestColumn::Id, "gt", "seven"),
            Err(QueryError::InvalidValue { column: "id", .. })
        ));
        assert_eq!(
            Filter::parse(TestColumn::Status, "like", "x"),
            Err(QueryError::UnknownOperator("like".to_string()))
        );
        assert!(Filter::eq(TestColumn::Id, "1").is_err());
    }

    #[test]
    fn test_and_of_simple_with_or_of_search_in_memory() {
        let rows = vec![
            row(1, "active", "john"),
            row(2, "active", "amy"),
            row(3, "inactive", "joe"),
        ];
        let compiled = ListQuery::new()
            .filter(Filter::eq(TestColumn::Status, "active").unwrap())
            .filter(Filter::search(TestColumn::Name, "JO").unwrap())
            .compile();

        let (items, count) = compiled.apply(rows);
        assert_eq!(count, 1);
        assert_eq!(items[0].name, Some("john"));
    }

    #[test]
    fn test_null_fields_never_match() {
        let mut nameless = row(1, "active", "x");
        nameless.name = None;
        let compiled = ListQuery::new()
            .filter(Filter::new(TestColumn::Name, FilterOp::Neq, "x").unwrap())
            .compile();
        assert!(!compiled.matches(&nameless));
    }

    #[test]
    fn test_compiling_twice_is_deterministic() {
        let build = || {
            ListQuery::new()
                .filter(Filter::eq(TestColumn::Status, "active").unwrap())
                .filter(Filter::search(TestColumn::Name, "a").unwrap())
                .order_by(TestColumn::Id, Direction::Asc)
                .compile()
        };
        let rows: Vec<_> = (0..20)
            .map(|i| row(i, if i % 2 == 0 { "active" } else { "inactive" }, "amanda"))
            .collect();

        assert_eq!(
            build().select("SELECT * FROM people").sql(),
            build().select("SELECT * FROM people").sql()
        );
        assert_eq!(build().apply(rows.clone()), build().apply(rows));
    }

    #[test]
    fn test_paging_covers_every_row_exactly_once() {
        let rows: Vec<_> = (0..23).map(|i| row(i, "active", "n")).collect();
        let limit = 5;
        let pages = (rows.len() as i64 + limit - 1) / limit;

        let mut seen = Vec::new();
        for page in 1..=pages {
            let (items, count) = ListQuery::new()
                .order_by(TestColumn::CreatedAt, Direction::Desc)
                .paginate(page, limit)
                .compile()
                .apply(rows.clone());
            assert_eq!(count, 23);
            seen.extend(items.into_iter().map(|r| r.id));
        }

        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn test_ordering_follows_caller_sequence() {
        let rows = vec![
            row(1, "b", "x"),
            row(2, "a", "x"),
            row(3, "b", "x"),
        ];
        let (items, _) = ListQuery::new()
            .order_by(TestColumn::Status, Direction::Asc)
            .order_by(TestColumn::Id, Direction::Desc)
            .compile()
            .apply(rows);
        let ids: Vec<_> = items.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
