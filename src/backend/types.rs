use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::error::{not_found, Result};

/// Join of a related table into the selected rows
#[derive(Debug, Clone, PartialEq)]
pub struct Embed {
    /// Key the joined object appears under
    pub alias: String,
    pub table: String,
    /// Column of the parent row holding the related row's id
    pub fk_column: String,
    /// Foreign key constraint name, needed when two keys point at the same table
    pub hint: Option<String>,
    /// Columns of the related row; empty means all
    pub columns: Vec<String>,
}

impl Embed {
    pub fn new(alias: &str, table: &str, fk_column: &str) -> Self {
        Self {
            alias: alias.to_string(),
            table: table.to_string(),
            fk_column: fk_column.to_string(),
            hint: None,
            columns: Vec::new(),
        }
    }

    pub fn hint(mut self, constraint: &str) -> Self {
        self.hint = Some(constraint.to_string());
        self
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    fn render(&self) -> String {
        let hint = self
            .hint
            .as_ref()
            .map(|h| format!("!{}", h))
            .unwrap_or_default();
        format!(
            "{}:{}{}({})",
            self.alias,
            self.table,
            hint,
            render_columns(&self.columns)
        )
    }
}

/// Columns returned by a select or mutation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Empty means `*`
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            embeds: Vec::new(),
        }
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    /// PostgREST `select=` value
    pub fn render(&self) -> String {
        let mut parts = vec![render_columns(&self.columns)];
        parts.extend(self.embeds.iter().map(Embed::render));
        parts.join(",")
    }
}

fn render_columns(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(",")
    }
}

/// One predicate clause; a query applies its clauses conjunctively
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    /// Case-insensitive substring containment
    ILike(String, String),
    Gte(String, Value),
    Lte(String, Value),
    /// Disjunction nested inside the outer conjunction
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(column.to_string(), value.into())
    }

    pub fn contains(column: &str, term: &str) -> Self {
        Filter::ILike(column.to_string(), term.to_string())
    }

    pub fn gte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Gte(column.to_string(), value.into())
    }

    pub fn lte(column: &str, value: impl Into<Value>) -> Self {
        Filter::Lte(column.to_string(), value.into())
    }

    /// Evaluate against a JSON row. A missing or null column never matches.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, expected) => match row.get(column) {
                Some(Value::Null) | None => false,
                Some(actual) => compare_values(actual, expected) == Some(Ordering::Equal),
            },
            Filter::ILike(column, term) => match row.get(column).and_then(Value::as_str) {
                Some(actual) => actual.to_lowercase().contains(&term.to_lowercase()),
                None => false,
            },
            Filter::Gte(column, bound) => row
                .get(column)
                .and_then(|actual| compare_values(actual, bound))
                .map_or(false, |o| o != Ordering::Less),
            Filter::Lte(column, bound) => row
                .get(column)
                .and_then(|actual| compare_values(actual, bound))
                .map_or(false, |o| o != Ordering::Greater),
            Filter::Or(group) => group.iter().any(|f| f.matches(row)),
        }
    }

    /// Top-level PostgREST query parameter
    pub fn to_param(&self) -> (String, String) {
        match self {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{}", plain(value))),
            Filter::ILike(column, term) => (column.clone(), format!("ilike.{}", like_pattern(term))),
            Filter::Gte(column, value) => (column.clone(), format!("gte.{}", plain(value))),
            Filter::Lte(column, value) => (column.clone(), format!("lte.{}", plain(value))),
            Filter::Or(group) => ("or".to_string(), format!("({})", render_group(group))),
        }
    }

    /// Form used inside an `or=(...)` group, where reserved characters must be quoted
    fn render_nested(&self) -> String {
        match self {
            Filter::Eq(column, value) => format!("{}.eq.{}", column, quoted(&plain(value))),
            Filter::ILike(column, term) => {
                format!("{}.ilike.{}", column, quoted(&like_pattern(term)))
            }
            Filter::Gte(column, value) => format!("{}.gte.{}", column, quoted(&plain(value))),
            Filter::Lte(column, value) => format!("{}.lte.{}", column, quoted(&plain(value))),
            Filter::Or(group) => format!("or({})", render_group(group)),
        }
    }
}

fn render_group(group: &[Filter]) -> String {
    group
        .iter()
        .map(Filter::render_nested)
        .collect::<Vec<_>>()
        .join(",")
}

/// `%term%` with LIKE wildcards in the term escaped, so the server matches it literally
fn like_pattern(term: &str) -> String {
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

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quoted(raw: &str) -> String {
    if raw.chars().any(|c| matches!(c, ',' | '.' | ':' | '(' | ')' | '"' | '\\')) {
        format!("\"{}\"", raw.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        raw.to_string()
    }
}

/// Orders two JSON scalars; numbers numerically, strings lexically
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Sort directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: true,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }

    fn render(&self) -> String {
        format!("{}.{}", self.column, if self.ascending { "asc" } else { "desc" })
    }
}

/// Inclusive row window `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: usize,
    pub to: usize,
}

impl RowRange {
    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.to - self.from + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to < self.from
    }
}

/// Select against one table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub selection: Selection,
    pub filters: Vec<Filter>,
    pub order: Vec<Order>,
    pub range: Option<RowRange>,
    pub limit: Option<usize>,
    /// Ask the backend for the total number of matching rows
    pub count: bool,
}

impl Query {
    pub fn select(selection: Selection) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::eq(column, value))
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    pub fn range(mut self, from: usize, to: usize) -> Self {
        self.range = Some(RowRange { from, to });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn exact_count(mut self) -> Self {
        self.count = true;
        self
    }

    /// PostgREST query string parameters
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.selection.render())];
        params.extend(self.filters.iter().map(Filter::to_param));

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(Order::render)
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        match (self.range, self.limit) {
            (Some(range), _) => {
                params.push(("offset".to_string(), range.from.to_string()));
                params.push(("limit".to_string(), range.len().to_string()));
            }
            (None, Some(limit)) => params.push(("limit".to_string(), limit.to_string())),
            (None, None) => {}
        }

        params
    }
}

/// Rows returned by a select, plus the exact total when it was requested
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rows {
    pub rows: Vec<Value>,
    pub total: Option<u64>,
}

/// Identity as known to the auth service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Bearer-token session issued on sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: AuthUser,
}

/// Sign-up result; the session is absent when the account awaits confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct SignUp {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

/// Decode every row into `T`
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
        .collect()
}

/// Decode the first row, failing with not-found when there is none
pub fn decode_single<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<T> {
    let row = rows.into_iter().next().ok_or_else(|| not_found(what))?;
    Ok(serde_json::from_value(row)?)
}
