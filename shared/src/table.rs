//! Tabular view engine
//!
//! Every dashboard page renders its rows through [`project`]: a global
//! search, then per-column filters, then an optional single-key sort. The
//! projection is recomputed from scratch on each call; tables here hold
//! hundreds of rows, not millions.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Filter value meaning "no filter" for select-style column filters
pub const ALL_FILTER: &str = "all";

/// A single typed cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// String form used for searching and display. `None` for nulls.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Decimal(d) => Some(d.normalize().to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CellValue::Int(i) => Some(Decimal::from(*i)),
            CellValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Case-insensitive substring match; `needle` must already be lowercase.
    pub fn contains_ci(&self, needle: &str) -> bool {
        self.as_text()
            .map(|text| text.to_lowercase().contains(needle))
            .unwrap_or(false)
    }

    // Int and Decimal share a rank so they compare numerically
    fn kind_rank(&self) -> u8 {
        match self {
            CellValue::Null => 0,
            CellValue::Bool(_) => 1,
            CellValue::Int(_) | CellValue::Decimal(_) => 2,
            CellValue::Date(_) => 3,
            CellValue::Text(_) => 4,
        }
    }

    /// Total order: values of different kinds order by kind
    /// (null, bool, number, date, text), then by value within a kind.
    pub fn natural_cmp(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Int(a), CellValue::Int(b)) => a.cmp(b),
            (CellValue::Bool(a), CellValue::Bool(b)) => a.cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Date(a), CellValue::Date(b)) => a.cmp(b),
            (a, b) => match (a.as_decimal(), b.as_decimal()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => a.kind_rank().cmp(&b.kind_rank()),
            },
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Int(i)
                } else {
                    n.to_string()
                        .parse::<Decimal>()
                        .ok()
                        .or_else(|| n.as_f64().and_then(Decimal::from_f64_retain))
                        .map_or(CellValue::Null, CellValue::Decimal)
                }
            }
            Value::String(s) => CellValue::Text(s.clone()),
            other => CellValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(*b),
            CellValue::Int(i) => Value::from(*i),
            CellValue::Decimal(d) => d
                .normalize()
                .to_string()
                .parse::<serde_json::Number>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(d.to_string())),
            CellValue::Text(s) => Value::String(s.clone()),
            CellValue::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text().unwrap_or_default())
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int(v.into())
    }
}

impl From<Decimal> for CellValue {
    fn from(v: Decimal) -> Self {
        CellValue::Decimal(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Text(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Text(v.to_string())
    }
}

impl From<NaiveDate> for CellValue {
    fn from(v: NaiveDate) -> Self {
        CellValue::Date(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Null, Into::into)
    }
}

/// Anything the view engine can display. Unknown keys yield `CellValue::Null`.
pub trait TableRow {
    fn cell(&self, key: &str) -> CellValue;
}

impl<T: TableRow + ?Sized> TableRow for &T {
    fn cell(&self, key: &str) -> CellValue {
        (**self).cell(key)
    }
}

/// Dynamically shaped row, for data that arrives as JSON objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(BTreeMap<String, CellValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<CellValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builds a row from a JSON object; `None` for any other JSON value
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(Self(
            object
                .iter()
                .map(|(k, v)| (k.clone(), CellValue::from_json(v)))
                .collect(),
        ))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    }
}

impl TableRow for Row {
    fn cell(&self, key: &str) -> CellValue {
        self.0.get(key).cloned().unwrap_or(CellValue::Null)
    }
}

/// Option of a select-style column filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// How a filterable column is filtered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    Text,
    Select { options: Vec<FilterOption> },
}

/// Display strategy for a column's cells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Render {
    #[default]
    Plain,
    /// `$` followed by the amount with a fixed number of decimals; nulls show as zero
    Currency { decimals: u32 },
    /// `#` followed by the value, `-` for nulls
    Id,
    /// `Yes` for true, `-` otherwise
    Flag,
    /// `-` for nulls and empty text
    DashIfEmpty,
}

impl Render {
    pub fn apply(&self, value: &CellValue) -> String {
        match self {
            Render::Plain => value.as_text().unwrap_or_default(),
            Render::Currency { decimals } => {
                let amount = match value {
                    CellValue::Int(i) => Decimal::from(*i),
                    CellValue::Decimal(d) => *d,
                    _ => Decimal::ZERO,
                };
                format!("${:.*}", *decimals as usize, amount.round_dp(*decimals))
            }
            Render::Id => match value.as_text() {
                Some(text) => format!("#{}", text),
                None => "-".to_string(),
            },
            Render::Flag => {
                if matches!(value, CellValue::Bool(true)) {
                    "Yes".to_string()
                } else {
                    "-".to_string()
                }
            }
            Render::DashIfEmpty => match value.as_text() {
                Some(text) if !text.is_empty() => text,
                _ => "-".to_string(),
            },
        }
    }
}

/// Column descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub filter: FilterKind,
    #[serde(default)]
    pub render: Render,
}

impl Column {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: false,
            filterable: false,
            filter: FilterKind::Text,
            render: Render::Plain,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn select(mut self, options: Vec<FilterOption>) -> Self {
        self.filterable = true;
        self.filter = FilterKind::Select { options };
        self
    }

    pub fn render(mut self, render: Render) -> Self {
        self.render = render;
        self
    }

    pub fn display<R: TableRow>(&self, row: &R) -> String {
        self.render.apply(&row.cell(&self.key))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: String,
    pub direction: SortDirection,
}

/// Search, filter and sort inputs of one table view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub sort: Option<SortState>,
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = term.into();
        self
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_filter(key, value);
        self
    }

    pub fn sorted_by(mut self, key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortState {
            key: key.into(),
            direction,
        });
        self
    }

    pub fn set_filter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
    }

    /// Column header click: ascending flips to descending on the same column,
    /// everything else starts ascending.
    pub fn toggle_sort(&mut self, key: &str) {
        let direction = match &self.sort {
            Some(s) if s.key == key && s.direction == SortDirection::Asc => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        self.sort = Some(SortState {
            key: key.to_string(),
            direction,
        });
    }
}

fn is_active_filter(value: &str) -> bool {
    !value.is_empty() && value != ALL_FILTER
}

fn sort_order(a: &CellValue, b: &CellValue, direction: SortDirection) -> Ordering {
    let asc = direction == SortDirection::Asc;
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if asc {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if asc {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {
            let order = a.natural_cmp(b);
            if asc {
                order
            } else {
                order.reverse()
            }
        }
    }
}

/// Filters and sorts `rows` for display. Ties keep their input order.
pub fn project<'a, R: TableRow>(columns: &[Column], rows: &'a [R], query: &TableQuery) -> Vec<&'a R> {
    let mut visible: Vec<&R> = rows.iter().collect();

    if !query.search.is_empty() {
        let term = query.search.to_lowercase();
        visible.retain(|row| columns.iter().any(|c| row.cell(&c.key).contains_ci(&term)));
    }

    for (key, value) in query.filters.iter().filter(|(_, v)| is_active_filter(v)) {
        let needle = value.to_lowercase();
        visible.retain(|row| row.cell(key).contains_ci(&needle));
    }

    if let Some(sort) = &query.sort {
        visible.sort_by(|a, b| sort_order(&a.cell(&sort.key), &b.cell(&sort.key), sort.direction));
    }

    visible
}

/// Rendered text of every column for one row
pub fn render_row<R: TableRow>(columns: &[Column], row: &R) -> Vec<String> {
    columns.iter().map(|c| c.display(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn columns() -> Vec<Column> {
        vec![
            Column::new("id", "ID").sortable(),
            Column::new("sku", "SKU").sortable().filterable(),
            Column::new("kind", "Type").select(vec![
                FilterOption::new("base", "Base"),
                FilterOption::new("kit", "Kit"),
            ]),
            Column::new("cost", "Cost").sortable().render(Render::Currency { decimals: 2 }),
        ]
    }

    fn rows() -> Vec<Row> {
        vec![
            Row::new().with("id", 1).with("sku", "A1").with("kind", "base").with("cost", dec("2.50")),
            Row::new().with("id", 2).with("sku", "K1").with("kind", "kit").with("cost", dec("7.50")),
            Row::new().with("id", 3).with("sku", "b2").with("kind", "base").with("cost", CellValue::Null),
        ]
    }

    fn ids(projected: &[&Row]) -> Vec<i64> {
        projected
            .iter()
            .map(|r| match r.cell("id") {
                CellValue::Int(i) => i,
                other => panic!("unexpected id {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_empty_query_keeps_everything_in_order() {
        let rows = rows();
        assert_eq!(ids(&project(&columns(), &rows, &TableQuery::new())), vec![1, 2, 3]);
    }

    #[test]
    fn test_global_search_is_case_insensitive() {
        let rows = rows();
        let q = TableQuery::new().with_search("B2");
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![3]);
    }

    #[test]
    fn test_global_search_only_looks_at_columns() {
        let rows = vec![Row::new().with("id", 1).with("hidden", "needle")];
        let q = TableQuery::new().with_search("needle");
        assert!(project(&columns(), &rows, &q).is_empty());
    }

    #[test]
    fn test_search_matches_normalized_decimals() {
        let rows = rows();
        let q = TableQuery::new().with_search("7.5");
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![2]);
    }

    #[test]
    fn test_column_filter_all_is_no_filter() {
        let rows = rows();
        let q = TableQuery::new().with_filter("kind", ALL_FILTER);
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![1, 2, 3]);
        let q = TableQuery::new().with_filter("kind", "kit");
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![2]);
    }

    #[test]
    fn test_column_filters_combine() {
        let rows = rows();
        let q = TableQuery::new().with_filter("kind", "base").with_filter("sku", "a");
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![1]);
    }

    #[test]
    fn test_nulls_first_ascending_last_descending() {
        let rows = rows();
        let asc = TableQuery::new().sorted_by("cost", SortDirection::Asc);
        assert_eq!(ids(&project(&columns(), &rows, &asc)), vec![3, 1, 2]);
        let desc = TableQuery::new().sorted_by("cost", SortDirection::Desc);
        assert_eq!(ids(&project(&columns(), &rows, &desc)), vec![2, 1, 3]);
    }

    #[test]
    fn test_sort_ints_against_decimals() {
        let rows = vec![
            Row::new().with("id", 1).with("cost", dec("10.5")),
            Row::new().with("id", 2).with("cost", 3i64),
        ];
        let q = TableQuery::new().sorted_by("cost", SortDirection::Asc);
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![2, 1]);
    }

    #[test]
    fn test_sort_mixed_kinds_groups_numbers_before_text() {
        let rows = vec![
            Row::new().with("id", 1).with("cost", "5"),
            Row::new().with("id", 2).with("cost", 10i64),
            Row::new().with("id", 3).with("cost", 9i64),
            Row::new().with("id", 4).with("cost", "10"),
        ];
        let q = TableQuery::new().sorted_by("cost", SortDirection::Asc);
        assert_eq!(ids(&project(&columns(), &rows, &q)), vec![3, 2, 4, 1]);

        assert_eq!(CellValue::Int(9).natural_cmp(&CellValue::Text("5".into())), Ordering::Less);
        assert_eq!(CellValue::Bool(true).natural_cmp(&CellValue::Int(0)), Ordering::Less);
    }

    #[test]
    fn test_toggle_sort() {
        let mut q = TableQuery::new();
        q.toggle_sort("sku");
        assert_eq!(q.sort.as_ref().unwrap().direction, SortDirection::Asc);
        q.toggle_sort("sku");
        assert_eq!(q.sort.as_ref().unwrap().direction, SortDirection::Desc);
        q.toggle_sort("sku");
        assert_eq!(q.sort.as_ref().unwrap().direction, SortDirection::Asc);
        q.toggle_sort("sku");
        q.toggle_sort("id");
        assert_eq!(
            q.sort,
            Some(SortState {
                key: "id".into(),
                direction: SortDirection::Asc
            })
        );
    }

    #[test]
    fn test_render_strategies() {
        assert_eq!(Render::Currency { decimals: 2 }.apply(&dec("2.5").into()), "$2.50");
        assert_eq!(Render::Currency { decimals: 4 }.apply(&CellValue::Null), "$0.0000");
        assert_eq!(Render::Id.apply(&CellValue::Int(12)), "#12");
        assert_eq!(Render::Id.apply(&CellValue::Null), "-");
        assert_eq!(Render::Flag.apply(&CellValue::Bool(true)), "Yes");
        assert_eq!(Render::Flag.apply(&CellValue::Bool(false)), "-");
        assert_eq!(Render::DashIfEmpty.apply(&"".into()), "-");
        assert_eq!(Render::Plain.apply(&CellValue::Null), "");
    }

    #[test]
    fn test_row_from_json() {
        let row = Row::from_json(&serde_json::json!({ "id": 4, "cost": 1.25, "gift": true })).unwrap();
        assert_eq!(row.cell("id"), CellValue::Int(4));
        assert_eq!(row.cell("cost"), CellValue::Decimal(dec("1.25")));
        assert_eq!(row.cell("missing"), CellValue::Null);
        assert!(Row::from_json(&serde_json::json!([1, 2])).is_none());
    }

    #[test]
    fn test_column_deserializes_with_defaults() {
        let c: Column = serde_json::from_str(r#"{ "key": "vendor", "label": "Vendor" }"#).unwrap();
        assert!(!c.sortable);
        assert_eq!(c.render, Render::Plain);
        let c: Column = serde_json::from_str(
            r#"{ "key": "is_gift", "label": "Gift?", "filterable": true,
                 "filter": { "type": "select", "options": [{ "value": "true", "label": "Yes" }] },
                 "render": { "type": "flag" } }"#,
        )
        .unwrap();
        assert!(matches!(c.filter, FilterKind::Select { ref options } if options.len() == 1));
        assert_eq!(c.render, Render::Flag);
    }
}
