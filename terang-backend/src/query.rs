//! Table queries.
//!
//! A [`Query`] is an equality-filtered, optionally ordered selection over
//! one table. It renders to PostgREST query parameters and can also be
//! evaluated directly against JSON rows.

use serde_json::Value;
use std::cmp::Ordering;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Selection over a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    filters: Vec<Filter>,
    order: Option<Order>,
}

impl Query {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order: None,
        }
    }

    /// Keep rows whose `column` equals `value`.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    /// PostgREST parameters: `select=*`, `col=eq.v`, `order=col.dir`.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for filter in &self.filters {
            params.push((filter.column.clone(), format!("eq.{}", scalar(&filter.value))));
        }
        if let Some(order) = &self.order {
            params.push((
                "order".to_string(),
                format!("{}.{}", order.column, order.direction.as_str()),
            ));
        }
        params
    }

    /// True when `row` passes every filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|f| row.get(&f.column).is_some_and(|v| v == &f.value))
    }

    /// Filter and order `rows` in place.
    pub fn apply(&self, rows: &mut Vec<Value>) {
        rows.retain(|row| self.matches(row));
        if let Some(order) = &self.order {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Total order over JSON scalars: nulls last, then numbers, then strings.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_postgrest_params() {
        let query = Query::table("books")
            .eq("is_published", true)
            .order("created_at", Direction::Desc);

        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_string(), "*".to_string()),
                ("is_published".to_string(), "eq.true".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_apply_filters_and_orders() {
        let mut rows = vec![
            json!({"id": "a", "sort_order": 3, "is_available": true}),
            json!({"id": "b", "sort_order": 1, "is_available": false}),
            json!({"id": "c", "sort_order": 2, "is_available": true}),
        ];
        Query::table("menu_items")
            .eq("is_available", true)
            .order("sort_order", Direction::Asc)
            .apply(&mut rows);

        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["c", "a"]);
    }

    #[test]
    fn test_nulls_sort_last_ascending() {
        let mut rows = vec![json!({"id": "x", "date": null}), json!({"id": "y", "date": "2025-01-01"})];
        Query::table("events")
            .order("date", Direction::Asc)
            .apply(&mut rows);
        assert_eq!(rows[0]["id"], "y");
    }
}
