use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{self, FromRow, PgPool, Row};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::filter::{Filter, FilterData, SqlResult};

/// Binds filter parameters onto a `query` or `query_as` with Postgres types
macro_rules! bind_params {
    ($query:expr, $params:expr) => {{
        let mut q = $query;
        for p in $params.iter() {
            q = match TypedParam::from(p) {
                TypedParam::Null => q.bind(Option::<String>::None),
                TypedParam::Bool(b) => q.bind(b),
                TypedParam::Int(i) => q.bind(i),
                TypedParam::Decimal(d) => q.bind(d),
                TypedParam::Uuid(u) => q.bind(u),
                TypedParam::Timestamp(t) => q.bind(t),
                TypedParam::Text(s) => q.bind(s),
                TypedParam::Json(v) => q.bind(v),
            };
        }
        q
    }};
}

pub struct QueryBuilder<T> {
    table_name: String,
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, DatabaseError> {
        let table_name = table_name.into();
        let filter = Filter::new(&table_name).map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(Self {
            table_name,
            filter,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, DatabaseError> {
        self.filter
            .assign(filter_data)
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, DatabaseError> {
        let sql_result = self.sql_result()?;
        let q = bind_params!(sqlx::query_as::<_, T>(&sql_result.query), &sql_result.params);
        let rows = q.fetch_all(pool).await?;
        Ok(rows)
    }

    pub async fn select_optional(self, pool: &PgPool) -> Result<Option<T>, DatabaseError> {
        let mut rows = self.select_all(pool).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, DatabaseError> {
        let sql_result = self
            .filter
            .to_count_sql()
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        tracing::debug!(table = %self.table_name, sql = %sql_result.query, "count query");

        let q = bind_params!(sqlx::query(&sql_result.query), &sql_result.params);
        let row = q.fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }

    fn sql_result(&self) -> Result<SqlResult, DatabaseError> {
        let sql_result = self
            .filter
            .to_sql()
            .map_err(|e| DatabaseError::QueryError(e.to_string()))?;
        tracing::debug!(table = %self.table_name, sql = %sql_result.query, "select query");
        Ok(sql_result)
    }
}

/// Postgres-typed view of a JSON filter parameter. Strings that parse as a UUID or an
/// RFC 3339 timestamp are bound with that type so they compare against `uuid` and
/// `timestamptz` columns; fractional numbers bind as `numeric`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypedParam {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Text(String),
    Json(Value),
}

impl From<&Value> for TypedParam {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => TypedParam::Null,
            Value::Bool(b) => TypedParam::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    TypedParam::Int(i)
                } else if let Some(d) = n.as_f64().and_then(|f| Decimal::try_from(f).ok()) {
                    TypedParam::Decimal(d)
                } else {
                    TypedParam::Text(n.to_string())
                }
            }
            Value::String(s) => {
                if let Ok(u) = Uuid::parse_str(s) {
                    TypedParam::Uuid(u)
                } else if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                    TypedParam::Timestamp(t.with_timezone(&Utc))
                } else {
                    TypedParam::Text(s.clone())
                }
            }
            // Arrays are expanded by FilterWhere before binding
            Value::Array(_) | Value::Object(_) => TypedParam::Json(v.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_bound_with_their_natural_type() {
        let id = Uuid::new_v4();
        assert_eq!(TypedParam::from(&json!(id.to_string())), TypedParam::Uuid(id));
        assert!(matches!(
            TypedParam::from(&json!("2025-01-01T00:00:00Z")),
            TypedParam::Timestamp(_)
        ));
        assert_eq!(TypedParam::from(&json!("published")), TypedParam::Text("published".into()));
    }

    #[test]
    fn numbers_split_into_int_and_decimal() {
        assert_eq!(TypedParam::from(&json!(42)), TypedParam::Int(42));
        assert!(matches!(TypedParam::from(&json!(349.5)), TypedParam::Decimal(_)));
        assert_eq!(TypedParam::from(&json!(null)), TypedParam::Null);
    }
}
