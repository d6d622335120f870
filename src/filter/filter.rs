use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{is_valid_identifier, FilterData, FilterOrderInfo, SqlResult};

pub struct Filter {
    table_name: String,
    select_columns: Vec<String>,
    where_data: Option<Value>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        if !is_valid_identifier(&table_name) {
            return Err(FilterError::InvalidTableName(table_name));
        }
        Ok(Self {
            table_name,
            select_columns: vec![],
            where_data: None,
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(select) = data.select { self.select(select)?; }
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        if data.limit.is_some() || data.offset.is_some() { self.limit(data.limit, data.offset)?; }
        Ok(self)
    }

    pub fn select(&mut self, columns: Vec<String>) -> Result<&mut Self, FilterError> {
        for column in &columns {
            if column != "*" && !is_valid_identifier(column) {
                return Err(FilterError::InvalidColumn(column.clone()));
            }
        }
        self.select_columns = columns;
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(conditions);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: Option<i32>, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if let Some(l) = limit {
            if l < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        }
        if let Some(off) = offset {
            if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); }
        }

        // Apply max limit from config
        let max_limit = crate::config::CONFIG.api.max_limit.unwrap_or(i32::MAX);
        self.limit = limit.map(|l| {
            if l > max_limit {
                tracing::debug!("Limit {} exceeds max {}, capping to max", l, max_limit);
                max_limit
            } else {
                l
            }
        });
        self.offset = offset;
        Ok(self)
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        let order_clause = FilterOrder::generate(&self.order_data);
        let limit_clause = self.build_limit_clause();

        let query = [
            format!("SELECT {}", self.build_select_clause()),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_result.query),
            order_clause,
            limit_clause,
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        Ok(SqlResult { query, params: where_result.params })
    }

    pub fn to_where_sql(&self) -> Result<SqlResult, FilterError> {
        let (query, params) = match self.where_data {
            Some(ref where_data) => FilterWhere::generate(where_data, 0)?,
            None => ("1=1".to_string(), vec![]),
        };
        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let where_result = self.to_where_sql()?;
        Ok(SqlResult {
            query: format!("SELECT COUNT(*) as count FROM \"{}\" WHERE {}", self.table_name, where_result.query),
            params: where_result.params,
        })
    }

    fn build_select_clause(&self) -> String {
        if self.select_columns.is_empty() || self.select_columns.iter().any(|c| c == "*") {
            "*".to_string()
        } else {
            self.select_columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>().join(", ")
        }
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_full_select() {
        let mut filter = Filter::new("contracts").unwrap();
        filter
            .assign(
                FilterData::with_where(json!({"listing_id": "l1", "status": {"$in": ["draft", "active"]}}))
                    .order_by("created_at desc")
                    .page(Some(10), Some(20)),
            )
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert_eq!(
            sql.query,
            "SELECT * FROM \"contracts\" WHERE \"listing_id\" = $1 AND \"status\" IN ($2, $3) ORDER BY \"created_at\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(sql.params.len(), 3);
    }

    #[test]
    fn count_ignores_order_and_paging() {
        let mut filter = Filter::new("tenants").unwrap();
        filter
            .assign(FilterData::with_where(json!({"owner_id": "o1"})).order_by("name").page(Some(5), None))
            .unwrap();
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) as count FROM \"tenants\" WHERE \"owner_id\" = $1");
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(Filter::new("bad-name").is_err());
        let mut filter = Filter::new("leads").unwrap();
        assert!(filter.order(json!("created_at; drop")).is_err());
        assert!(filter.select(vec!["1bad".to_string()]).is_err());
    }
}
