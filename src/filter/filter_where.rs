use serde_json::Value;

use super::error::FilterError;
use super::types::{is_valid_identifier, FilterOp, FilterWhereInfo};

/// Translates a where document into a parameterised SQL predicate.
/// Placeholders are numbered from `starting_param_index + 1` so nested
/// `$and` / `$or` / `$not` groups share one parameter list.
pub struct FilterWhere {
    param_values: Vec<Value>,
    starting_param_index: usize,
}

impl FilterWhere {
    fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let clause = filter_where.build(where_data)?;
        Ok((clause, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let conditions = match where_data {
            Value::Null => vec![],
            Value::Object(obj) => {
                let mut parts = Vec::new();
                for (key, value) in obj {
                    if key.starts_with('$') {
                        parts.push(self.logical(key, value)?);
                    } else {
                        for info in Self::field_conditions(key, value)? {
                            parts.push(self.condition_sql(&info)?);
                        }
                    }
                }
                parts
            }
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        Ok(if conditions.is_empty() { "1=1".to_string() } else { conditions.join(" AND ") })
    }

    fn logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    return Ok(if op == "$and" { "1=1" } else { "1=0" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    let nested = self.build(v)?;
                    sql_parts.push(format!("({})", nested));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => {
                let nested = self.build(value)?;
                Ok(format!("NOT ({})", nested))
            }
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn field_conditions(field: &str, value: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        if !is_valid_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => obj
                .iter()
                .map(|(op_key, op_val)| {
                    Ok(FilterWhereInfo {
                        column: field.to_string(),
                        operator: Self::map_operator(op_key)?,
                        data: op_val.clone(),
                    })
                })
                .collect(),
            // Implicit equality: { field: value }
            _ => Ok(vec![FilterWhereInfo {
                column: field.to_string(),
                operator: FilterOp::Eq,
                data: value.clone(),
            }]),
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            "$null" => FilterOp::Null,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn condition_sql(&mut self, condition: &FilterWhereInfo) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", condition.column);
        let data = &condition.data;
        Ok(match condition.operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(data.clone())),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Ne => format!("{} IS DISTINCT FROM {}", quoted_column, self.param(data.clone())),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(data.clone())),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(data.clone())),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(data.clone())),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(data.clone())),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.param(data.clone())),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.param(data.clone())),
            FilterOp::In | FilterOp::NIn => {
                let negate = condition.operator == FilterOp::NIn;
                match data {
                    Value::Array(values) if values.is_empty() => {
                        if negate { "1=1".to_string() } else { "1=0".to_string() }
                    }
                    Value::Array(values) => {
                        let params: Vec<String> = values.iter().map(|v| self.param(v.clone())).collect();
                        let op = if negate { "NOT IN" } else { "IN" };
                        format!("{} {} ({})", quoted_column, op, params.join(", "))
                    }
                    other => {
                        let op = if negate { "<>" } else { "=" };
                        format!("{} {} {}", quoted_column, op, self.param(other.clone()))
                    }
                }
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => format!(
                    "{} BETWEEN {} AND {}",
                    quoted_column,
                    self.param(values[0].clone()),
                    self.param(values[1].clone())
                ),
                _ => {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ))
                }
            },
            FilterOp::Null => match data.as_bool() {
                Some(true) => format!("{} IS NULL", quoted_column),
                Some(false) => format!("{} IS NOT NULL", quoted_column),
                None => return Err(FilterError::InvalidOperatorData("$null requires boolean".to_string())),
            },
        })
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        format!("${}", self.starting_param_index + self.param_values.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_and_null() {
        let (sql, params) = FilterWhere::generate(&json!({"status": "draft", "tenant_id": null}), 0).unwrap();
        assert_eq!(sql, "\"status\" = $1 AND \"tenant_id\" IS NULL");
        assert_eq!(params, vec![json!("draft")]);
    }

    #[test]
    fn nested_groups_share_numbering() {
        let where_data = json!({
            "owner_id": "abc",
            "$or": [
                {"name": {"$ilike": "%ana%"}},
                {"email": {"$ilike": "%ana%"}}
            ]
        });
        // keys are visited in sorted order, so the $or group is numbered first
        let (sql, params) = FilterWhere::generate(&where_data, 0).unwrap();
        assert!(sql.contains("\"name\" ILIKE $1"), "{}", sql);
        assert!(sql.contains("\"email\" ILIKE $2"), "{}", sql);
        assert!(sql.contains("\"owner_id\" = $3"), "{}", sql);
        assert_eq!(params.len(), 3);

        let (sql, _) = FilterWhere::generate(&json!({"status": "active"}), 4).unwrap();
        assert_eq!(sql, "\"status\" = $5");
    }

    #[test]
    fn in_expands_and_empty_in_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({"status": {"$in": ["active", "ending_soon"]}}), 0).unwrap();
        assert_eq!(sql, "\"status\" IN ($1, $2)");
        assert_eq!(params.len(), 2);

        let (sql, _) = FilterWhere::generate(&json!({"id": {"$in": []}}), 0).unwrap();
        assert_eq!(sql, "1=0");
    }

    #[test]
    fn range_operators_on_one_column() {
        let (sql, _) = FilterWhere::generate(&json!({"price_per_week": {"$gte": 200, "$lte": 400}}), 0).unwrap();
        assert!(sql.contains("\"price_per_week\" >= $1"));
        assert!(sql.contains("\"price_per_week\" <= $2"));
    }

    #[test]
    fn rejects_bad_columns_and_operators() {
        assert!(matches!(
            FilterWhere::generate(&json!({"name; drop table": 1}), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({"name": {"$regex": "x"}}), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }
}
