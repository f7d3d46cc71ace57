use serde_json::Value;

use super::error::FilterError;
use super::types::{is_identifier, FilterOp, SqlParam};

/// Renders a `$`-operator filter document as a parameterised SQL predicate.
pub struct FilterWhere {
    param_values: Vec<SqlParam>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<SqlParam>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        let sql = filter_where.build(where_data)?;
        Ok((sql, filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null | Value::Object(_) => Ok(()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn build(&mut self, where_data: &Value) -> Result<String, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok("1=1".to_string()),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        };

        let mut sql_conditions = vec![];
        for (key, value) in obj {
            if key.starts_with('$') {
                sql_conditions.push(self.build_logical(key, value)?);
            } else {
                sql_conditions.extend(self.build_field(key, value)?);
            }
        }

        Ok(if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") })
    }

    fn build_logical(&mut self, op: &str, value: &Value) -> Result<String, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                if arr.is_empty() {
                    // Empty $or matches nothing, empty $and matches everything
                    return Ok(if op == "$or" { "1=0" } else { "1=1" }.to_string());
                }
                let mut sql_parts = Vec::with_capacity(arr.len());
                for v in arr {
                    sql_parts.push(format!("({})", self.build(v)?));
                }
                let joiner = if op == "$and" { " AND " } else { " OR " };
                Ok(format!("({})", sql_parts.join(joiner)))
            }
            "$not" => Ok(format!("NOT ({})", self.build(value)?)),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn build_field(&mut self, field: &str, value: &Value) -> Result<Vec<String>, FilterError> {
        if !is_identifier(field) {
            return Err(FilterError::InvalidColumn(field.to_string()));
        }

        match value {
            Value::Object(obj) => {
                let mut out = Vec::with_capacity(obj.len());
                for (op_key, op_val) in obj {
                    let operator = FilterOp::parse(op_key)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op_key.clone()))?;
                    out.push(self.build_condition(field, operator, op_val)?);
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![self.build_condition(field, FilterOp::Eq, value)?]),
        }
    }

    fn build_condition(&mut self, column: &str, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        let quoted_column = format!("\"{}\"", column);
        Ok(match operator {
            FilterOp::Eq if data.is_null() => format!("{} IS NULL", quoted_column),
            FilterOp::Ne if data.is_null() => format!("{} IS NOT NULL", quoted_column),
            FilterOp::Eq => format!("{} = {}", quoted_column, self.param(data)),
            FilterOp::Ne => format!("{} <> {}", quoted_column, self.param(data)),
            FilterOp::Gt => format!("{} > {}", quoted_column, self.param(data)),
            FilterOp::Gte => format!("{} >= {}", quoted_column, self.param(data)),
            FilterOp::Lt => format!("{} < {}", quoted_column, self.param(data)),
            FilterOp::Lte => format!("{} <= {}", quoted_column, self.param(data)),
            FilterOp::Like => format!("{} LIKE {}", quoted_column, self.pattern_param(operator, data)?),
            FilterOp::ILike => format!("{} ILIKE {}", quoted_column, self.pattern_param(operator, data)?),
            FilterOp::Regex => format!("{} ~ {}", quoted_column, self.pattern_param(operator, data)?),
            FilterOp::IRegex => format!("{} ~* {}", quoted_column, self.pattern_param(operator, data)?),
            FilterOp::In | FilterOp::NIn => {
                let values = match data {
                    Value::Array(values) => values.as_slice(),
                    other => std::slice::from_ref(other),
                };
                if values.is_empty() {
                    return Ok(if operator == FilterOp::In { "1=0" } else { "1=1" }.to_string());
                }
                let params: Vec<String> = values.iter().map(|v| self.param(v)).collect();
                let keyword = if operator == FilterOp::In { "IN" } else { "NOT IN" };
                format!("{} {} ({})", quoted_column, keyword, params.join(", "))
            }
            FilterOp::Between => match data {
                Value::Array(values) if values.len() == 2 => format!(
                    "{} BETWEEN {} AND {}",
                    quoted_column,
                    self.param(&values[0]),
                    self.param(&values[1])
                ),
                _ => {
                    return Err(FilterError::InvalidOperatorData(
                        "$between requires array with 2 values".to_string(),
                    ))
                }
            },
        })
    }

    /// Pattern operators only take strings, bound as text whatever they look like.
    fn pattern_param(&mut self, operator: FilterOp, data: &Value) -> Result<String, FilterError> {
        match data {
            Value::String(pattern) => Ok(self.push(SqlParam::Pattern(pattern.clone()))),
            _ => Err(FilterError::InvalidOperatorData(format!("{:?} requires a string pattern", operator))),
        }
    }

    fn param(&mut self, value: &Value) -> String {
        self.push(SqlParam::Value(value.clone()))
    }

    fn push(&mut self, param: SqlParam) -> String {
        self.param_values.push(param);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn range_operators_bind_values() {
        let (sql, params) = FilterWhere::generate(&json!({ "total_amount": { "$gte": 100, "$lte": 500 } }), 0).unwrap();
        assert_eq!(sql, "\"total_amount\" >= $1 AND \"total_amount\" <= $2");
        assert_eq!(params, vec![SqlParam::Value(json!(100)), SqlParam::Value(json!(500))]);
    }

    #[test]
    fn nested_or_keeps_parameter_numbering() {
        let filter = json!({
            "order_count": { "$gte": 1 },
            "$or": [
                { "name": { "$iregex": "ann" } },
                { "last_order_id": { "$in": ["a", "b"] } }
            ]
        });
        let (sql, params) = FilterWhere::generate(&filter, 0).unwrap();
        // Keys render in map order, so "$or" comes before "order_count"
        assert!(sql.contains("(\"name\" ~* $1)"), "{}", sql);
        assert!(sql.contains("\"last_order_id\" IN ($2, $3)"), "{}", sql);
        assert!(sql.contains("\"order_count\" >= $4"), "{}", sql);
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], SqlParam::Pattern("ann".to_string()));
    }

    #[test]
    fn empty_in_matches_nothing() {
        let (sql, params) = FilterWhere::generate(&json!({ "id": { "$in": [] } }), 0).unwrap();
        assert_eq!(sql, "1=0");
        assert!(params.is_empty());
    }

    #[test]
    fn unknown_operators_and_columns_are_rejected() {
        assert!(matches!(
            FilterWhere::generate(&json!({ "name": { "$where": "1" } }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "name\" OR 1=1 --": 1 }), 0),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::generate(&json!({ "$where": "1" }), 0),
            Err(FilterError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn regex_requires_string_pattern() {
        assert!(FilterWhere::generate(&json!({ "name": { "$iregex": 5 } }), 0).is_err());
        assert!(FilterWhere::generate(&json!({ "name": { "$like": 5 } }), 0).is_err());
    }

    #[test]
    fn uuid_shaped_patterns_stay_patterns() {
        let hex = "deadbeefdeadbeefdeadbeefdeadbeef";
        let (sql, params) = FilterWhere::generate(&json!({ "name": { "$iregex": hex, "$like": hex } }), 0).unwrap();
        assert_eq!(sql, "\"name\" ~* $1 AND \"name\" LIKE $2");
        assert_eq!(params, vec![SqlParam::Pattern(hex.to_string()), SqlParam::Pattern(hex.to_string())]);
    }
}
