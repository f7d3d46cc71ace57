use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
    #[serde(rename = "$ne")] Ne,
    #[serde(rename = "$gt")] Gt,
    #[serde(rename = "$gte")] Gte,
    #[serde(rename = "$lt")] Lt,
    #[serde(rename = "$lte")] Lte,

    #[serde(rename = "$like")] Like,
    #[serde(rename = "$ilike")] ILike,
    #[serde(rename = "$regex")] Regex,
    #[serde(rename = "$iregex")] IRegex,

    #[serde(rename = "$in")] In,
    #[serde(rename = "$nin")] NIn,

    #[serde(rename = "$between")] Between,
}

impl FilterOp {
    pub fn parse(op_key: &str) -> Option<Self> {
        Some(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$regex" => FilterOp::Regex,
            "$iregex" => FilterOp::IRegex,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    pub select: Option<Vec<String>>,
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Bound with the column type its JSON shape suggests.
    Value(serde_json::Value),
    /// LIKE or regex pattern; always bound as text.
    Pattern(String),
}

#[derive(Debug, Clone)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<SqlParam>,
}

/// True for plain `[A-Za-z_][A-Za-z0-9_]*` identifiers.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
