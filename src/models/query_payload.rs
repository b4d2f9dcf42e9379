use crate::models::severity::Severity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIMIT: u64 = 20;

/// A single comparison in a `where` tree, optionally chained to further clauses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub condition: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and: Option<Box<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or: Option<Box<Condition>>,
}

impl Condition {
    pub fn equals(column: &str, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            condition: "=".to_string(),
            value: value.into(),
            and: None,
            or: None,
        }
    }

    /// `1 = 1`, so filters can always be attached with `and`
    pub fn always_true() -> Self {
        Self::equals("1", "1")
    }

    pub fn and(mut self, other: Condition) -> Self {
        self.and = Some(Box::new(other));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    pub direction: SortDirection,
}

/// Filter applied to an audit listing
#[derive(Debug, Clone, PartialEq)]
pub enum AuditFilter {
    Source(String),
    Severity(Severity),
}

impl AuditFilter {
    fn into_condition(self) -> Condition {
        match self {
            AuditFilter::Source(code) => Condition::equals("code", code),
            AuditFilter::Severity(severity) => Condition::equals("level", severity.index()),
        }
    }
}

/// Query sent to storage alongside a table name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPayload {
    #[serde(rename = "where")]
    pub filter: Condition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl QueryPayload {
    /// Newest entries first, `limit` falling back to [`DEFAULT_LIMIT`]
    pub fn audit_listing(filter: Option<AuditFilter>, limit: Option<u64>, skip: Option<u64>) -> Self {
        let mut condition = Condition::always_true();
        if let Some(filter) = filter {
            condition = condition.and(filter.into_condition());
        }

        Self {
            filter: condition,
            sort: Some(Sort {
                column: "ts".to_string(),
                direction: SortDirection::Desc,
            }),
            limit: Some(limit.unwrap_or(DEFAULT_LIMIT)),
            skip,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
