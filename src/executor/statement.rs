use serde::{Deserialize, Serialize};

use crate::{
    executor::predicate::Criteria,
    types::{record::Record, value::Value, RowId},
};

/// Parsed operation descriptors, the interface consumed from the external
/// query parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    CreateTable(CreateTableStatement),
    DropTable(DropTableStatement),
    Insert(InsertStatement),
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
    CreateIndex(CreateIndexStatement),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableStatement {
    pub name: String,
    #[serde(default)]
    pub is_system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropTableStatement {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertStatement {
    pub table: String,
    pub data: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    pub table: String,
    pub columns: Projection,
    pub criteria: Option<Criteria>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl SelectStatement {
    /// `SELECT * FROM table` with no filtering.
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Projection::All,
            criteria: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }
}

/// Unlike SELECT, the criteria is mandatory: a descriptor without one is
/// malformed, not a whole-table update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatement {
    pub table: String,
    pub updates: Vec<Assignment>,
    pub criteria: Criteria,
}

/// Unlike SELECT, the criteria is mandatory: a descriptor without one is
/// malformed, not a whole-table delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatement {
    pub table: String,
    pub criteria: Criteria,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndexStatement {
    pub table: String,
    pub column: String,
}

/// Requested output shape of a SELECT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// `*`: the whole record.
    All,
    Columns(Vec<String>),
    Aggregate(AggregateExpression),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateExpression {
    pub function: AggregateFunction,
    /// Column to aggregate over; `*` is accepted for COUNT.
    pub column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

/// Outcome of a single executed statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    TableCreated,
    TableDropped,
    Inserted { row_id: RowId },
    Rows(Vec<Record>),
    Aggregate(Value),
    Updated { count: usize },
    Deleted { count: usize },
    IndexCreated,
}

impl QueryResult {
    /// The rows of a SELECT result, empty for other statement kinds.
    pub fn rows(self) -> Vec<Record> {
        match self {
            QueryResult::Rows(rows) => rows,
            _ => Vec::new(),
        }
    }
}
