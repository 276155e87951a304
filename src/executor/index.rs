use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    storage::heap::ScannedRow,
    types::{error::DatabaseError, record::Record, value::Value, RowId},
};

/// One column index: distinct value → row ids. Kept as an association list
/// so lookups use exactly the value equality a scan filter uses, including
/// cross-type numeric coercion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableIndex {
    pub table: String,
    pub column: String,
    entries: Vec<(Value, Vec<RowId>)>,
}

impl TableIndex {
    /// Build from a full table scan. Rows without the column are indexed
    /// under Null, matching how predicates treat missing fields.
    pub fn build(table: impl Into<String>, column: impl Into<String>, rows: &[ScannedRow]) -> Self {
        let mut index = Self {
            table: table.into(),
            column: column.into(),
            entries: Vec::new(),
        };
        for row in rows {
            let value = row.record.get(&index.column).cloned();
            index.add(value, row.row_id);
        }
        index
    }

    pub fn lookup(&self, value: &Value) -> HashSet<RowId> {
        self.entries
            .iter()
            .filter(|(candidate, _)| candidate == value)
            .flat_map(|(_, row_ids)| row_ids.iter().copied())
            .collect()
    }

    pub fn add(&mut self, value: Option<Value>, row_id: RowId) {
        let value = value.unwrap_or(Value::Null);
        match self.entries.iter_mut().find(|(candidate, _)| *candidate == value) {
            Some((_, row_ids)) => {
                if !row_ids.contains(&row_id) {
                    row_ids.push(row_id);
                }
            }
            None => self.entries.push((value, vec![row_id])),
        }
    }

    pub fn remove(&mut self, value: Option<&Value>, row_id: RowId) {
        let value = value.unwrap_or(&Value::Null);
        for (candidate, row_ids) in &mut self.entries {
            if candidate == value {
                row_ids.retain(|id| *id != row_id);
            }
        }
        self.entries.retain(|(_, row_ids)| !row_ids.is_empty());
    }

    pub fn snapshot(&self) -> Result<String, DatabaseError> {
        serde_json::to_string(&self.entries).map_err(|e| DatabaseError::SerializationError {
            details: format!("failed to serialize index snapshot: {}", e),
        })
    }

    pub fn from_snapshot(
        table: impl Into<String>,
        column: impl Into<String>,
        snapshot: &str,
    ) -> Result<Self, DatabaseError> {
        let entries = serde_json::from_str(snapshot).map_err(|e| {
            DatabaseError::SerializationError {
                details: format!("failed to parse index snapshot: {}", e),
            }
        })?;
        Ok(Self {
            table: table.into(),
            column: column.into(),
            entries,
        })
    }
}

/// All loaded indexes. Advisory: absence never affects correctness, only
/// whether an equality predicate can skip the full scan.
#[derive(Debug, Default)]
pub struct IndexManager {
    indexes: Vec<TableIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, table: &str, column: &str) -> Option<&TableIndex> {
        self.indexes
            .iter()
            .find(|index| index.table == table && index.column == column)
    }

    pub fn add(&mut self, index: TableIndex) -> Result<(), DatabaseError> {
        if self.find(&index.table, &index.column).is_some() {
            return Err(DatabaseError::IndexExists {
                table: index.table,
                column: index.column,
            });
        }
        self.indexes.push(index);
        Ok(())
    }

    /// Restore a persisted index without duplicate checking, used on open.
    pub fn restore(&mut self, index: TableIndex) {
        self.indexes.push(index);
    }

    pub fn drop_table(&mut self, table: &str) {
        self.indexes.retain(|index| index.table != table);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableIndex> {
        self.indexes.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn record_inserted(&mut self, table: &str, record: &Record, row_id: RowId) {
        for index in self.for_table_mut(table) {
            let value = record.get(&index.column).cloned();
            index.add(value, row_id);
        }
    }

    pub fn record_updated(
        &mut self,
        table: &str,
        old: &Record,
        old_row_id: RowId,
        new: &Record,
        new_row_id: RowId,
    ) {
        for index in self.for_table_mut(table) {
            let old_value = old.get(&index.column).cloned();
            let new_value = new.get(&index.column).cloned();
            index.remove(old_value.as_ref(), old_row_id);
            index.add(new_value, new_row_id);
        }
    }

    pub fn record_deleted(&mut self, table: &str, record: &Record, row_id: RowId) {
        for index in self.for_table_mut(table) {
            let value = record.get(&index.column).cloned();
            index.remove(value.as_ref(), row_id);
        }
    }

    fn for_table_mut<'a>(&'a mut self, table: &'a str) -> impl Iterator<Item = &'a mut TableIndex> + 'a {
        self.indexes
            .iter_mut()
            .filter(move |index| index.table == table)
    }
}
