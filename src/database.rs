use std::{
    cmp::Ordering,
    path::{Path, PathBuf},
};

use crate::{
    executor::{
        events::{Event, EventBus},
        index::{IndexManager, TableIndex},
        predicate::Criteria,
        statement::{
            AggregateExpression, AggregateFunction, CreateIndexStatement, DeleteStatement,
            InsertStatement, Projection, QueryResult, SelectStatement, Statement, UpdateStatement,
        },
    },
    storage::{
        catalog::Catalog,
        header::TableEntry,
        heap::TableHeap,
        pager::Pager,
        DEFAULT_CACHE_CAPACITY,
    },
    types::{error::DatabaseError, record::Record, value::Value, PageId, RowId},
};

/// System table holding one serialized snapshot row per column index.
const INDEXES_TABLE: &str = "_indexes";

/// Hidden field carrying a row's serial position across the whole table.
const HIDDEN_ID_FIELD: &str = "_id";

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Page cache capacity in pages.
    pub cache_capacity: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// An open database: the pager, the loaded index maps and the event bus.
/// Single-threaded; callers must `close()` exactly once. Opening the same
/// file from two processes is unsupported and may corrupt the catalog (no
/// file lock is taken).
pub struct Database {
    path: PathBuf,
    pager: Pager,
    indexes: IndexManager,
    events: EventBus,
}

/// One row matched by a statement's criteria: the stored record plus the
/// emitted form carrying the hidden `_id` field.
struct MatchedRow {
    row_id: RowId,
    record: Record,
    emitted: Record,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DatabaseError> {
        Self::open_with(path, DatabaseConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(
        path: P,
        config: DatabaseConfig,
    ) -> Result<Self, DatabaseError> {
        let path = path.as_ref().to_path_buf();
        let pager = Pager::open(&path, config.cache_capacity)?;

        let mut database = Self {
            path,
            pager,
            indexes: IndexManager::new(),
            events: EventBus::new(),
        };
        database.load_indexes()?;
        Ok(database)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory of the database file. Collaborator sidecar files
    /// (`_fts_index.json`, `_permissions.json`) live here.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Register an event subscriber. Subscribers are invoked synchronously
    /// after each successful mutating operation and must not mutate the
    /// database reentrantly.
    pub fn subscribe(&mut self, subscriber: impl Fn(&Event) + 'static) {
        self.events.subscribe(Box::new(subscriber));
    }

    pub fn list_tables(&mut self) -> Result<Vec<TableEntry>, DatabaseError> {
        Catalog::list_tables(&mut self.pager)
    }

    /// Apply one parsed operation descriptor.
    pub fn execute(&mut self, statement: Statement) -> Result<QueryResult, DatabaseError> {
        match statement {
            Statement::CreateTable(stmt) => {
                Catalog::create_table(&mut self.pager, &stmt.name, stmt.is_system)?;
                Ok(QueryResult::TableCreated)
            }
            Statement::DropTable(stmt) => {
                Catalog::drop_table(&mut self.pager, &stmt.name)?;
                self.indexes.drop_table(&stmt.name);
                self.persist_indexes()?;
                Ok(QueryResult::TableDropped)
            }
            Statement::Insert(stmt) => self.execute_insert(stmt),
            Statement::Select(stmt) => self.execute_select(stmt),
            Statement::Update(stmt) => self.execute_update(stmt),
            Statement::Delete(stmt) => self.execute_delete(stmt),
            Statement::CreateIndex(stmt) => self.execute_create_index(stmt),
        }
    }

    /// Persist index snapshots and release the file. Durability of the page
    /// writes themselves is left to the OS.
    pub fn close(mut self) -> Result<(), DatabaseError> {
        self.persist_indexes()?;
        self.pager.close()
    }

    fn execute_insert(&mut self, stmt: InsertStatement) -> Result<QueryResult, DatabaseError> {
        let entry = self.require_table(&stmt.table)?;
        let mut heap = TableHeap::new(&mut self.pager, entry.head_page_id);
        let row_id = heap.insert(&stmt.data)?;

        self.indexes.record_inserted(&stmt.table, &stmt.data, row_id);
        self.events.emit(&Event::inserted(stmt.table, stmt.data));
        Ok(QueryResult::Inserted { row_id })
    }

    fn execute_select(&mut self, stmt: SelectStatement) -> Result<QueryResult, DatabaseError> {
        let entry = self.require_table(&stmt.table)?;
        let matches =
            self.collect_matches(&stmt.table, entry.head_page_id, stmt.criteria.as_ref())?;
        let mut rows: Vec<Record> = matches.into_iter().map(|matched| matched.emitted).collect();

        if let Projection::Aggregate(aggregate) = &stmt.columns {
            return Ok(QueryResult::Aggregate(compute_aggregate(aggregate, &rows)?));
        }

        if let Some(order) = &stmt.order_by {
            rows.sort_by(|a, b| {
                let left = a.get(&order.column).unwrap_or(&Value::Null);
                let right = b.get(&order.column).unwrap_or(&Value::Null);
                let ordering = left.partial_cmp(right).unwrap_or(Ordering::Equal);
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let offset = stmt.offset.unwrap_or(0);
        let mut rows: Vec<Record> = rows.into_iter().skip(offset).collect();
        if let Some(limit) = stmt.limit {
            rows.truncate(limit);
        }

        if let Projection::Columns(columns) = &stmt.columns {
            rows = rows
                .into_iter()
                .map(|record| project(record, columns))
                .collect();
        }

        Ok(QueryResult::Rows(rows))
    }

    fn execute_update(&mut self, stmt: UpdateStatement) -> Result<QueryResult, DatabaseError> {
        let entry = self.require_table(&stmt.table)?;
        let matches =
            self.collect_matches(&stmt.table, entry.head_page_id, Some(&stmt.criteria))?;
        let count = matches.len();

        for matched in &matches {
            let mut updated = matched.record.clone();
            for assignment in &stmt.updates {
                updated.set(assignment.column.clone(), assignment.value.clone());
            }

            let mut heap = TableHeap::new(&mut self.pager, entry.head_page_id);
            let new_row_id = heap.update_row(matched.row_id, &updated)?;
            self.indexes.record_updated(
                &stmt.table,
                &matched.record,
                matched.row_id,
                &updated,
                new_row_id,
            );
        }

        self.events
            .emit(&Event::updated(stmt.table, stmt.criteria, stmt.updates));
        Ok(QueryResult::Updated { count })
    }

    fn execute_delete(&mut self, stmt: DeleteStatement) -> Result<QueryResult, DatabaseError> {
        let entry = self.require_table(&stmt.table)?;
        let matches =
            self.collect_matches(&stmt.table, entry.head_page_id, Some(&stmt.criteria))?;
        let count = matches.len();

        for matched in &matches {
            let mut heap = TableHeap::new(&mut self.pager, entry.head_page_id);
            heap.delete_row(matched.row_id)?;
            self.indexes
                .record_deleted(&stmt.table, &matched.record, matched.row_id);
        }

        self.events
            .emit(&Event::deleted(stmt.table, stmt.criteria));
        Ok(QueryResult::Deleted { count })
    }

    fn execute_create_index(
        &mut self,
        stmt: CreateIndexStatement,
    ) -> Result<QueryResult, DatabaseError> {
        let entry = self.require_table(&stmt.table)?;
        if self.indexes.find(&stmt.table, &stmt.column).is_some() {
            return Err(DatabaseError::IndexExists {
                table: stmt.table,
                column: stmt.column,
            });
        }

        let rows = TableHeap::new(&mut self.pager, entry.head_page_id).scan()?;
        let index = TableIndex::build(stmt.table.as_str(), stmt.column.as_str(), &rows);
        self.indexes.add(index)?;
        self.persist_indexes()?;

        tracing::debug!(table = %stmt.table, column = %stmt.column, "created index");
        Ok(QueryResult::IndexCreated)
    }

    /// Rows satisfying the criteria. A single equality leaf on an indexed
    /// column resolves through the index map instead of decoding the whole
    /// table; the chain is still walked so serial positions match a scan.
    fn collect_matches(
        &mut self,
        table: &str,
        head_page_id: PageId,
        criteria: Option<&Criteria>,
    ) -> Result<Vec<MatchedRow>, DatabaseError> {
        let indexed_ids = criteria.and_then(|criteria| {
            let (column, value) = criteria.as_equality()?;
            let index = self.indexes.find(table, column)?;
            Some(index.lookup(value))
        });

        let scanned = match indexed_ids {
            Some(row_ids) => TableHeap::new(&mut self.pager, head_page_id).fetch(&row_ids)?,
            None => TableHeap::new(&mut self.pager, head_page_id).scan()?,
        };

        let mut matches = Vec::new();
        for row in scanned {
            let mut emitted = row.record.clone();
            emitted.set(HIDDEN_ID_FIELD, Value::Integer(row.serial as i64));

            let keep = match criteria {
                Some(criteria) => criteria.evaluate(&emitted)?,
                None => true,
            };
            if keep {
                matches.push(MatchedRow {
                    row_id: row.row_id,
                    record: row.record,
                    emitted,
                });
            }
        }
        Ok(matches)
    }

    fn require_table(&mut self, name: &str) -> Result<TableEntry, DatabaseError> {
        Catalog::find_table(&mut self.pager, name)?.ok_or_else(|| DatabaseError::TableNotFound {
            name: name.to_string(),
        })
    }

    fn load_indexes(&mut self) -> Result<(), DatabaseError> {
        let entry = match Catalog::find_table(&mut self.pager, INDEXES_TABLE)? {
            Some(entry) => entry,
            None => return Ok(()),
        };

        let rows = TableHeap::new(&mut self.pager, entry.head_page_id).scan()?;
        for row in rows {
            let (table, column, snapshot) = match (
                row.record.get("table"),
                row.record.get("column"),
                row.record.get("map"),
            ) {
                (
                    Some(Value::Text(table)),
                    Some(Value::Text(column)),
                    Some(Value::Text(snapshot)),
                ) => (table, column, snapshot),
                _ => {
                    return Err(DatabaseError::SerializationError {
                        details: "malformed row in _indexes".to_string(),
                    });
                }
            };
            self.indexes
                .restore(TableIndex::from_snapshot(table.as_str(), column.as_str(), snapshot)?);
        }

        tracing::debug!("loaded persisted indexes");
        Ok(())
    }

    /// Rewrite the `_indexes` snapshots wholesale. The system table is
    /// created on first use.
    fn persist_indexes(&mut self) -> Result<(), DatabaseError> {
        let existing = Catalog::find_table(&mut self.pager, INDEXES_TABLE)?;
        if self.indexes.is_empty() && existing.is_none() {
            return Ok(());
        }

        let entry = match existing {
            Some(entry) => entry,
            None => Catalog::create_table(&mut self.pager, INDEXES_TABLE, true)?,
        };

        let mut heap = TableHeap::new(&mut self.pager, entry.head_page_id);
        for stale in heap.scan()? {
            heap.delete_row(stale.row_id)?;
        }
        for index in self.indexes.iter() {
            let record = Record::from_fields(vec![
                ("table".to_string(), Value::Text(index.table.clone())),
                ("column".to_string(), Value::Text(index.column.clone())),
                ("map".to_string(), Value::Text(index.snapshot()?)),
            ]);
            heap.insert(&record)?;
        }
        Ok(())
    }
}

fn project(record: Record, columns: &[String]) -> Record {
    let mut projected = Record::new();
    for column in columns {
        if let Some(value) = record.get(column) {
            projected.set(column.clone(), value.clone());
        }
    }
    projected
}

fn compute_aggregate(
    aggregate: &AggregateExpression,
    rows: &[Record],
) -> Result<Value, DatabaseError> {
    if aggregate.function == AggregateFunction::Count && aggregate.column == "*" {
        return Ok(Value::Integer(rows.len() as i64));
    }

    let values: Vec<&Value> = rows
        .iter()
        .filter_map(|record| record.get(&aggregate.column))
        .filter(|value| !value.is_null())
        .collect();

    match aggregate.function {
        AggregateFunction::Count => Ok(Value::Integer(values.len() as i64)),
        AggregateFunction::Sum => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            if values.iter().all(|value| matches!(value, Value::Integer(_))) {
                let mut total = 0i64;
                for value in &values {
                    if let Value::Integer(i) = value {
                        total += *i;
                    }
                }
                Ok(Value::Integer(total))
            } else {
                let numbers = numeric_values(&aggregate.column, &values)?;
                Ok(Value::Real(numbers.iter().sum()))
            }
        }
        AggregateFunction::Avg => {
            if values.is_empty() {
                return Ok(Value::Null);
            }
            let numbers = numeric_values(&aggregate.column, &values)?;
            Ok(Value::Real(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }
        AggregateFunction::Min => Ok(fold_extreme(&values, Ordering::Less)),
        AggregateFunction::Max => Ok(fold_extreme(&values, Ordering::Greater)),
    }
}

fn numeric_values(column: &str, values: &[&Value]) -> Result<Vec<f64>, DatabaseError> {
    values
        .iter()
        .map(|value| {
            value
                .coerce_to_number()
                .ok_or_else(|| DatabaseError::ExecutionError {
                    details: format!("cannot aggregate non-numeric value in '{}'", column),
                })
        })
        .collect()
}

fn fold_extreme(values: &[&Value], keep: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for &value in values {
        match best {
            None => best = Some(value),
            Some(current) => {
                if value.partial_cmp(current) == Some(keep) {
                    best = Some(value);
                }
            }
        }
    }
    best.cloned().unwrap_or(Value::Null)
}
