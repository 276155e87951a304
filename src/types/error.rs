use thiserror::Error;

use crate::types::PageId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a sawit database file: bad magic")]
    CorruptFile,

    #[error("invalid page id {page_id} (total pages: {total})")]
    InvalidPageId { page_id: PageId, total: u32 },

    #[error("invalid page size: expected {expected} bytes, got {actual} bytes")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("corrupted page: page_id={page_id}, reason={reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("table '{name}' already exists")]
    TableExists { name: String },

    #[error("table '{name}' not found")]
    TableNotFound { name: String },

    #[error("record of {size} bytes exceeds the {max} byte page limit")]
    RecordTooLarge { size: usize, max: usize },

    #[error("catalog full: header page cannot hold another table entry")]
    CatalogFull,

    #[error("index on {table}.{column} already exists")]
    IndexExists { table: String, column: String },

    #[error("serialization/deserialization error: {details}")]
    SerializationError { details: String },

    #[error("query execution error: {details}")]
    ExecutionError { details: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
