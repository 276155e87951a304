use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use tempfile::env::temp_dir;

use crate::{database::Database, types::error::DatabaseError};

pub fn get_unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis()
}

pub fn create_temp_db_path_with_prefix(prefix: &str) -> PathBuf {
    let mut temp_path = temp_dir();
    temp_path.push(format!("{}_{}.sawit", prefix, get_unix_timestamp_millis()));
    temp_path
}

/// A database at a temp path, removed on drop. Reopen by calling
/// `close_database` then `create_database` again.
pub struct TempDatabase {
    pub path: PathBuf,
    pub database: Option<Database>,
}

impl TempDatabase {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            path: create_temp_db_path_with_prefix(prefix),
            database: None,
        }
    }

    pub fn create_database(&mut self) -> Result<&mut Database, DatabaseError> {
        let database = Database::open(&self.path)?;
        self.database = Some(database);
        Ok(self.database.as_mut().unwrap())
    }

    pub fn get_database(&mut self) -> Option<&mut Database> {
        self.database.as_mut()
    }

    pub fn close_database(&mut self) -> Result<(), DatabaseError> {
        match self.database.take() {
            Some(database) => database.close(),
            None => Ok(()),
        }
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        self.database = None;
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}
