use crate::{
    storage::{
        header::{FileHeader, TableEntry},
        pager::Pager,
    },
    types::error::DatabaseError,
};

/// The table-name → head-page-id map persisted on page 0. Stateless: every
/// operation decodes the header page through the pager.
pub struct Catalog;

impl Catalog {
    pub fn header(pager: &mut Pager) -> Result<FileHeader, DatabaseError> {
        FileHeader::from_bytes(&pager.read_page(0)?)
    }

    /// Linear scan of the header entries.
    pub fn find_table(pager: &mut Pager, name: &str) -> Result<Option<TableEntry>, DatabaseError> {
        Ok(Self::header(pager)?.find(name).cloned())
    }

    /// Allocate a head page and append a catalog entry for it. The wrapping
    /// subsystem is responsible for change events.
    pub fn create_table(
        pager: &mut Pager,
        name: &str,
        is_system: bool,
    ) -> Result<TableEntry, DatabaseError> {
        if Self::header(pager)?.find(name).is_some() {
            return Err(DatabaseError::TableExists {
                name: name.to_string(),
            });
        }

        let head_page_id = pager.alloc_page()?;

        // Re-read: the allocation above rewrote the page counter on page 0.
        let mut header = Self::header(pager)?;
        let entry = TableEntry {
            name: name.to_string(),
            head_page_id,
            is_system,
        };
        header.tables.push(entry.clone());
        let header_bytes = header.to_bytes()?;
        pager.write_page(0, &header_bytes)?;

        tracing::debug!(table = %name, head_page_id, is_system, "created table");
        Ok(entry)
    }

    /// Unlink a table from the header and compact the following entries.
    /// The table's pages are leaked, never reused.
    pub fn drop_table(pager: &mut Pager, name: &str) -> Result<(), DatabaseError> {
        let mut header = Self::header(pager)?;
        let position = header
            .tables
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })?;
        header.tables.remove(position);

        let header_bytes = header.to_bytes()?;
        pager.write_page(0, &header_bytes)?;

        tracing::debug!(table = %name, "dropped table");
        Ok(())
    }

    pub fn list_tables(pager: &mut Pager) -> Result<Vec<TableEntry>, DatabaseError> {
        Ok(Self::header(pager)?.tables)
    }
}
