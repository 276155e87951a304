use crate::{
    storage::{HEADER_PREFIX_SIZE, SAWIT_MAGIC},
    types::{error::DatabaseError, PageId, PAGE_SIZE},
};

/// One catalog entry on the header page: table name, the first page of its
/// chain, and whether the table belongs to an internal subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub name: String,
    pub head_page_id: PageId,
    pub is_system: bool,
}

/// Decoded header page (page 0). Entries keep creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHeader {
    pub total_pages: u32,
    pub tables: Vec<TableEntry>,
}

impl Default for FileHeader {
    fn default() -> Self {
        Self {
            total_pages: 1,
            tables: Vec::new(),
        }
    }
}

impl FileHeader {
    pub fn find(&self, name: &str) -> Option<&TableEntry> {
        self.tables.iter().find(|entry| entry.name == name)
    }

    /// Encode to a full header page. Fails with CatalogFull before anything
    /// is written when the entries no longer fit page 0.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DatabaseError> {
        let mut buffer = vec![0u8; PAGE_SIZE];

        buffer[0..4].copy_from_slice(SAWIT_MAGIC);
        buffer[4..8].copy_from_slice(&self.total_pages.to_le_bytes());
        buffer[8..12].copy_from_slice(&(self.tables.len() as u32).to_le_bytes());

        let mut offset = HEADER_PREFIX_SIZE;
        for entry in &self.tables {
            let name_bytes = entry.name.as_bytes();
            if name_bytes.len() > u8::MAX as usize {
                return Err(DatabaseError::SerializationError {
                    details: format!("table name '{}' exceeds 255 bytes", entry.name),
                });
            }

            let entry_size = 1 + name_bytes.len() + 4 + 1;
            if offset + entry_size > PAGE_SIZE {
                return Err(DatabaseError::CatalogFull);
            }

            buffer[offset] = name_bytes.len() as u8;
            offset += 1;
            buffer[offset..offset + name_bytes.len()].copy_from_slice(name_bytes);
            offset += name_bytes.len();
            buffer[offset..offset + 4].copy_from_slice(&entry.head_page_id.to_le_bytes());
            offset += 4;
            buffer[offset] = if entry.is_system { 1 } else { 0 };
            offset += 1;
        }

        Ok(buffer)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }

        if &bytes[0..4] != SAWIT_MAGIC {
            return Err(DatabaseError::CorruptFile);
        }

        let total_pages = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let table_count = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        let mut tables = Vec::with_capacity(table_count as usize);
        let mut offset = HEADER_PREFIX_SIZE;
        for _ in 0..table_count {
            if offset + 1 > PAGE_SIZE {
                return Err(corrupt_header("table entry extends past page 0"));
            }
            let name_len = bytes[offset] as usize;
            offset += 1;

            if offset + name_len + 5 > PAGE_SIZE {
                return Err(corrupt_header("table entry extends past page 0"));
            }
            let name = String::from_utf8(bytes[offset..offset + name_len].to_vec())
                .map_err(|_| corrupt_header("table name is not valid UTF-8"))?;
            offset += name_len;

            let head_page_id = u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]);
            offset += 4;
            let is_system = bytes[offset] != 0;
            offset += 1;

            tables.push(TableEntry {
                name,
                head_page_id,
                is_system,
            });
        }

        Ok(Self {
            total_pages,
            tables,
        })
    }
}

fn corrupt_header(reason: &str) -> DatabaseError {
    DatabaseError::CorruptedPage {
        page_id: 0,
        reason: reason.to_string(),
    }
}
