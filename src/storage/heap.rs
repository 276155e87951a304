use std::collections::HashSet;

use crate::{
    storage::pager::Pager,
    types::{
        error::DatabaseError, page::DataPage, record::Record, PageId, RowId, MAX_RECORD_SIZE,
    },
};

/// A row yielded by a heap traversal. `serial` is the row's 1-based position
/// among the table's live rows in chain order, the source of the hidden
/// `_id` field.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedRow {
    pub serial: u64,
    pub row_id: RowId,
    pub record: Record,
}

/// A logical table: a singly-linked chain of data pages with slotted
/// records, addressed from its head page.
pub struct TableHeap<'p> {
    pager: &'p mut Pager,
    head_page_id: PageId,
}

impl<'p> TableHeap<'p> {
    pub fn new(pager: &'p mut Pager, head_page_id: PageId) -> Self {
        Self {
            pager,
            head_page_id,
        }
    }

    /// First-fit insert along the chain; appends a freshly allocated linked
    /// page when no existing page has room.
    pub fn insert(&mut self, record: &Record) -> Result<RowId, DatabaseError> {
        let payload = record.to_bytes()?;
        self.insert_payload(&payload)
    }

    fn insert_payload(&mut self, payload: &[u8]) -> Result<RowId, DatabaseError> {
        if payload.len() > MAX_RECORD_SIZE {
            return Err(DatabaseError::RecordTooLarge {
                size: payload.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let mut page_id = self.head_page_id;
        loop {
            let mut page = self.load(page_id)?;

            if page.can_fit(payload.len()) {
                let slot = page.insert_record(payload)?;
                self.store(&page)?;
                return Ok(RowId::new(page_id, slot));
            }

            if page.next_page_id == 0 {
                let new_page_id = self.pager.alloc_page()?;
                page.next_page_id = new_page_id;
                self.store(&page)?;

                let mut new_page = self.load(new_page_id)?;
                let slot = new_page.insert_record(payload)?;
                self.store(&new_page)?;
                return Ok(RowId::new(new_page_id, slot));
            }

            page_id = page.next_page_id;
        }
    }

    /// Decode every live row in chain order, then intra-page slot order.
    pub fn scan(&mut self) -> Result<Vec<ScannedRow>, DatabaseError> {
        self.walk(|_| true)
    }

    /// Decode only the requested rows while still walking the whole chain,
    /// so serial positions match a full scan.
    pub fn fetch(&mut self, row_ids: &HashSet<RowId>) -> Result<Vec<ScannedRow>, DatabaseError> {
        self.walk(|row_id| row_ids.contains(&row_id))
    }

    fn walk(
        &mut self,
        mut wanted: impl FnMut(RowId) -> bool,
    ) -> Result<Vec<ScannedRow>, DatabaseError> {
        let mut rows = Vec::new();
        let mut serial = 0u64;
        let mut page_id = self.head_page_id;

        while page_id != 0 {
            let page = self.load(page_id)?;
            for (slot_index, slot) in page.slots.iter().enumerate() {
                if slot.tombstone {
                    continue;
                }
                serial += 1;
                let row_id = RowId::new(page_id, slot_index as u16);
                if !wanted(row_id) {
                    continue;
                }
                rows.push(ScannedRow {
                    serial,
                    row_id,
                    record: Record::from_bytes(&slot.payload)?,
                });
            }
            page_id = page.next_page_id;
        }

        Ok(rows)
    }

    /// Rewrite a row. In place when the new encoding fits the old slot,
    /// otherwise the slot is tombstoned and the record re-inserted as a
    /// fresh slot, possibly on a new page. Returns the row's address after
    /// the update.
    pub fn update_row(&mut self, row_id: RowId, record: &Record) -> Result<RowId, DatabaseError> {
        let payload = record.to_bytes()?;
        if payload.len() > MAX_RECORD_SIZE {
            return Err(DatabaseError::RecordTooLarge {
                size: payload.len(),
                max: MAX_RECORD_SIZE,
            });
        }

        let mut page = self.load(row_id.page_id)?;
        if page.try_replace(row_id.slot, &payload)? {
            self.store(&page)?;
            return Ok(row_id);
        }

        page.tombstone_slot(row_id.slot)?;
        self.store(&page)?;
        self.insert_payload(&payload)
    }

    /// Tombstone a row; trailing tombstones on its page are compacted away.
    /// Interior holes are not reclaimed.
    pub fn delete_row(&mut self, row_id: RowId) -> Result<(), DatabaseError> {
        let mut page = self.load(row_id.page_id)?;
        page.tombstone_slot(row_id.slot)?;
        self.store(&page)
    }

    fn load(&mut self, page_id: PageId) -> Result<DataPage, DatabaseError> {
        DataPage::from_bytes(page_id, &self.pager.read_page(page_id)?)
    }

    fn store(&mut self, page: &DataPage) -> Result<(), DatabaseError> {
        self.pager.write_page(page.page_id, &page.to_bytes())
    }
}
