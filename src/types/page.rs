use crate::types::{error::DatabaseError, PageId, DATA_PAGE_HEADER_SIZE, PAGE_SIZE};

/// High bit of a slot's length prefix marks a logically deleted record.
pub const TOMBSTONE_BIT: u16 = 0x8000;

/// One (length prefix, payload) entry within a data page. A tombstoned slot
/// keeps its payload bytes on disk so later slot indexes stay stable.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub payload: Vec<u8>,
    pub tombstone: bool,
}

/*
 * Data Page Layout on Disk
 * ┌────────────────────────────────────────────────────────────┐
 * │ next_page_id(4, 0 = end) | slot_count(2) | free_offset(2)  │
 * ├────────────────────────────────────────────────────────────┤
 * │ [len0(2)|payload0] [len1(2)|payload1] ...   left to right  │
 * ├────────────────────────────────────────────────────────────┤
 * │                        FREE SPACE                          │
 * └────────────────────────────────────────────────────────────┘
 */
#[derive(Debug, Clone, PartialEq)]
pub struct DataPage {
    pub page_id: PageId,
    pub next_page_id: PageId,
    pub slots: Vec<Slot>,
}

impl DataPage {
    pub fn new(page_id: PageId) -> Self {
        Self {
            page_id,
            next_page_id: 0,
            slots: Vec::new(),
        }
    }

    /// First byte available for a new record.
    pub fn free_offset(&self) -> u16 {
        let used: usize = self.slots.iter().map(|slot| 2 + slot.payload.len()).sum();
        (DATA_PAGE_HEADER_SIZE + used) as u16
    }

    pub fn available_space(&self) -> usize {
        PAGE_SIZE - self.free_offset() as usize
    }

    pub fn can_fit(&self, payload_len: usize) -> bool {
        self.available_space() >= payload_len + 2
    }

    /// Append a record payload as a new slot and return its slot index.
    pub fn insert_record(&mut self, payload: &[u8]) -> Result<u16, DatabaseError> {
        if !self.can_fit(payload.len()) {
            return Err(DatabaseError::CorruptedPage {
                page_id: self.page_id,
                reason: format!("no room for a {} byte record", payload.len()),
            });
        }

        self.slots.push(Slot {
            payload: payload.to_vec(),
            tombstone: false,
        });

        Ok((self.slots.len() - 1) as u16)
    }

    /// Payload of a live slot; None for a missing or tombstoned slot.
    pub fn record(&self, slot: u16) -> Option<&[u8]> {
        self.slots
            .get(slot as usize)
            .filter(|entry| !entry.tombstone)
            .map(|entry| entry.payload.as_slice())
    }

    /// Rewrite a live slot when the new payload is no larger than the old
    /// one. The next `to_bytes` re-serializes the slots densely, so the
    /// free offset stays consistent with the shorter payload. Returns false
    /// when the payload does not fit and the caller must relocate the
    /// record instead.
    pub fn try_replace(&mut self, slot: u16, payload: &[u8]) -> Result<bool, DatabaseError> {
        let entry = self
            .slots
            .get_mut(slot as usize)
            .filter(|entry| !entry.tombstone)
            .ok_or_else(|| DatabaseError::CorruptedPage {
                page_id: self.page_id,
                reason: format!("slot {} is missing or deleted", slot),
            })?;

        if payload.len() > entry.payload.len() {
            return Ok(false);
        }

        entry.payload = payload.to_vec();
        Ok(true)
    }

    /// Mark a slot deleted. When the deleted slot is the trailing one, pop it
    /// and any tombstones now at the tail so their space is reusable.
    pub fn tombstone_slot(&mut self, slot: u16) -> Result<(), DatabaseError> {
        let entry =
            self.slots
                .get_mut(slot as usize)
                .ok_or_else(|| DatabaseError::CorruptedPage {
                    page_id: self.page_id,
                    reason: format!("slot {} out of range", slot),
                })?;
        entry.tombstone = true;

        while self.slots.last().is_some_and(|entry| entry.tombstone) {
            self.slots.pop();
        }

        Ok(())
    }

    pub fn live_slot_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.tombstone).count()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = vec![0u8; PAGE_SIZE];

        buffer[0..4].copy_from_slice(&self.next_page_id.to_le_bytes());
        buffer[4..6].copy_from_slice(&(self.slots.len() as u16).to_le_bytes());
        buffer[6..8].copy_from_slice(&self.free_offset().to_le_bytes());

        let mut offset = DATA_PAGE_HEADER_SIZE;
        for slot in &self.slots {
            let mut prefix = slot.payload.len() as u16;
            if slot.tombstone {
                prefix |= TOMBSTONE_BIT;
            }
            buffer[offset..offset + 2].copy_from_slice(&prefix.to_le_bytes());
            offset += 2;
            buffer[offset..offset + slot.payload.len()].copy_from_slice(&slot.payload);
            offset += slot.payload.len();
        }

        buffer
    }

    pub fn from_bytes(page_id: PageId, bytes: &[u8]) -> Result<Self, DatabaseError> {
        if bytes.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }

        let next_page_id = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let slot_count = u16::from_le_bytes([bytes[4], bytes[5]]);
        let free_offset = u16::from_le_bytes([bytes[6], bytes[7]]) as usize;

        if free_offset < DATA_PAGE_HEADER_SIZE || free_offset > PAGE_SIZE {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!("invalid free offset: {}", free_offset),
            });
        }

        let mut slots = Vec::with_capacity(slot_count as usize);
        let mut offset = DATA_PAGE_HEADER_SIZE;
        for _ in 0..slot_count {
            if offset + 2 > free_offset {
                return Err(DatabaseError::CorruptedPage {
                    page_id,
                    reason: "slot prefix extends past free offset".to_string(),
                });
            }
            let prefix = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
            let tombstone = prefix & TOMBSTONE_BIT != 0;
            let length = (prefix & !TOMBSTONE_BIT) as usize;
            offset += 2;

            if offset + length > free_offset {
                return Err(DatabaseError::CorruptedPage {
                    page_id,
                    reason: format!("slot of {} bytes extends past free offset", length),
                });
            }
            slots.push(Slot {
                payload: bytes[offset..offset + length].to_vec(),
                tombstone,
            });
            offset += length;
        }

        if offset != free_offset {
            return Err(DatabaseError::CorruptedPage {
                page_id,
                reason: format!(
                    "slot lengths sum to {} but free offset is {}",
                    offset, free_offset
                ),
            });
        }

        Ok(Self {
            page_id,
            next_page_id,
            slots,
        })
    }
}
