use std::{fs, io::Write, path::PathBuf};

use sawitdb::{
    storage::pager::Pager,
    types::{error::DatabaseError, page::DataPage, PAGE_SIZE},
    utils::mock::create_temp_db_path_with_prefix,
};

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn new(prefix: &str) -> Self {
        Self {
            path: create_temp_db_path_with_prefix(prefix),
        }
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
        }
    }
}

#[test]
fn test_create_new_file_writes_header_page() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_create");
    let mut pager = Pager::open(&temp.path, 16)?;

    assert_eq!(pager.total_pages(), 1);

    let header = pager.read_page(0)?;
    assert_eq!(&header[0..4], b"WOWO");
    assert_eq!(u32::from_le_bytes([header[4], header[5], header[6], header[7]]), 1);
    assert_eq!(u32::from_le_bytes([header[8], header[9], header[10], header[11]]), 0);
    Ok(())
}

#[test]
fn test_open_rejects_bad_magic() {
    let temp = TempFile::new("pager_bad_magic");
    let mut file = fs::File::create(&temp.path).unwrap();
    file.write_all(b"not a sawit database at all").unwrap();
    drop(file);

    match Pager::open(&temp.path, 16) {
        Err(DatabaseError::CorruptFile) => {}
        other => panic!("expected CorruptFile, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_alloc_page_bumps_header_counter() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_alloc");
    let mut pager = Pager::open(&temp.path, 16)?;

    let first = pager.alloc_page()?;
    let second = pager.alloc_page()?;
    assert_eq!(first, 1);
    assert_eq!(second, 2);
    assert_eq!(pager.total_pages(), 3);

    // the counter is persisted on page 0
    let header = pager.read_page(0)?;
    assert_eq!(u32::from_le_bytes([header[4], header[5], header[6], header[7]]), 3);

    // a fresh allocation is an initialized empty data page
    let page = DataPage::from_bytes(first, &pager.read_page(first)?)?;
    assert_eq!(page.next_page_id, 0);
    assert!(page.slots.is_empty());
    Ok(())
}

#[test]
fn test_total_pages_survives_reopen() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_reopen");

    let mut pager = Pager::open(&temp.path, 16)?;
    pager.alloc_page()?;
    pager.alloc_page()?;
    pager.close()?;

    let pager = Pager::open(&temp.path, 16)?;
    assert_eq!(pager.total_pages(), 3);
    Ok(())
}

#[test]
fn test_read_past_total_pages_fails() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_invalid_read");
    let mut pager = Pager::open(&temp.path, 16)?;

    match pager.read_page(5) {
        Err(DatabaseError::InvalidPageId { page_id, total }) => {
            assert_eq!(page_id, 5);
            assert_eq!(total, 1);
        }
        other => panic!("expected InvalidPageId, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[test]
fn test_write_rejects_wrong_buffer_size() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_wrong_size");
    let mut pager = Pager::open(&temp.path, 16)?;

    match pager.write_page(0, &[0u8; 100]) {
        Err(DatabaseError::InvalidPageSize { expected, actual }) => {
            assert_eq!(expected, PAGE_SIZE);
            assert_eq!(actual, 100);
        }
        other => panic!("expected InvalidPageSize, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_read_after_write_observes_written_bytes() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_read_after_write");
    let mut pager = Pager::open(&temp.path, 16)?;

    let page_id = pager.alloc_page()?;
    let mut page = DataPage::new(page_id);
    page.insert_record(b"pelepah").unwrap();
    pager.write_page(page_id, &page.to_bytes())?;

    let decoded = DataPage::from_bytes(page_id, &pager.read_page(page_id)?)?;
    assert_eq!(decoded.record(0), Some(&b"pelepah"[..]));
    Ok(())
}

#[test]
fn test_reads_stay_correct_past_cache_capacity() -> Result<(), DatabaseError> {
    let temp = TempFile::new("pager_lru");
    // a cache of 2 pages forces constant eviction
    let mut pager = Pager::open(&temp.path, 2)?;

    let mut page_ids = Vec::new();
    for i in 0..8u8 {
        let page_id = pager.alloc_page()?;
        let mut page = DataPage::new(page_id);
        page.insert_record(&[i; 16]).unwrap();
        pager.write_page(page_id, &page.to_bytes())?;
        page_ids.push(page_id);
    }

    // every page reads back intact even though most were evicted
    for (i, page_id) in page_ids.iter().enumerate() {
        let page = DataPage::from_bytes(*page_id, &pager.read_page(*page_id)?)?;
        assert_eq!(page.record(0), Some(&[i as u8; 16][..]));
    }
    Ok(())
}
