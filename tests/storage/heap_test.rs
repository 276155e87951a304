use std::{collections::HashSet, fs, path::PathBuf};

use sawitdb::{
    storage::{catalog::Catalog, heap::TableHeap, pager::Pager},
    types::{error::DatabaseError, record::Record, value::Value, PageId, MAX_RECORD_SIZE},
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

fn setup(prefix: &str, temp: &TempFile) -> Result<(Pager, PageId), DatabaseError> {
    let mut pager = Pager::open(&temp.path, 64)?;
    let entry = Catalog::create_table(&mut pager, prefix, false)?;
    Ok((pager, entry.head_page_id))
}

fn pohon(id: i64, label: &str) -> Record {
    Record::from_fields(vec![
        ("id".to_string(), Value::Integer(id)),
        ("label".to_string(), Value::Text(label.to_string())),
    ])
}

#[test]
fn test_insert_and_scan_preserves_order() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_scan");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    for i in 1..=5 {
        heap.insert(&pohon(i, "sawit"))?;
    }

    let rows = heap.scan()?;
    assert_eq!(rows.len(), 5);
    for (i, row) in rows.iter().enumerate() {
        assert_eq!(row.serial, i as u64 + 1);
        assert_eq!(row.record.get("id"), Some(&Value::Integer(i as i64 + 1)));
    }
    Ok(())
}

#[test]
fn test_insert_chains_to_new_pages() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_chain");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    // ~1 KiB records: at most 3 fit a page, so 10 rows span several pages
    let mut row_ids = Vec::new();
    for i in 0..10 {
        let record = Record::from_fields(vec![
            ("id".to_string(), Value::Integer(i)),
            ("data".to_string(), Value::Text("x".repeat(1000))),
        ]);
        row_ids.push(heap.insert(&record)?);
    }

    let pages: HashSet<PageId> = row_ids.iter().map(|row_id| row_id.page_id).collect();
    assert!(pages.len() > 1, "rows should spill onto linked pages");

    // scan still yields every row, in insertion order
    let rows = heap.scan()?;
    assert_eq!(rows.len(), 10);
    let ids: Vec<i64> = rows
        .iter()
        .map(|row| match row.record.get("id") {
            Some(Value::Integer(id)) => *id,
            other => panic!("expected integer id, got {:?}", other),
        })
        .collect();
    assert_eq!(ids, (0..10).collect::<Vec<i64>>());
    Ok(())
}

#[test]
fn test_record_too_large() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_too_large");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    let record = Record::from_fields(vec![(
        "data".to_string(),
        Value::Text("x".repeat(MAX_RECORD_SIZE)),
    )]);
    match heap.insert(&record) {
        Err(DatabaseError::RecordTooLarge { max, .. }) => assert_eq!(max, MAX_RECORD_SIZE),
        other => panic!("expected RecordTooLarge, got {:?}", other),
    }
    Ok(())
}

#[test]
fn test_update_in_place_keeps_row_id() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_update_in_place");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    let row_id = heap.insert(&pohon(1, "sebelum"))?;
    heap.insert(&pohon(2, "lain"))?;

    // same-size replacement stays in its slot
    let new_row_id = heap.update_row(row_id, &pohon(1, "sesudah"))?;
    assert_eq!(new_row_id, row_id);

    let rows = heap.scan()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[0].record.get("label"),
        Some(&Value::Text("sesudah".to_string()))
    );
    Ok(())
}

#[test]
fn test_update_grows_and_relocates() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_update_relocate");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    let row_id = heap.insert(&pohon(1, "a"))?;
    heap.insert(&pohon(2, "b"))?;

    let grown = pohon(1, &"panjang".repeat(10));
    let new_row_id = heap.update_row(row_id, &grown)?;
    assert_ne!(new_row_id, row_id);

    // the old slot is tombstoned; the grown row re-appears at the end
    let rows = heap.scan()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].record.get("id"), Some(&Value::Integer(2)));
    assert_eq!(rows[1].record, grown);
    Ok(())
}

#[test]
fn test_delete_row_hides_it_from_scans() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_delete");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    heap.insert(&pohon(1, "a"))?;
    let victim = heap.insert(&pohon(2, "b"))?;
    heap.insert(&pohon(3, "c"))?;

    heap.delete_row(victim)?;

    let rows = heap.scan()?;
    assert_eq!(rows.len(), 2);
    let ids: Vec<i64> = rows
        .iter()
        .map(|row| match row.record.get("id") {
            Some(Value::Integer(id)) => *id,
            other => panic!("expected integer id, got {:?}", other),
        })
        .collect();
    assert_eq!(ids, vec![1, 3]);
    // serials renumber over the remaining live rows
    assert_eq!(rows[0].serial, 1);
    assert_eq!(rows[1].serial, 2);
    Ok(())
}

#[test]
fn test_fetch_decodes_only_requested_rows() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_fetch");
    let (mut pager, head) = setup("pohon", &temp)?;
    let mut heap = TableHeap::new(&mut pager, head);

    let mut row_ids = Vec::new();
    for i in 1..=6 {
        row_ids.push(heap.insert(&pohon(i, "sawit"))?);
    }

    let wanted: HashSet<_> = [row_ids[1], row_ids[4]].into_iter().collect();
    let rows = heap.fetch(&wanted)?;

    assert_eq!(rows.len(), 2);
    // serial positions match what a full scan would have assigned
    assert_eq!(rows[0].serial, 2);
    assert_eq!(rows[1].serial, 5);
    assert_eq!(rows[0].record.get("id"), Some(&Value::Integer(2)));
    assert_eq!(rows[1].record.get("id"), Some(&Value::Integer(5)));
    Ok(())
}

#[test]
fn test_heap_contents_survive_reopen() -> Result<(), DatabaseError> {
    let temp = TempFile::new("heap_reopen");

    {
        let (mut pager, head) = setup("pohon", &temp)?;
        let mut heap = TableHeap::new(&mut pager, head);
        heap.insert(&pohon(1, "Dura"))?;
        heap.insert(&pohon(2, "Tenera"))?;
        pager.close()?;
    }

    let mut pager = Pager::open(&temp.path, 64)?;
    let entry = Catalog::find_table(&mut pager, "pohon")?.expect("table should persist");
    let rows = TableHeap::new(&mut pager, entry.head_page_id).scan()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(
        rows[1].record.get("label"),
        Some(&Value::Text("Tenera".to_string()))
    );
    Ok(())
}
