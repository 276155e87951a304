use std::{
    collections::{HashMap, VecDeque},
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use crate::{
    storage::header::FileHeader,
    types::{error::DatabaseError, page::DataPage, PageId, PAGE_SIZE},
};

/// LRU page cache: any access re-homes the key to the MRU end, eviction
/// removes the LRU end.
struct PageCache {
    capacity: usize,
    order: VecDeque<PageId>,
    pages: HashMap<PageId, Vec<u8>>,
}

impl PageCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            pages: HashMap::new(),
        }
    }

    fn get(&mut self, page_id: PageId) -> Option<&Vec<u8>> {
        if !self.pages.contains_key(&page_id) {
            return None;
        }
        self.promote(page_id);
        self.pages.get(&page_id)
    }

    fn put(&mut self, page_id: PageId, buffer: Vec<u8>) {
        self.pages.insert(page_id, buffer);
        self.promote(page_id);

        while self.pages.len() > self.capacity {
            match self.order.pop_front() {
                Some(victim) => {
                    tracing::trace!(page_id = victim, "evicting page from cache");
                    self.pages.remove(&victim);
                }
                None => break,
            }
        }
    }

    fn promote(&mut self, page_id: PageId) {
        if let Some(position) = self.order.iter().position(|id| *id == page_id) {
            self.order.remove(position);
        }
        self.order.push_back(page_id);
    }
}

/// The sole reader and writer of the database file. All other layers speak
/// page ids and 4 KiB buffers.
pub struct Pager {
    file: File,
    path: PathBuf,
    cache: PageCache,
    total_pages: u32,
}

impl Pager {
    /// Open an existing database file, or create and initialize a new one.
    /// An existing file whose magic does not match fails with CorruptFile.
    pub fn open<P: AsRef<Path>>(path: P, cache_capacity: usize) -> Result<Self, DatabaseError> {
        let path = path.as_ref();

        if path.exists() {
            Self::open_existing(path, cache_capacity)
        } else {
            Self::create_new(path, cache_capacity)
        }
    }

    fn create_new(path: &Path, cache_capacity: usize) -> Result<Self, DatabaseError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let header = FileHeader::default();
        let header_bytes = header.to_bytes()?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header_bytes)?;
        file.flush()?;

        tracing::debug!(path = %path.display(), "created database file");

        let mut pager = Self {
            file,
            path: path.to_path_buf(),
            cache: PageCache::new(cache_capacity),
            total_pages: header.total_pages,
        };
        pager.cache.put(0, header_bytes);
        Ok(pager)
    }

    fn open_existing(path: &Path, cache_capacity: usize) -> Result<Self, DatabaseError> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let header_bytes = read_page_from_file(&mut file, 0)?;
        let header = FileHeader::from_bytes(&header_bytes)?;

        tracing::debug!(
            path = %path.display(),
            total_pages = header.total_pages,
            table_count = header.tables.len(),
            "opened database file"
        );

        let mut pager = Self {
            file,
            path: path.to_path_buf(),
            cache: PageCache::new(cache_capacity),
            total_pages: header.total_pages,
        };
        pager.cache.put(0, header_bytes);
        Ok(pager)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Return the 4 KiB buffer for a page, from the cache when possible. A
    /// page allocated but not yet written reads back zero-filled.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Vec<u8>, DatabaseError> {
        if page_id >= self.total_pages {
            return Err(DatabaseError::InvalidPageId {
                page_id,
                total: self.total_pages,
            });
        }

        if let Some(buffer) = self.cache.get(page_id) {
            return Ok(buffer.clone());
        }

        let buffer = read_page_from_file(&mut self.file, page_id)?;
        self.cache.put(page_id, buffer.clone());
        Ok(buffer)
    }

    /// Write a full page at its file offset and refresh the cache entry.
    pub fn write_page(&mut self, page_id: PageId, buffer: &[u8]) -> Result<(), DatabaseError> {
        if buffer.len() != PAGE_SIZE {
            return Err(DatabaseError::InvalidPageSize {
                expected: PAGE_SIZE,
                actual: buffer.len(),
            });
        }
        if page_id >= self.total_pages {
            return Err(DatabaseError::InvalidPageId {
                page_id,
                total: self.total_pages,
            });
        }

        self.file
            .seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;
        self.file.write_all(buffer)?;
        self.cache.put(page_id, buffer.to_vec());
        Ok(())
    }

    /// Bump the header's page counter, persist it, and write an initialized
    /// empty data page at the new id. Pages are never freed.
    pub fn alloc_page(&mut self) -> Result<PageId, DatabaseError> {
        let mut header = FileHeader::from_bytes(&self.read_page(0)?)?;
        let new_page_id = header.total_pages;
        header.total_pages += 1;

        let header_bytes = header.to_bytes()?;
        self.total_pages = header.total_pages;
        self.write_page(0, &header_bytes)?;

        let page = DataPage::new(new_page_id);
        self.write_page(new_page_id, &page.to_bytes())?;

        tracing::debug!(page_id = new_page_id, "allocated page");
        Ok(new_page_id)
    }

    /// Close the file handle and drop the cache. Durability of previous
    /// writes is left to the OS.
    pub fn close(self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

fn read_page_from_file(file: &mut File, page_id: PageId) -> Result<Vec<u8>, DatabaseError> {
    let mut buffer = vec![0u8; PAGE_SIZE];
    file.seek(SeekFrom::Start(page_id as u64 * PAGE_SIZE as u64))?;

    // Short reads past the end of the file leave the tail zero-filled.
    let mut filled = 0;
    while filled < PAGE_SIZE {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(buffer)
}
