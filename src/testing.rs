use std::cell::Cell;

use gcore::id::ObjectId;
use store::mem::MemStore;
use store::{ChunkStore, Criteria, FileMetadata, StoreError};

/// MemStore wrapper that fails or hides chosen calls.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemStore,
    fail_chunk: Cell<Option<u32>>,
    hide_chunk: Cell<Option<u32>>,
    fail_metadata: Cell<bool>,
    fail_deletes: Cell<bool>,
}

fn injected(what: &str) -> StoreError {
    StoreError::Other(format!("injected {} failure", what))
}

impl FlakyStore {
    pub fn new() -> Self {
        FlakyStore::default()
    }

    pub fn fail_chunk(&self, n: u32) {
        self.fail_chunk.set(Some(n));
    }

    pub fn hide_chunk(&self, n: u32) {
        self.hide_chunk.set(Some(n));
    }

    pub fn fail_metadata(&self) {
        self.fail_metadata.set(true);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.set(true);
    }
}

impl ChunkStore for FlakyStore {
    fn put_chunk(
        &self,
        root: &str,
        files_id: &ObjectId,
        n: u32,
        data: &[u8],
    ) -> Result<(), StoreError> {
        if self.fail_chunk.get() == Some(n) {
            return Err(injected("put_chunk"));
        }
        self.inner.put_chunk(root, files_id, n, data)
    }

    fn get_chunk(
        &self,
        root: &str,
        files_id: &ObjectId,
        n: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        if self.hide_chunk.get() == Some(n) {
            return Ok(None);
        }
        if self.fail_chunk.get() == Some(n) {
            return Err(injected("get_chunk"));
        }
        self.inner.get_chunk(root, files_id, n)
    }

    fn put_metadata(&self, record: &FileMetadata) -> Result<(), StoreError> {
        if self.fail_metadata.get() {
            return Err(injected("put_metadata"));
        }
        self.inner.put_metadata(record)
    }

    fn find_metadata(&self, criteria: &Criteria) -> Result<Vec<FileMetadata>, StoreError> {
        self.inner.find_metadata(criteria)
    }

    fn delete_chunks(&self, root: &str, files_id: &ObjectId) -> Result<(), StoreError> {
        if self.fail_deletes.get() {
            return Err(injected("delete_chunks"));
        }
        self.inner.delete_chunks(root, files_id)
    }

    fn delete_metadata(&self, root: &str, files_id: &ObjectId) -> Result<bool, StoreError> {
        if self.fail_deletes.get() {
            return Err(injected("delete_metadata"));
        }
        self.inner.delete_metadata(root, files_id)
    }
}
