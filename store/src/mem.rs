use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use gcore::id::ObjectId;

use crate::{ChunkStore, Criteria, FileMetadata, StoreError};

type FileKey = (String, ObjectId);

#[derive(Default)]
struct Inner {
    // Ordered by n so a file's chunks sit together
    chunks: HashMap<FileKey, BTreeMap<u32, Vec<u8>>>,
    files: HashMap<FileKey, FileMetadata>,
}

/// Process local store, handy for tests and short lived tooling.
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Chunk sequence numbers held for a file, in order.
    pub fn chunk_numbers(&self, root: &str, files_id: &ObjectId) -> Result<Vec<u32>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .chunks
            .get(&(root.to_string(), *files_id))
            .map(|c| c.keys().copied().collect())
            .unwrap_or_default())
    }
}

impl ChunkStore for MemStore {
    fn put_chunk(
        &self,
        root: &str,
        files_id: &ObjectId,
        n: u32,
        data: &[u8],
    ) -> Result<(), StoreError> {
        self.lock()?
            .chunks
            .entry((root.to_string(), *files_id))
            .or_default()
            .insert(n, data.to_vec());
        Ok(())
    }

    fn get_chunk(
        &self,
        root: &str,
        files_id: &ObjectId,
        n: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self
            .lock()?
            .chunks
            .get(&(root.to_string(), *files_id))
            .and_then(|c| c.get(&n))
            .cloned())
    }

    fn put_metadata(&self, record: &FileMetadata) -> Result<(), StoreError> {
        self.lock()?
            .files
            .insert((record.root.clone(), record.id), record.clone());
        Ok(())
    }

    fn find_metadata(&self, criteria: &Criteria) -> Result<Vec<FileMetadata>, StoreError> {
        let inner = self.lock()?;
        let mut found: Vec<FileMetadata> = inner
            .files
            .values()
            .filter(|f| criteria.matches(f))
            .cloned()
            .collect();
        found.sort_by_key(|f| f.id);
        Ok(found)
    }

    fn delete_chunks(&self, root: &str, files_id: &ObjectId) -> Result<(), StoreError> {
        self.lock()?.chunks.remove(&(root.to_string(), *files_id));
        Ok(())
    }

    fn delete_metadata(&self, root: &str, files_id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .files
            .remove(&(root.to_string(), *files_id))
            .is_some())
    }
}
