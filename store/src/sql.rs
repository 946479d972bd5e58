use rusqlite as rs;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use time::OffsetDateTime;

use gcore::id::ObjectId;

use crate::{ChunkStore, Criteria, FileMetadata, StoreError};

/// Sqlite backed store. Every root shares the `files` and `chunks` tables, the root column
/// plays the part of the `<root>.files` / `<root>.chunks` collection prefix.
pub struct SqlStore {
    conn: Mutex<Connection>,
}

// Raw row as it comes off the files table
type FileRow = (
    String,
    String,
    Option<String>,
    i64,
    i64,
    String,
    i64,
    Option<String>,
    Vec<u8>,
    Vec<u8>,
);

impl SqlStore {
    pub fn open(filename: Option<&Path>) -> Result<Self, StoreError> {
        let conn = match filename {
            None => Connection::open_in_memory()?,
            Some(f) => Connection::open(f)?,
        };

        // Setup the db
        conn.execute_batch(
            "BEGIN;
             CREATE TABLE IF NOT EXISTS chunks (
                root VARCHAR NOT NULL,
                files_id VARCHAR NOT NULL,
                n INTEGER NOT NULL,
                data BLOB NOT NULL,
                UNIQUE(root, files_id, n)
             );
             CREATE TABLE IF NOT EXISTS files (
                root VARCHAR NOT NULL,
                id VARCHAR NOT NULL,
                filename VARCHAR,
                length INTEGER NOT NULL,
                chunk_size INTEGER NOT NULL,
                checksum VARCHAR NOT NULL,
                upload_date INTEGER NOT NULL,
                content_type VARCHAR,
                aliases BLOB NOT NULL,
                metadata BLOB NOT NULL,
                UNIQUE(root, id)
             );
             CREATE INDEX IF NOT EXISTS files_filename ON files (root, filename, upload_date);
             COMMIT;",
        )?;

        Ok(SqlStore {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Other(format!("{} out of range: {}", what, value)))
}

// Millisecond precision, same as the upload date written by a session
fn to_millis(date: OffsetDateTime) -> Result<i64, StoreError> {
    i64::try_from(date.unix_timestamp_nanos() / 1_000_000)
        .map_err(|_| StoreError::Other(format!("upload date out of range: {}", date)))
}

fn from_millis(millis: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .map_err(|e| StoreError::Corrupt(format!("upload date {}: {}", millis, e)))
}

fn from_row(row: FileRow) -> Result<FileMetadata, StoreError> {
    let (root, id, filename, length, chunk_size, checksum, upload_date, content_type, aliases, metadata) =
        row;

    let id = ObjectId::parse_str(&id).map_err(|e| StoreError::Corrupt(format!("id {}: {}", id, e)))?;
    let aliases: Vec<String> = bincode::deserialize(&aliases)?;
    let metadata: BTreeMap<String, String> = bincode::deserialize(&metadata)?;

    Ok(FileMetadata {
        id,
        root,
        filename,
        length: u64::try_from(length)
            .map_err(|_| StoreError::Corrupt(format!("negative length {}", length)))?,
        chunk_size: u32::try_from(chunk_size)
            .map_err(|_| StoreError::Corrupt(format!("bad chunk size {}", chunk_size)))?,
        checksum,
        upload_date: from_millis(upload_date)?,
        content_type,
        aliases,
        metadata,
    })
}

impl ChunkStore for SqlStore {
    fn put_chunk(
        &self,
        root: &str,
        files_id: &ObjectId,
        n: u32,
        data: &[u8],
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.prepare_cached(
            "INSERT OR REPLACE INTO chunks
             (root, files_id, n, data)
             VALUES
             (?, ?, ?, ?)",
        )?
        .execute(rs::params![root, files_id.to_hex(), n, data])?;
        Ok(())
    }

    fn get_chunk(
        &self,
        root: &str,
        files_id: &ObjectId,
        n: u32,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.lock()?;
        let data = conn
            .prepare_cached(
                "SELECT data
                 FROM chunks
                 WHERE root = ?
                 AND files_id = ?
                 AND n = ?",
            )?
            .query_row(rs::params![root, files_id.to_hex(), n], |row| row.get(0))
            .optional()?;
        Ok(data)
    }

    fn put_metadata(&self, record: &FileMetadata) -> Result<(), StoreError> {
        let aliases = bincode::serialize(&record.aliases)?;
        let metadata = bincode::serialize(&record.metadata)?;

        let conn = self.lock()?;
        conn.prepare_cached(
            "INSERT OR REPLACE INTO files
             (root, id, filename, length, chunk_size, checksum, upload_date, content_type, aliases, metadata)
             VALUES
             (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )?
        .execute(rs::params![
            record.root,
            record.id.to_hex(),
            record.filename,
            to_i64(record.length, "length")?,
            record.chunk_size,
            record.checksum,
            to_millis(record.upload_date)?,
            record.content_type,
            aliases,
            metadata,
        ])?;
        Ok(())
    }

    fn find_metadata(&self, criteria: &Criteria) -> Result<Vec<FileMetadata>, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare_cached(
                "SELECT root, id, filename, length, chunk_size, checksum, upload_date, content_type, aliases, metadata
                 FROM files
                 WHERE root = ?1
                 AND (?2 IS NULL OR id = ?2)
                 AND (?3 IS NULL OR filename = ?3)
                 ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map(
                    rs::params![
                        criteria.root,
                        criteria.id.map(|id| id.to_hex()),
                        criteria.filename,
                    ],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                            row.get(8)?,
                            row.get(9)?,
                        ))
                    },
                )?
                .collect::<Result<Vec<FileRow>, rs::Error>>()?;
            rows
        };

        rows.into_iter().map(from_row).collect()
    }

    fn delete_chunks(&self, root: &str, files_id: &ObjectId) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.prepare_cached(
            "DELETE FROM chunks
             WHERE root = ?
             AND files_id = ?",
        )?
        .execute(rs::params![root, files_id.to_hex()])?;
        Ok(())
    }

    fn delete_metadata(&self, root: &str, files_id: &ObjectId) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let removed = conn
            .prepare_cached(
                "DELETE FROM files
                 WHERE root = ?
                 AND id = ?",
            )?
            .execute(rs::params![root, files_id.to_hex()])?;
        Ok(removed > 0)
    }
}
