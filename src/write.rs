use std::cmp;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use log::{debug, info, warn};
use time::{Duration, OffsetDateTime};

use gcore::buf::fill_buf;
use gcore::hash::Checksum;
use gcore::id::ObjectId;
use store::{ChunkStore, FileMetadata, StoreError};

use crate::chunker::Chunker;
use crate::config::{validate_chunk_size, validate_root, StoreConfig, WriteOptions};
use crate::error::Error;

// Read size of write_from, chunks are assembled from blocks no bigger than this
const READ_BLOCK: usize = 8 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Open,
    Flushing,
    Closed,
    Failed,
}

/// What `abort` managed to clean up. A failed delete is reported here instead of as an error.
#[derive(Debug)]
pub struct AbortReport {
    pub id: ObjectId,
    pub chunks_written: u32,
    pub cleanup_error: Option<StoreError>,
}

/// Streams bytes into fixed-size chunks, the metadata record is only written by `end`.
///
/// Chunk writes are issued strictly in sequence order and each one completes before the
/// next is attempted. A failed `end` leaves the chunks written so far without a metadata
/// record, those orphans stay until `abort` or an external sweep removes them.
pub struct WriteSession<'a, S: ChunkStore + ?Sized> {
    store: &'a S,
    id: ObjectId,
    root: String,
    chunk_size: u32,
    filename: Option<String>,
    content_type: Option<String>,
    aliases: Vec<String>,
    metadata: BTreeMap<String, String>,

    chunker: Chunker,
    checksum: Checksum,
    next_n: u32,
    length: u64,
    status: WriteStatus,
}

impl<'a, S: ChunkStore + ?Sized> WriteSession<'a, S> {
    pub fn open(store: &'a S, config: &StoreConfig, options: WriteOptions) -> Result<Self, Error> {
        let id = match &options.id {
            Some(id) => id.resolve()?,
            None => ObjectId::new(),
        };
        let root = options.root.unwrap_or_else(|| config.root.clone());
        validate_root(&root)?;

        let chunk_size = options.chunk_size.unwrap_or(config.chunk_size);
        validate_chunk_size(chunk_size)?;

        debug!("write open: {}/{} chunk_size: {}", root, id, chunk_size);

        Ok(WriteSession {
            store,
            id,
            root,
            chunk_size,
            filename: options.filename,
            content_type: options.content_type,
            aliases: options.aliases,
            metadata: options.metadata,
            chunker: Chunker::new(chunk_size as usize),
            checksum: Checksum::new(),
            next_n: 0,
            length: 0,
            status: WriteStatus::Open,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn status(&self) -> WriteStatus {
        self.status
    }

    /// Bytes accepted so far.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Appends `data`, persisting every chunk it completes before returning.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, Error> {
        self.ensure_open()?;

        self.checksum.update(data);
        self.length += data.len() as u64;

        let mut rest = data;
        while !rest.is_empty() {
            let (used, chunk) = self.chunker.push(rest);
            rest = &rest[used..];

            if let Some(chunk) = chunk {
                self.persist_chunk(&chunk)?;
            }
        }
        Ok(data.len())
    }

    /// Pumps `reader` dry through a block of at most `READ_BLOCK` bytes.
    pub fn write_from<R: Read>(&mut self, reader: &mut R) -> Result<u64, Error> {
        self.ensure_open()?;

        let mut total = 0;
        let mut block = vec![0u8; cmp::min(self.chunk_size as usize, READ_BLOCK)];

        loop {
            match fill_buf(reader, &mut block)? {
                (true, 0) => break,
                (_, len) => total += self.write(&block[..len])? as u64,
            }
        }
        Ok(total)
    }

    /// Flushes the tail chunk then writes the metadata record, making the file readable.
    pub fn end(&mut self) -> Result<FileMetadata, Error> {
        self.ensure_open()?;
        self.status = WriteStatus::Flushing;

        if let Some(tail) = self.chunker.finish() {
            self.persist_chunk(&tail)?;
        }

        let now = OffsetDateTime::now_utc();
        let record = FileMetadata {
            id: self.id,
            root: self.root.clone(),
            filename: self.filename.clone(),
            length: self.length,
            chunk_size: self.chunk_size,
            checksum: self.checksum.finalize(),
            upload_date: now - Duration::nanoseconds((now.nanosecond() % 1_000_000) as i64),
            content_type: self.content_type.clone(),
            aliases: self.aliases.clone(),
            metadata: self.metadata.clone(),
        };

        if let Err(e) = self.store.put_metadata(&record) {
            self.status = WriteStatus::Failed;
            return Err(e.into());
        }

        self.status = WriteStatus::Closed;
        info!(
            "stored {}/{}: {} bytes in {} chunks",
            self.root, self.id, self.length, self.next_n
        );
        Ok(record)
    }

    /// Gives up on the file and deletes whatever chunks reached the store.
    pub fn abort(&mut self) -> Result<AbortReport, Error> {
        if self.status == WriteStatus::Closed {
            return Err(Error::WriteAfterClose);
        }
        self.status = WriteStatus::Failed;
        self.chunker.clear();

        let cleanup_error = match self.store.delete_chunks(&self.root, &self.id) {
            Ok(()) => None,
            Err(e) => {
                warn!("abort {}/{}: chunk cleanup failed: {}", self.root, self.id, e);
                Some(e)
            }
        };

        debug!("write abort: {}/{} after {} chunks", self.root, self.id, self.next_n);
        Ok(AbortReport {
            id: self.id,
            chunks_written: self.next_n,
            cleanup_error,
        })
    }

    fn ensure_open(&self) -> Result<(), Error> {
        match self.status {
            WriteStatus::Open => Ok(()),
            _ => Err(Error::WriteAfterClose),
        }
    }

    fn persist_chunk(&mut self, chunk: &[u8]) -> Result<(), Error> {
        let n = self.next_n;
        let next = match n.checked_add(1) {
            Some(next) => next,
            None => {
                self.status = WriteStatus::Failed;
                return Err(Error::InvalidArgument(format!(
                    "file exceeds {} chunks of {} bytes",
                    u32::MAX,
                    self.chunk_size
                )));
            }
        };

        if let Err(e) = self.store.put_chunk(&self.root, &self.id, n, chunk) {
            self.status = WriteStatus::Failed;
            return Err(e.into());
        }

        debug!("chunk {}/{} n: {} len: {}", self.root, self.id, n, chunk.len());
        self.next_n = next;
        Ok(())
    }
}

impl<S: ChunkStore + ?Sized> Write for WriteSession<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        WriteSession::write(self, buf).map_err(io::Error::from)
    }

    // Complete chunks are already in the store, the tail waits for end()
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
