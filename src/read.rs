use std::cmp;
use std::io::{self, Read};
use std::mem;

use log::debug;

use gcore::buf::flush_buf;
use store::{ChunkStore, Criteria, FileMetadata};

use crate::config::{validate_root, ReadOptions, StoreConfig};
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Streaming,
    Done,
    Failed,
}

/// Finds the record a read selection points at.
///
/// Several records can share a filename, the newest `upload_date` wins and equal dates fall
/// back to the greater id.
pub(crate) fn resolve<S: ChunkStore + ?Sized>(
    store: &S,
    config: &StoreConfig,
    options: &ReadOptions,
) -> Result<Option<FileMetadata>, Error> {
    let root = options.root.as_deref().unwrap_or(&config.root);
    validate_root(root)?;

    let id = options.id.as_ref().map(|id| id.resolve()).transpose()?;
    let criteria = match (id, options.filename.as_deref()) {
        (Some(id), filename) => Criteria {
            filename: filename.map(str::to_string),
            ..Criteria::by_id(root, id)
        },
        (None, Some(filename)) => Criteria::by_filename(root, filename),
        (None, None) => {
            return Err(Error::InvalidArgument(
                "read needs an id or a filename".to_string(),
            ))
        }
    };

    Ok(store
        .find_metadata(&criteria)?
        .into_iter()
        .max_by_key(|f| (f.upload_date, f.id)))
}

/// Pulls the chunks covering `[start, end)` one at a time and trims the edges.
///
/// Single pass: once it reports the end of the range, or an error, it only yields `None`.
pub struct ReadSession<'a, S: ChunkStore + ?Sized> {
    store: &'a S,
    file: FileMetadata,
    start: u64,
    end: u64,
    last_n: u32,
    next_n: u32,
    status: ReadStatus,

    // Leftover of the current chunk for the io::Read adapter
    out_buf: Vec<u8>,
}

impl<'a, S: ChunkStore + ?Sized> ReadSession<'a, S> {
    pub fn open(store: &'a S, config: &StoreConfig, options: &ReadOptions) -> Result<Self, Error> {
        let file = resolve(store, config, options)?.ok_or(Error::NotFound)?;

        let length = file.length;
        let start = options.range_start.unwrap_or(0);
        let end = options.range_end.unwrap_or(length);
        if start > end || end > length {
            return Err(Error::InvalidRange { start, end, length });
        }

        if file.chunk_size == 0 {
            return Err(Error::InvalidArgument(format!(
                "file {} records a chunk size of 0",
                file.id
            )));
        }
        let chunk_size = file.chunk_size as u64;

        let (status, first_n, last_n) = if start == end {
            (ReadStatus::Done, 0, 0)
        } else {
            (
                ReadStatus::Streaming,
                chunk_index(start / chunk_size)?,
                chunk_index(end.div_ceil(chunk_size) - 1)?,
            )
        };

        debug!(
            "read open: {}/{} range: {}..{} chunks: {}..={}",
            file.root, file.id, start, end, first_n, last_n
        );

        Ok(ReadSession {
            store,
            file,
            start,
            end,
            last_n,
            next_n: first_n,
            status,
            out_buf: Vec::new(),
        })
    }

    pub fn file(&self) -> &FileMetadata {
        &self.file
    }

    pub fn range(&self) -> (u64, u64) {
        (self.start, self.end)
    }

    pub fn status(&self) -> ReadStatus {
        self.status
    }

    /// Next slice of the range, `None` at the end of the stream.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, Error> {
        // Whatever `read` left over of the current chunk goes out first
        if !self.out_buf.is_empty() {
            return Ok(Some(mem::take(&mut self.out_buf)));
        }
        if self.status != ReadStatus::Streaming {
            return Ok(None);
        }

        match self.fetch() {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                self.status = ReadStatus::Failed;
                Err(e)
            }
        }
    }

    fn fetch(&mut self) -> Result<Vec<u8>, Error> {
        let n = self.next_n;
        let id = self.file.id;
        let chunk_size = self.file.chunk_size as u64;

        let mut data = self
            .store
            .get_chunk(&self.file.root, &id, n)?
            .ok_or(Error::MissingChunk { id, n })?;

        let chunk_start = n as u64 * chunk_size;
        let expected = cmp::min(chunk_size, self.file.length - chunk_start);
        if data.len() as u64 != expected {
            return Err(Error::CorruptChunk {
                id,
                n,
                expected,
                actual: data.len() as u64,
            });
        }

        // Both offsets are relative to the chunk
        let lo = self.start.saturating_sub(chunk_start) as usize;
        let hi = cmp::min(self.end - chunk_start, expected) as usize;
        data.truncate(hi);
        data.drain(..lo);

        debug!("chunk {}/{} n: {} emit: {}..{}", self.file.root, id, n, lo, hi);

        if n == self.last_n {
            self.status = ReadStatus::Done;
        } else {
            self.next_n = n + 1;
        }
        Ok(data)
    }
}

fn chunk_index(n: u64) -> Result<u32, Error> {
    u32::try_from(n).map_err(|_| Error::InvalidArgument(format!("chunk index {} out of range", n)))
}

impl<S: ChunkStore + ?Sized> Iterator for ReadSession<'_, S> {
    type Item = Result<Vec<u8>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl<S: ChunkStore + ?Sized> Read for ReadSession<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.out_buf.is_empty() {
            match self.next_chunk()? {
                Some(data) => self.out_buf = data,
                None => return Ok(0),
            }
        }

        Ok(flush_buf(&mut self.out_buf, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FlakyStore;
    use crate::write::WriteSession;
    use crate::config::WriteOptions;
    use gcore::hash::checksum;
    use gcore::id::ObjectId;
    use std::io::Cursor;
    use store::mem::MemStore;

    fn config(chunk_size: u32) -> StoreConfig {
        StoreConfig {
            chunk_size,
            ..StoreConfig::default()
        }
    }

    fn put(store: &impl ChunkStore, chunk_size: u32, options: WriteOptions, data: &[u8]) -> FileMetadata {
        let mut session = WriteSession::open(store, &config(chunk_size), options).unwrap();
        session.write(data).unwrap();
        session.end().unwrap()
    }

    fn read_range(store: &impl ChunkStore, id: ObjectId, start: u64, end: u64) -> Result<Vec<u8>, Error> {
        let session = ReadSession::open(store, &config(4), &ReadOptions::by_id(id).range(start, end))?;
        let mut out = vec![];
        for chunk in session {
            out.extend(chunk?);
        }
        Ok(out)
    }

    // Deterministic filler with no repeating period below 251
    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 % 251) as u8).collect()
    }

    #[test]
    fn hello_world_range() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");

        assert_eq!(read_range(&store, file.id, 2, 9).unwrap(), b"llo wor");

        let mut session =
            ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id).range(2, 9)).unwrap();
        assert_eq!(session.next_chunk().unwrap().unwrap(), b"ll");
        assert_eq!(session.next_chunk().unwrap().unwrap(), b"o wo");
        assert_eq!(session.next_chunk().unwrap().unwrap(), b"r");
        assert_eq!(session.next_chunk().unwrap(), None);
        assert_eq!(session.status(), ReadStatus::Done);
        assert_eq!(session.next_chunk().unwrap(), None);
    }

    #[test]
    fn round_trip_sizes() {
        let store = MemStore::new();

        for chunk_size in [1u32, 3, 4, 7, 64, 1000] {
            for len in [0usize, 1, 3, 4, 5, 63, 64, 65, 300] {
                let data = sample(len);
                let file = put(&store, chunk_size, WriteOptions::new(), &data);

                let mut out = vec![];
                ReadSession::open(&store, &config(chunk_size), &ReadOptions::by_id(file.id))
                    .unwrap()
                    .read_to_end(&mut out)
                    .unwrap();

                assert_eq!(out, data, "chunk_size: {} len: {}", chunk_size, len);
                assert_eq!(file.checksum, checksum(&mut Cursor::new(&out)).unwrap());
            }
        }
    }

    #[test]
    fn every_range() {
        let store = MemStore::new();
        let data = sample(23);
        let file = put(&store, 5, WriteOptions::new(), &data);

        for start in 0..=23u64 {
            for end in start..=23u64 {
                assert_eq!(
                    read_range(&store, file.id, start, end).unwrap(),
                    &data[start as usize..end as usize],
                    "range {}..{}",
                    start,
                    end
                );
            }
        }
    }

    #[test]
    fn invalid_ranges() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");

        assert!(matches!(
            read_range(&store, file.id, 0, 12),
            Err(Error::InvalidRange { start: 0, end: 12, length: 11 })
        ));
        assert!(matches!(
            read_range(&store, file.id, 5, 4),
            Err(Error::InvalidRange { .. })
        ));
        assert!(read_range(&store, file.id, 11, 11).unwrap().is_empty());

        let start_only = ReadOptions {
            range_start: Some(12),
            ..ReadOptions::by_id(file.id)
        };
        assert!(matches!(
            ReadSession::open(&store, &config(4), &start_only),
            Err(Error::InvalidRange { start: 12, end: 11, .. })
        ));
    }

    #[test]
    fn empty_file_reads_nothing() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"");

        let mut session = ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id)).unwrap();
        assert_eq!(session.status(), ReadStatus::Done);
        assert_eq!(session.next_chunk().unwrap(), None);
    }

    #[test]
    fn selection_errors() {
        let store = MemStore::new();

        assert!(matches!(
            ReadSession::open(&store, &config(4), &ReadOptions::default()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ReadSession::open(&store, &config(4), &ReadOptions::by_id("xyz")),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            ReadSession::open(&store, &config(4), &ReadOptions::by_id(ObjectId::new())),
            Err(Error::NotFound)
        ));
        assert!(matches!(
            ReadSession::open(&store, &config(4), &ReadOptions::by_filename("ghost.txt")),
            Err(Error::NotFound)
        ));
    }

    #[test]
    fn filename_and_root_selection() {
        let store = MemStore::new();
        put(&store, 4, WriteOptions::new().filename("a.txt"), b"default root");
        put(&store, 4, WriteOptions::new().filename("a.txt").root("other"), b"other root");

        let mut out = String::new();
        ReadSession::open(&store, &config(4), &ReadOptions::by_filename("a.txt").root("other"))
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        assert_eq!(out, "other root");
    }

    #[test]
    fn id_and_filename_must_both_match() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new().filename("a.txt"), b"data");

        let both = ReadOptions {
            filename: Some("a.txt".to_string()),
            ..ReadOptions::by_id(file.id)
        };
        assert_eq!(resolve(&store, &config(4), &both).unwrap(), Some(file.clone()));

        let mismatch = ReadOptions {
            filename: Some("b.txt".to_string()),
            ..ReadOptions::by_id(file.id)
        };
        assert_eq!(resolve(&store, &config(4), &mismatch).unwrap(), None);
    }

    #[test]
    fn ambiguous_filename_picks_newest() {
        let store = MemStore::new();
        let older = put(&store, 4, WriteOptions::new().filename("log.txt"), b"first");
        let newer = put(&store, 4, WriteOptions::new().filename("log.txt"), b"second");

        // Pin the dates so the tie-break does not hinge on the clock
        let mut older = older;
        older.upload_date = newer.upload_date + time::Duration::seconds(5);
        store.put_metadata(&older).unwrap();

        let session =
            ReadSession::open(&store, &config(4), &ReadOptions::by_filename("log.txt")).unwrap();
        assert_eq!(session.file().id, older.id);

        let mut same_date = newer.clone();
        same_date.upload_date = older.upload_date;
        store.put_metadata(&same_date).unwrap();

        let session =
            ReadSession::open(&store, &config(4), &ReadOptions::by_filename("log.txt")).unwrap();
        assert_eq!(session.file().id, cmp::max(older.id, newer.id));
    }

    #[test]
    fn missing_chunk_is_fatal() {
        let store = FlakyStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");
        store.hide_chunk(1);

        let mut session = ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id)).unwrap();
        assert_eq!(session.next_chunk().unwrap().unwrap(), b"hell");
        assert!(matches!(
            session.next_chunk(),
            Err(Error::MissingChunk { n: 1, .. })
        ));
        assert_eq!(session.status(), ReadStatus::Failed);
        assert_eq!(session.next_chunk().unwrap(), None);
    }

    #[test]
    fn store_error_surfaces() {
        let store = FlakyStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");
        store.fail_chunk(2);

        let mut out = vec![];
        let err = ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id))
            .unwrap()
            .read_to_end(&mut out)
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn short_chunk_is_corrupt() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");
        store.put_chunk("fs", &file.id, 1, b"o").unwrap();

        let session = ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id)).unwrap();
        let result: Result<Vec<Vec<u8>>, Error> = session.collect();
        assert!(matches!(
            result,
            Err(Error::CorruptChunk { n: 1, expected: 4, actual: 1, .. })
        ));
    }

    #[test]
    fn io_read_small_buffers() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");

        let mut session =
            ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id).range(1, 10)).unwrap();
        let mut buf = [0u8; 3];
        let mut out = vec![];
        loop {
            match session.read(&mut buf).unwrap() {
                0 => break,
                len => out.extend_from_slice(&buf[..len]),
            }
        }
        assert_eq!(out, b"ello worl");
    }

    #[test]
    fn mixed_read_and_next_chunk() {
        let store = MemStore::new();
        let file = put(&store, 4, WriteOptions::new(), b"hello world");

        let mut session = ReadSession::open(&store, &config(4), &ReadOptions::by_id(file.id)).unwrap();
        let mut buf = [0u8; 2];
        assert_eq!(session.read(&mut buf).unwrap(), 2);

        let mut out = buf.to_vec();
        assert_eq!(session.next_chunk().unwrap(), Some(b"ll".to_vec()));
        out.extend_from_slice(b"ll");

        assert_eq!(session.read(&mut buf).unwrap(), 2);
        out.extend_from_slice(&buf);
        while let Some(chunk) = session.next_chunk().unwrap() {
            out.extend(chunk);
        }
        assert_eq!(out, b"hello world");
        assert_eq!(session.status(), ReadStatus::Done);
    }
}
