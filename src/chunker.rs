use std::cmp;
use std::mem;

/// Buffer-then-flush state of a write. Each `push` is one transition: it takes at most what
/// tops the pending buffer up to `chunk_size` and hands back a chunk once it is full, so the
/// pending bytes stay below one chunk regardless of how the producer slices its input.
///
/// A completed chunk leaves nothing allocated behind it, the next buffer is only reserved by
/// the following `push`, once the caller is done with the chunk.
pub struct Chunker {
    chunk_size: usize,
    pending: Vec<u8>,
}

impl Chunker {
    pub fn new(chunk_size: usize) -> Self {
        Chunker {
            chunk_size,
            pending: Vec::new(),
        }
    }

    /// Returns how many bytes of `data` were consumed and the chunk completed by them, if any.
    pub fn push(&mut self, data: &[u8]) -> (usize, Option<Vec<u8>>) {
        if self.pending.capacity() == 0 && !data.is_empty() {
            self.pending.reserve_exact(self.chunk_size);
        }

        let take = cmp::min(self.chunk_size - self.pending.len(), data.len());
        self.pending.extend_from_slice(&data[..take]);

        if self.pending.len() == self.chunk_size {
            (take, Some(mem::take(&mut self.pending)))
        } else {
            (take, None)
        }
    }

    /// Drains the short tail, never yields an empty chunk.
    pub fn finish(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.pending))
        }
    }

    pub fn clear(&mut self) {
        self.pending = Vec::new();
    }
}
