use std::cmp;
use std::io::{ErrorKind, Read};

/// Reads from `data` until `buf` is full or the source runs dry.
///
/// Returns `(eof, filled)`. A short read is only reported once the source returned `0`,
/// so callers can hand every block but the last one on as a full chunk.
pub fn fill_buf<R: Read>(data: &mut R, buf: &mut [u8]) -> std::io::Result<(bool, usize)> {
    let mut filled = 0;

    while filled < buf.len() {
        match data.read(&mut buf[filled..]) {
            Ok(0) => return Ok((true, filled)),
            Ok(x) => filled += x,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok((false, filled))
}

/// Moves the head of `pending` into `out`, returns how many bytes moved.
pub fn flush_buf(pending: &mut Vec<u8>, out: &mut [u8]) -> usize {
    let split_at = cmp::min(pending.len(), out.len());
    out[..split_at].copy_from_slice(&pending[..split_at]);
    pending.drain(..split_at);

    split_at
}
