use std::io::{copy, Read};

// Make the checksum api be similiar to blake3's
pub struct Checksum(blake3::Hasher);

impl Checksum {
    pub fn new() -> Checksum {
        Checksum(blake3::Hasher::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Hex digest of everything fed in so far, the accumulator stays usable.
    pub fn finalize(&self) -> String {
        self.0.finalize().to_hex().to_string()
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::new()
    }
}

/// Checksum of a whole reader in one go.
pub fn checksum<R: Read>(data: &mut R) -> Result<String, std::io::Error> {
    let mut hash = blake3::Hasher::new();
    copy(data, &mut hash)?;
    Ok(hash.finalize().to_hex().to_string())
}
