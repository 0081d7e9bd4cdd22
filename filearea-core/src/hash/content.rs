use std::fmt;
use std::io::{Result, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FileAreaError;
use crate::util::hex::parse_hex_array;

/// BLAKE3 digest of raw file bytes. Blobs are stored under this key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Reserved value carried by directory entries; no blob exists for it.
    pub const DIRECTORY: ContentHash = ContentHash([0u8; 32]);

    pub fn of(bytes: &[u8]) -> Self {
        ContentHash(*blake3::hash(bytes).as_bytes())
    }

    pub fn is_directory(&self) -> bool {
        *self == Self::DIRECTORY
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..12])
    }
}

impl FromStr for ContentHash {
    type Err = FileAreaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse_hex_array::<32>(s).map(ContentHash)
    }
}

/// Write adapter that hashes and counts everything passing through to `inner`.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: blake3::Hasher,
    pub written: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: blake3::Hasher::new(),
            written: 0,
        }
    }

    pub fn finish(self) -> (W, ContentHash, u64) {
        let hash = ContentHash(*self.hasher.finalize().as_bytes());
        (self.inner, hash, self.written)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_matches_one_shot_hash() {
        let mut w = HashingWriter::new(Vec::new());
        w.write_all(b"hello ").unwrap();
        w.write_all(b"world").unwrap();
        let (buf, hash, n) = w.finish();
        assert_eq!(buf, b"hello world");
        assert_eq!(n, 11);
        assert_eq!(hash, ContentHash::of(b"hello world"));
    }

    #[test]
    fn directory_sentinel_is_not_empty_file_hash() {
        assert!(ContentHash::DIRECTORY.is_directory());
        assert!(!ContentHash::of(b"").is_directory());
    }
}
