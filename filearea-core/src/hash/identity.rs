use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FileAreaError;
use crate::util::hex::parse_hex_array;

const DOMAIN: &[u8] = b"filearea/pathhash/v1";

/// Digest of a file's logical slot: (context, area, item, path, filename).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathHash(pub [u8; 32]);

impl PathHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for PathHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathHash({})", &self.to_hex()[..12])
    }
}

impl FromStr for PathHash {
    type Err = FileAreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_array::<32>(s).map(PathHash)
    }
}

/// Fields are length-prefixed so that no two tuples share an encoding,
/// e.g. ("ab", "/c/") and ("a", "b/c/").
pub fn identity_hash(
    context_id: i64,
    area: &str,
    item_id: i64,
    path: &str,
    filename: &str,
) -> PathHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN);
    hasher.update(&context_id.to_le_bytes());
    put_field(&mut hasher, area.as_bytes());
    hasher.update(&item_id.to_le_bytes());
    put_field(&mut hasher, path.as_bytes());
    put_field(&mut hasher, filename.as_bytes());
    PathHash(*hasher.finalize().as_bytes())
}

fn put_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
