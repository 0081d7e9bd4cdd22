use std::io::{Read, Seek};

use serde::{Deserialize, Serialize};

use crate::domain::{AreaKey, StoredFile};
use crate::error::Result;
use crate::hash::content::ContentHash;
use crate::hash::identity::PathHash;

pub mod fs;
pub mod index;
pub mod journal;
pub mod memory;

/// Seekable handle over stored content.
pub trait ContentReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> ContentReader for T {}

/// One atomic unit of change. Applied in field order: deletes, updates, creates, purges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub deletes: Vec<PathHash>,
    pub updates: Vec<StoredFile>,
    pub creates: Vec<StoredFile>,
    pub purges: Vec<AreaKey>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty()
            && self.updates.is_empty()
            && self.creates.is_empty()
            && self.purges.is_empty()
    }
}

pub trait FileStore: Send + Sync {
    /// Files of one area ordered by path, then filename.
    fn list_area(&self, area: &AreaKey) -> Result<Vec<StoredFile>>;

    fn get(&self, hash: &PathHash) -> Result<Option<StoredFile>>;

    /// Store bytes under their content hash. Storing the same bytes twice is a no-op.
    fn put_content(&self, src: &mut dyn Read) -> Result<(ContentHash, u64)>;

    fn open_content(&self, hash: &ContentHash) -> Result<Box<dyn ContentReader>>;

    /// All of `batch` or nothing. A create onto an occupied slot fails with `Conflict`,
    /// an update of a missing slot with `NotFound`.
    fn commit(&self, batch: &ChangeBatch) -> Result<()>;
}
